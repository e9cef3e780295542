//! # wpb-corrections
//!
//! Correction evaluators for the Z→ℓℓ selection: lepton, pileup, pre-firing,
//! pileup jet-ID and b-tagging scale-factor weights registered into a
//! [`wpb_columnar::Weights`] ledger, plus jet energy and MET corrections.
//!
//! Table lookups go through [`wpb_core::ScaleFactorService`];
//! [`BinnedCorrectionSet`] is the JSON-backed implementation and
//! [`GoldenJson`] the certified-luminosity mask.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod btag;
pub mod jet;
pub mod lepton;
pub mod lumi;
pub mod met;
pub mod pileup;
pub mod pujetid;
pub mod sf;
pub mod table;
pub mod working_point;

pub use btag::{BTagCorrector, BTagWeightMethod, FixedWpMethod};
pub use jet::{JesShift, JetCorrector};
pub use lepton::{ElectronCorrector, MuonCorrector};
pub use lumi::GoldenJson;
pub use met::{met_phi_correction, propagate_jet_corrections};
pub use pileup::{add_l1prefiring_weight, add_pileup_weight};
pub use pujetid::add_pujetid_weight;
pub use sf::Domain;
pub use table::{BinnedCorrectionSet, CorrectionEntry, FlowPolicy};
pub use working_point::{
    BTagFlavor, BTagWp, ElectronIdWp, IsoWp, JetIdWp, MuonWp, PileupIdWp, SfType,
};
