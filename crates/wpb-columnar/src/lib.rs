//! # wpb-columnar
//!
//! Columnar building blocks for event selection:
//!
//! - [`Jagged`] per-event object collections with flatten/unflatten, padding
//!   and ΔR matching helpers;
//! - the [`EventBatch`] chunk data model;
//! - the write-once [`Selection`] mask registry and [`Cutflow`] accounting;
//! - the [`Weights`] ledger of multiplicative event-weight factors.

#![warn(clippy::all)]

pub mod cutflow;
pub mod event;
pub mod kinematics;
pub mod ragged;
pub mod selection;
pub mod weights;

pub use cutflow::{Cutflow, CutflowStep};
pub use event::{Electron, EventBatch, Jet, Met, Muon, PrefiringWeights};
pub use kinematics::{LorentzVector, Momentum, transverse_mass};
pub use ragged::{Jagged, delta_phi, delta_r, delta_r_mask, normalize, unflat_product};
pub use selection::Selection;
pub use weights::{Shift, WeightStatistics, Weights};
