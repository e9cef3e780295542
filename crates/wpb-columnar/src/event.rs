//! Event-chunk data model.
//!
//! One [`EventBatch`] holds a chunk of N events in columnar form: per-event
//! scalars as `Vec`s of length N and object collections as [`Jagged`] values
//! with N events.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use wpb_core::error::ensure_len;
use wpb_core::Result;

use crate::kinematics::Momentum;
use crate::ragged::Jagged;

const ELECTRON_MASS: f64 = 0.000511;
const MUON_MASS: f64 = 0.105658;

/// Reconstructed electron.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Electron {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    #[serde(default)]
    pub mass: f64,
    pub charge: i32,
    pub pdg_id: i32,
    /// Cut-based ID level: 0 fail, 1 veto, 2 loose, 3 medium, 4 tight.
    #[serde(default)]
    pub cut_based: i32,
    #[serde(default)]
    pub mva_iso_wp80: bool,
    #[serde(default)]
    pub mva_iso_wp90: bool,
    #[serde(default)]
    pub mva_noiso_wp80: bool,
    #[serde(default)]
    pub mva_noiso_wp90: bool,
    /// Relative PF isolation in a ΔR = 0.3 cone.
    #[serde(default)]
    pub pf_rel_iso03_all: f64,
    /// Supercluster η minus track η.
    #[serde(default)]
    pub delta_eta_sc: f64,
}

impl Electron {
    /// Electron passing every ID flag, with zero isolation.
    pub fn new(pt: f64, eta: f64, phi: f64, charge: i32) -> Self {
        Self {
            pt,
            eta,
            phi,
            mass: ELECTRON_MASS,
            charge,
            pdg_id: -11 * charge,
            cut_based: 4,
            mva_iso_wp80: true,
            mva_iso_wp90: true,
            mva_noiso_wp80: true,
            mva_noiso_wp90: true,
            pf_rel_iso03_all: 0.0,
            delta_eta_sc: 0.0,
        }
    }
}

/// Reconstructed muon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Muon {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    #[serde(default)]
    pub mass: f64,
    pub charge: i32,
    pub pdg_id: i32,
    #[serde(default)]
    pub loose_id: bool,
    #[serde(default)]
    pub medium_id: bool,
    #[serde(default)]
    pub tight_id: bool,
    /// Relative PF isolation in a ΔR = 0.4 cone.
    #[serde(default)]
    pub pf_rel_iso04_all: f64,
}

impl Muon {
    /// Muon passing every ID flag, with zero isolation.
    pub fn new(pt: f64, eta: f64, phi: f64, charge: i32) -> Self {
        Self {
            pt,
            eta,
            phi,
            mass: MUON_MASS,
            charge,
            pdg_id: -13 * charge,
            loose_id: true,
            medium_id: true,
            tight_id: true,
            pf_rel_iso04_all: 0.0,
        }
    }
}

/// Reconstructed AK4 jet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Jet {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    #[serde(default)]
    pub mass: f64,
    /// `1 - raw/corrected` energy fraction.
    #[serde(default)]
    pub raw_factor: f64,
    #[serde(default)]
    pub area: f64,
    /// Jet ID bitmask (bit 1 tight, bit 2 tight lepton veto).
    #[serde(default)]
    pub jet_id: i32,
    /// Pileup ID bitmask.
    #[serde(default)]
    pub pu_id: i32,
    /// DeepJet b-tag discriminant.
    #[serde(default)]
    pub btag_deep_flav_b: f64,
    /// Generator hadron flavour (0 light, 4 c, 5 b).
    #[serde(default)]
    pub hadron_flavour: i32,
}

impl Jet {
    /// Jet passing tight ID and every pileup-ID working point, with no b tag.
    pub fn new(pt: f64, eta: f64, phi: f64) -> Self {
        Self {
            pt,
            eta,
            phi,
            mass: 0.0,
            raw_factor: 0.0,
            area: 0.5,
            jet_id: 6,
            pu_id: 7,
            btag_deep_flav_b: 0.0,
            hadron_flavour: 0,
        }
    }
}

/// Missing transverse momentum.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Met {
    pub pt: f64,
    pub phi: f64,
}

macro_rules! impl_momentum {
    ($($ty:ty),*) => {$(
        impl Momentum for $ty {
            fn pt(&self) -> f64 {
                self.pt
            }
            fn eta(&self) -> f64 {
                self.eta
            }
            fn phi(&self) -> f64 {
                self.phi
            }
            fn mass(&self) -> f64 {
                self.mass
            }
        }
    )*};
}

impl_momentum!(Electron, Muon, Jet);

impl Momentum for Met {
    fn pt(&self) -> f64 {
        self.pt
    }
    fn eta(&self) -> f64 {
        0.0
    }
    fn phi(&self) -> f64 {
        self.phi
    }
    fn mass(&self) -> f64 {
        0.0
    }
}

/// Per-event L1 pre-firing weights shipped with simulated samples.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PrefiringWeights {
    pub nom: Vec<f64>,
    pub up: Vec<f64>,
    pub dn: Vec<f64>,
}

/// One chunk of collision events.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventBatch {
    /// Dataset (sample) name.
    #[serde(default)]
    pub dataset: String,
    pub run: Vec<u32>,
    pub luminosity_block: Vec<u32>,
    /// Generator weight; present only for simulated samples.
    #[serde(default)]
    pub gen_weight: Option<Vec<f64>>,
    /// True number of pileup interactions (simulation only).
    #[serde(default)]
    pub pileup_n_true_int: Option<Vec<f64>>,
    #[serde(default)]
    pub l1_prefiring: Option<PrefiringWeights>,
    /// Number of good reconstructed primary vertices.
    pub npvs_good: Vec<u32>,
    /// Average energy density, used by jet energy corrections.
    #[serde(default)]
    pub rho: Option<Vec<f64>>,
    pub met: Vec<Met>,
    /// HLT trigger bits by path name.
    #[serde(default)]
    pub hlt: BTreeMap<String, Vec<bool>>,
    /// MET filter bits by filter name.
    #[serde(default)]
    pub flags: BTreeMap<String, Vec<bool>>,
    pub electrons: Jagged<Electron>,
    pub muons: Jagged<Muon>,
    pub jets: Jagged<Jet>,
}

impl EventBatch {
    /// Number of events in the chunk.
    pub fn n_events(&self) -> usize {
        self.run.len()
    }

    /// Simulated samples carry a generator weight.
    pub fn is_mc(&self) -> bool {
        self.gen_weight.is_some()
    }

    /// Check that every per-event array and collection has N events.
    pub fn validate(&self) -> Result<()> {
        let n = self.n_events();
        ensure_len("luminosity_block", n, self.luminosity_block.len())?;
        ensure_len("npvs_good", n, self.npvs_good.len())?;
        ensure_len("met", n, self.met.len())?;
        if let Some(w) = &self.gen_weight {
            ensure_len("gen_weight", n, w.len())?;
        }
        if let Some(p) = &self.pileup_n_true_int {
            ensure_len("pileup_n_true_int", n, p.len())?;
        }
        if let Some(r) = &self.rho {
            ensure_len("rho", n, r.len())?;
        }
        if let Some(p) = &self.l1_prefiring {
            ensure_len("l1_prefiring.nom", n, p.nom.len())?;
            ensure_len("l1_prefiring.up", n, p.up.len())?;
            ensure_len("l1_prefiring.dn", n, p.dn.len())?;
        }
        for (name, bits) in self.hlt.iter().chain(&self.flags) {
            ensure_len(name, n, bits.len())?;
        }
        ensure_len("electrons", n, self.electrons.n_events())?;
        ensure_len("muons", n, self.muons.n_events())?;
        ensure_len("jets", n, self.jets.n_events())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_event_batch() -> EventBatch {
        EventBatch {
            run: vec![1, 1],
            luminosity_block: vec![10, 11],
            gen_weight: Some(vec![1.0, -1.0]),
            npvs_good: vec![12, 30],
            met: vec![Met { pt: 20.0, phi: 0.1 }; 2],
            electrons: Jagged::empty(2),
            muons: Jagged::from_nested(vec![vec![Muon::new(40.0, 0.1, 0.2, -1)], vec![]]),
            jets: Jagged::empty(2),
            ..Default::default()
        }
    }

    #[test]
    fn validate_accepts_consistent_batch() {
        let b = two_event_batch();
        assert_eq!(b.n_events(), 2);
        assert!(b.is_mc());
        b.validate().unwrap();
    }

    #[test]
    fn validate_rejects_length_mismatch() {
        let mut b = two_event_batch();
        b.npvs_good.pop();
        assert!(matches!(b.validate(), Err(wpb_core::Error::Shape(_))));

        let mut b = two_event_batch();
        b.hlt.insert("IsoMu27".into(), vec![true]);
        assert!(b.validate().unwrap_err().to_string().contains("IsoMu27"));

        let mut b = two_event_batch();
        b.jets = Jagged::empty(3);
        assert!(b.validate().is_err());
    }

    #[test]
    fn empty_batch_is_valid() {
        let b = EventBatch::default();
        assert_eq!(b.n_events(), 0);
        assert!(!b.is_mc());
        b.validate().unwrap();
    }

    #[test]
    fn deserialize_from_json() {
        let text = r#"{
            "dataset": "DYJetsToLL_M-50",
            "run": [1],
            "luminosity_block": [7],
            "npvs_good": [20],
            "met": [{"pt": 30.0, "phi": -1.0}],
            "hlt": {"IsoMu27": [true]},
            "electrons": [[]],
            "muons": [[{"pt": 45.0, "eta": 0.3, "phi": 1.0, "charge": 1, "pdg_id": -13, "tight_id": true}]],
            "jets": [[]]
        }"#;
        let b: EventBatch = serde_json::from_str(text).unwrap();
        b.validate().unwrap();
        assert!(!b.is_mc());
        assert_eq!(b.muons.counts(), vec![1]);
        assert_eq!(b.electrons.n_objects(), 0);
        assert!(b.muons.flat()[0].tight_id);
    }
}
