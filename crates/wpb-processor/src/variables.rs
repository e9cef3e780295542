//! Dilepton kinematic variables.

use wpb_columnar::event::{Electron, Met, Muon};
use wpb_columnar::{Jagged, LorentzVector, Momentum, transverse_mass};
use wpb_core::Result;
use wpb_core::error::ensure_len;

/// Flavour-agnostic view of a selected lepton.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lepton {
    /// Transverse momentum.
    pub pt: f64,
    /// Pseudorapidity.
    pub eta: f64,
    /// Azimuth.
    pub phi: f64,
    /// Mass.
    pub mass: f64,
    /// Electric charge.
    pub charge: i32,
    /// PDG identifier.
    pub pdg_id: i32,
}

impl Momentum for Lepton {
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

impl From<&Electron> for Lepton {
    fn from(e: &Electron) -> Self {
        Self { pt: e.pt, eta: e.eta, phi: e.phi, mass: e.mass, charge: e.charge, pdg_id: e.pdg_id }
    }
}

impl From<&Muon> for Lepton {
    fn from(m: &Muon) -> Self {
        Self { pt: m.pt, eta: m.eta, phi: m.phi, mass: m.mass, charge: m.charge, pdg_id: m.pdg_id }
    }
}

/// Per-event variables of the two leading leptons. Entries are `None` for
/// events with fewer than two leptons (one for `ptl1`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DileptonVariables {
    /// Leading-lepton pt.
    pub ptl1: Vec<Option<f64>>,
    /// Subleading-lepton pt.
    pub ptl2: Vec<Option<f64>>,
    /// Dilepton pt.
    pub ptll: Vec<Option<f64>>,
    /// Dilepton invariant mass.
    pub mll: Vec<Option<f64>>,
    /// Δφ between the leptons.
    pub dphill: Vec<Option<f64>>,
    /// ΔR between the leptons.
    pub drll: Vec<Option<f64>>,
    /// Transverse mass of the dilepton system and MET.
    pub mth: Vec<Option<f64>>,
    /// Product of the two leading charges.
    pub charge_product: Vec<Option<i32>>,
    /// Product of the PDG IDs of all selected leptons (1 for none).
    pub pdg_id_product: Vec<i32>,
}

impl DileptonVariables {
    /// Compute from the selected leptons and corrected MET of a chunk.
    pub fn compute(leptons: &Jagged<Lepton>, met: &[Met]) -> Result<Self> {
        ensure_len("dilepton MET", leptons.n_events(), met.len())?;
        let leading = leptons.firsts();
        let subleading = leptons.nth(1);

        let mut vars = Self::default();
        for ((l1, l2), m) in leading.iter().zip(&subleading).zip(met) {
            vars.ptl1.push(l1.map(|l| l.pt));
            vars.ptl2.push(l2.map(|l| l.pt));
            let pair = l1.zip(*l2);
            let ll: Option<LorentzVector> = pair.map(|(a, b)| a.p4() + b.p4());
            vars.ptll.push(ll.map(|v| v.pt()));
            vars.mll.push(ll.map(|v| v.mass()));
            vars.dphill.push(pair.map(|(a, b)| a.delta_phi_to(&b)));
            vars.drll.push(pair.map(|(a, b)| a.delta_r_to(&b)));
            vars.mth.push(ll.map(|v| transverse_mass(v.pt(), v.phi(), m.pt, m.phi)));
            vars.charge_product.push(pair.map(|(a, b)| a.charge * b.charge));
        }
        vars.pdg_id_product = leptons.per_event(|ls| ls.iter().map(|l| l.pdg_id).product());
        Ok(vars)
    }
}
