//! Object selection predicates.
//!
//! Each predicate is the AND of independent per-object conditions and
//! returns a mask aligned with the input collection. The string entry points
//! parse the working points first, so an unknown working point fails before
//! any object is looked at.

use wpb_columnar::event::{Electron, Jet, Muon};
use wpb_columnar::Jagged;
use wpb_core::{Period, Result};
use wpb_corrections::{BTagWp, ElectronIdWp, IsoWp, JetIdWp, MuonWp, PileupIdWp};

const ELECTRON_MAX_ABS_ETA: f64 = 2.5;
const ECAL_GAP: (f64, f64) = (1.444, 1.566);
const MUON_MAX_ABS_ETA: f64 = 2.4;
const JET_MAX_ABS_ETA: f64 = 2.4;
/// The pileup jet ID is only defined below this pt.
const PILEUP_ID_MAX_PT: f64 = 50.0;

/// Parsed electron cuts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElectronCuts {
    /// Minimum pt.
    pub pt_threshold: f64,
    /// Identification working point.
    pub id: ElectronIdWp,
    /// Optional isolation working point.
    pub iso: Option<IsoWp>,
}

impl ElectronCuts {
    /// Parse the working points.
    pub fn new(pt_threshold: f64, id_wp: &str, iso_wp: Option<&str>) -> Result<Self> {
        Ok(Self { pt_threshold, id: id_wp.parse()?, iso: iso_wp.map(str::parse::<IsoWp>).transpose()? })
    }

    /// Whether one electron passes.
    pub fn passes(&self, e: &Electron) -> bool {
        let sc_eta = (e.eta + e.delta_eta_sc).abs();
        let in_gap = ECAL_GAP.0 < sc_eta && sc_eta < ECAL_GAP.1;
        let id = match self.id.cut_based_level() {
            Some(level) => e.cut_based >= level,
            None => match self.id {
                ElectronIdWp::Wp80Iso => e.mva_iso_wp80,
                ElectronIdWp::Wp90Iso => e.mva_iso_wp90,
                ElectronIdWp::Wp80NoIso => e.mva_noiso_wp80,
                ElectronIdWp::Wp90NoIso => e.mva_noiso_wp90,
                _ => false,
            },
        };
        let iso = self.iso.is_none_or(|wp| e.pf_rel_iso03_all < wp.max_rel_iso());
        e.pt > self.pt_threshold && e.eta.abs() < ELECTRON_MAX_ABS_ETA && !in_gap && id && iso
    }

    /// Per-object mask.
    pub fn mask(&self, electrons: &Jagged<Electron>) -> Jagged<bool> {
        electrons.map(|e| self.passes(e))
    }
}

/// Parsed muon cuts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MuonCuts {
    /// Minimum pt.
    pub pt_threshold: f64,
    /// Identification working point.
    pub id: MuonWp,
    /// Isolation working point.
    pub iso: IsoWp,
}

impl MuonCuts {
    /// Parse the working points.
    pub fn new(pt_threshold: f64, id_wp: &str, iso_wp: &str) -> Result<Self> {
        Ok(Self { pt_threshold, id: id_wp.parse()?, iso: iso_wp.parse()? })
    }

    /// Whether one muon passes.
    pub fn passes(&self, m: &Muon) -> bool {
        let id = match self.id {
            MuonWp::Loose => m.loose_id,
            MuonWp::Medium => m.medium_id,
            MuonWp::Tight => m.tight_id,
        };
        m.pt > self.pt_threshold
            && m.eta.abs() < MUON_MAX_ABS_ETA
            && id
            && m.pf_rel_iso04_all < self.iso.max_rel_iso()
    }

    /// Per-object mask.
    pub fn mask(&self, muons: &Jagged<Muon>) -> Jagged<bool> {
        muons.map(|m| self.passes(m))
    }
}

/// Parsed b-jet cuts for one period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BJetCuts {
    /// Minimum pt.
    pub pt_threshold: f64,
    /// Jet-ID bits that must all be set.
    pub jet_id_bits: i32,
    /// Pileup-ID bit required below 50 GeV.
    pub pileup_id_bit: i32,
    /// DeepJet discriminant threshold.
    pub btag_threshold: f64,
}

impl BJetCuts {
    /// Parse the working points and resolve their period-dependent values.
    pub fn new(
        period: Period,
        pt_threshold: f64,
        jet_id: &str,
        pileup_id: &str,
        btag_wp: &str,
    ) -> Result<Self> {
        let jet_id: JetIdWp = jet_id.parse()?;
        let pileup_id: PileupIdWp = pileup_id.parse()?;
        let btag_wp: BTagWp = btag_wp.parse()?;
        Ok(Self {
            pt_threshold,
            jet_id_bits: jet_id.required_bits(),
            pileup_id_bit: pileup_id.bit(period),
            btag_threshold: btag_wp.threshold(period),
        })
    }

    /// Whether one jet is a good b jet.
    pub fn passes(&self, j: &Jet) -> bool {
        let pileup_id = j.pt >= PILEUP_ID_MAX_PT || j.pu_id & self.pileup_id_bit != 0;
        j.pt > self.pt_threshold
            && j.eta.abs() < JET_MAX_ABS_ETA
            && j.jet_id & self.jet_id_bits == self.jet_id_bits
            && pileup_id
            && j.btag_deep_flav_b > self.btag_threshold
    }

    /// Per-object mask.
    pub fn mask(&self, jets: &Jagged<Jet>) -> Jagged<bool> {
        jets.map(|j| self.passes(j))
    }
}

/// Good-electron mask.
pub fn select_good_electrons(
    electrons: &Jagged<Electron>,
    pt_threshold: f64,
    id_wp: &str,
    iso_wp: Option<&str>,
) -> Result<Jagged<bool>> {
    Ok(ElectronCuts::new(pt_threshold, id_wp, iso_wp)?.mask(electrons))
}

/// Good-muon mask.
pub fn select_good_muons(
    muons: &Jagged<Muon>,
    pt_threshold: f64,
    id_wp: &str,
    iso_wp: &str,
) -> Result<Jagged<bool>> {
    Ok(MuonCuts::new(pt_threshold, id_wp, iso_wp)?.mask(muons))
}

/// Good-b-jet mask.
pub fn select_good_bjets(
    jets: &Jagged<Jet>,
    period: Period,
    pt_threshold: f64,
    jet_id: &str,
    pileup_id: &str,
    btag_wp: &str,
) -> Result<Jagged<bool>> {
    Ok(BJetCuts::new(period, pt_threshold, jet_id, pileup_id, btag_wp)?.mask(jets))
}
