//! Working-point enums.
//!
//! Every working point arrives from configuration as a string and is parsed
//! once into one of these enums; an unknown string is a
//! [`Error::Configuration`].

use std::fmt;
use std::str::FromStr;

use wpb_core::{Error, Period, Result};

fn unknown(kind: &str, value: &str, allowed: &str) -> Error {
    Error::Configuration(format!("unknown {kind} working point '{value}' (expected one of {allowed})"))
}

/// Electron identification working point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElectronIdWp {
    /// Cut-based veto.
    Veto,
    /// Cut-based loose.
    Loose,
    /// Cut-based medium.
    Medium,
    /// Cut-based tight.
    Tight,
    /// MVA with isolation, 80% efficiency.
    Wp80Iso,
    /// MVA with isolation, 90% efficiency.
    Wp90Iso,
    /// MVA without isolation, 80% efficiency.
    Wp80NoIso,
    /// MVA without isolation, 90% efficiency.
    Wp90NoIso,
}

impl ElectronIdWp {
    /// Working-point label used by the electron scale-factor tables.
    pub fn sf_label(self) -> &'static str {
        match self {
            ElectronIdWp::Veto => "Veto",
            ElectronIdWp::Loose => "Loose",
            ElectronIdWp::Medium => "Medium",
            ElectronIdWp::Tight => "Tight",
            ElectronIdWp::Wp80Iso => "wp80iso",
            ElectronIdWp::Wp90Iso => "wp90iso",
            ElectronIdWp::Wp80NoIso => "wp80noiso",
            ElectronIdWp::Wp90NoIso => "wp90noiso",
        }
    }

    /// Minimum cut-based level for the cut-based working points.
    pub fn cut_based_level(self) -> Option<i32> {
        match self {
            ElectronIdWp::Veto => Some(1),
            ElectronIdWp::Loose => Some(2),
            ElectronIdWp::Medium => Some(3),
            ElectronIdWp::Tight => Some(4),
            _ => None,
        }
    }
}

impl FromStr for ElectronIdWp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "veto" => Ok(ElectronIdWp::Veto),
            "loose" => Ok(ElectronIdWp::Loose),
            "medium" => Ok(ElectronIdWp::Medium),
            "tight" => Ok(ElectronIdWp::Tight),
            "wp80iso" => Ok(ElectronIdWp::Wp80Iso),
            "wp90iso" => Ok(ElectronIdWp::Wp90Iso),
            "wp80noiso" => Ok(ElectronIdWp::Wp80NoIso),
            "wp90noiso" => Ok(ElectronIdWp::Wp90NoIso),
            _ => Err(unknown(
                "electron ID",
                s,
                "veto, loose, medium, tight, wp80iso, wp90iso, wp80noiso, wp90noiso",
            )),
        }
    }
}

/// Muon identification working point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MuonWp {
    /// Loose ID.
    Loose,
    /// Medium ID.
    Medium,
    /// Tight ID.
    Tight,
}

impl MuonWp {
    /// Scale-factor key of the ID table.
    pub fn id_key(self) -> &'static str {
        match self {
            MuonWp::Loose => "NUM_LooseID_DEN_TrackerMuons",
            MuonWp::Medium => "NUM_MediumID_DEN_TrackerMuons",
            MuonWp::Tight => "NUM_TightID_DEN_TrackerMuons",
        }
    }
}

impl FromStr for MuonWp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "loose" => Ok(MuonWp::Loose),
            "medium" => Ok(MuonWp::Medium),
            "tight" => Ok(MuonWp::Tight),
            _ => Err(unknown("muon ID", s, "loose, medium, tight")),
        }
    }
}

/// Relative-isolation working point, shared by electrons and muons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IsoWp {
    /// Relative isolation < 0.25.
    Loose,
    /// Relative isolation < 0.20.
    Medium,
    /// Relative isolation < 0.15.
    Tight,
}

impl IsoWp {
    /// Upper bound on the relative isolation.
    pub fn max_rel_iso(self) -> f64 {
        match self {
            IsoWp::Loose => 0.25,
            IsoWp::Medium => 0.20,
            IsoWp::Tight => 0.15,
        }
    }

    /// Muon isolation scale-factor key for this isolation on top of `id`.
    pub fn muon_iso_key(self, id: MuonWp) -> Result<&'static str> {
        match (self, id) {
            (IsoWp::Loose, MuonWp::Loose) => Ok("NUM_LooseRelIso_DEN_LooseID"),
            (IsoWp::Loose, MuonWp::Medium) => Ok("NUM_LooseRelIso_DEN_MediumID"),
            (IsoWp::Loose, MuonWp::Tight) => Ok("NUM_LooseRelIso_DEN_TightIDandIPCut"),
            (IsoWp::Tight, MuonWp::Medium) => Ok("NUM_TightRelIso_DEN_MediumID"),
            (IsoWp::Tight, MuonWp::Tight) => Ok("NUM_TightRelIso_DEN_TightIDandIPCut"),
            (iso, id) => Err(Error::Configuration(format!(
                "no muon isolation scale factor for {iso} isolation with {id:?} ID"
            ))),
        }
    }
}

impl fmt::Display for IsoWp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IsoWp::Loose => "loose",
            IsoWp::Medium => "medium",
            IsoWp::Tight => "tight",
        })
    }
}

impl FromStr for IsoWp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "loose" => Ok(IsoWp::Loose),
            "medium" => Ok(IsoWp::Medium),
            "tight" => Ok(IsoWp::Tight),
            _ => Err(unknown("isolation", s, "loose, medium, tight")),
        }
    }
}

/// DeepJet b-tagging working point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BTagWp {
    /// Loose (`L`).
    Loose,
    /// Medium (`M`).
    Medium,
    /// Tight (`T`).
    Tight,
}

impl BTagWp {
    /// Single-letter label used by the b-tag tables.
    pub fn label(self) -> &'static str {
        match self {
            BTagWp::Loose => "L",
            BTagWp::Medium => "M",
            BTagWp::Tight => "T",
        }
    }

    /// DeepJet discriminant threshold for `period`.
    pub fn threshold(self, period: Period) -> f64 {
        let [l, m, t] = match period {
            Period::Y2016Apv => [0.0508, 0.2598, 0.6502],
            Period::Y2016 => [0.0480, 0.2489, 0.6377],
            Period::Y2017 => [0.0532, 0.3040, 0.7476],
            Period::Y2018 => [0.0490, 0.2783, 0.7100],
        };
        match self {
            BTagWp::Loose => l,
            BTagWp::Medium => m,
            BTagWp::Tight => t,
        }
    }
}

impl FromStr for BTagWp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "L" | "l" | "loose" => Ok(BTagWp::Loose),
            "M" | "m" | "medium" => Ok(BTagWp::Medium),
            "T" | "t" | "tight" => Ok(BTagWp::Tight),
            _ => Err(unknown("b-tag", s, "L, M, T")),
        }
    }
}

/// Pileup jet-ID working point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PileupIdWp {
    /// Loose (`L`).
    Loose,
    /// Medium (`M`).
    Medium,
    /// Tight (`T`).
    Tight,
}

impl PileupIdWp {
    /// Single-letter label used by the pileup-ID tables.
    pub fn label(self) -> &'static str {
        match self {
            PileupIdWp::Loose => "L",
            PileupIdWp::Medium => "M",
            PileupIdWp::Tight => "T",
        }
    }

    /// Bit of the pileup-ID mask for this working point.
    ///
    /// The 2016 samples store the bits in the reverse order.
    pub fn bit(self, period: Period) -> i32 {
        let reversed = matches!(period, Period::Y2016Apv | Period::Y2016);
        match (self, reversed) {
            (PileupIdWp::Loose, false) | (PileupIdWp::Tight, true) => 4,
            (PileupIdWp::Medium, _) => 2,
            (PileupIdWp::Tight, false) | (PileupIdWp::Loose, true) => 1,
        }
    }
}

impl FromStr for PileupIdWp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "L" | "l" | "loose" => Ok(PileupIdWp::Loose),
            "M" | "m" | "medium" => Ok(PileupIdWp::Medium),
            "T" | "t" | "tight" => Ok(PileupIdWp::Tight),
            _ => Err(unknown("pileup ID", s, "L, M, T")),
        }
    }
}

/// Jet identification working point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JetIdWp {
    /// Tight ID.
    Tight,
    /// Tight ID with lepton veto.
    TightLepVeto,
}

impl JetIdWp {
    /// Bits of the jet-ID mask that must all be set.
    pub fn required_bits(self) -> i32 {
        match self {
            JetIdWp::Tight => 2,
            JetIdWp::TightLepVeto => 6,
        }
    }
}

impl FromStr for JetIdWp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tight" => Ok(JetIdWp::Tight),
            "tightlepveto" => Ok(JetIdWp::TightLepVeto),
            _ => Err(unknown("jet ID", s, "tight, tightlepveto")),
        }
    }
}

/// Measurement the b-tag scale factors come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SfType {
    /// Combination of QCD and ttbar measurements.
    Comb,
    /// Muon-in-jet measurement.
    Mujets,
    /// Inclusive measurement (light jets).
    Incl,
}

impl SfType {
    /// Suffix of the b-tag table key.
    pub fn as_str(self) -> &'static str {
        match self {
            SfType::Comb => "comb",
            SfType::Mujets => "mujets",
            SfType::Incl => "incl",
        }
    }
}

impl FromStr for SfType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "comb" => Ok(SfType::Comb),
            "mujets" => Ok(SfType::Mujets),
            "incl" => Ok(SfType::Incl),
            _ => Err(Error::Configuration(format!(
                "unknown b-tag scale-factor type '{s}' (expected one of comb, mujets, incl)"
            ))),
        }
    }
}

/// Hadron-flavour group a b-tag weight is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BTagFlavor {
    /// b and c jets (hadron flavour 5 and 4).
    Bc,
    /// Light jets (hadron flavour 0).
    Light,
}

impl BTagFlavor {
    /// Whether a jet of `hadron_flavour` belongs to this group.
    pub fn contains(self, hadron_flavour: i32) -> bool {
        match self {
            BTagFlavor::Bc => hadron_flavour == 4 || hadron_flavour == 5,
            BTagFlavor::Light => hadron_flavour == 0,
        }
    }

    /// Lowercase label used in the weight name.
    pub fn as_str(self) -> &'static str {
        match self {
            BTagFlavor::Bc => "bc",
            BTagFlavor::Light => "light",
        }
    }
}

impl FromStr for BTagFlavor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bc" => Ok(BTagFlavor::Bc),
            "light" => Ok(BTagFlavor::Light),
            _ => Err(Error::Configuration(format!(
                "unknown b-tag flavour '{s}' (expected bc or light)"
            ))),
        }
    }
}
