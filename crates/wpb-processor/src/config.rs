//! Configuration of the Z→ℓℓ processor.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use wpb_core::{Error, LumiMask, NoLumiMask, Period, Result, ScaleFactorService, Variation};

/// Electron selection working points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectronSelection {
    /// Minimum pt in GeV.
    pub pt_threshold: f64,
    /// Identification working point.
    pub id_wp: String,
    /// Optional isolation working point.
    pub iso_wp: Option<String>,
}

impl Default for ElectronSelection {
    fn default() -> Self {
        Self { pt_threshold: 30.0, id_wp: "wp80iso".into(), iso_wp: None }
    }
}

/// Muon selection working points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MuonSelection {
    /// Minimum pt in GeV.
    pub pt_threshold: f64,
    /// Identification working point.
    pub id_wp: String,
    /// Isolation working point.
    pub iso_wp: String,
}

impl Default for MuonSelection {
    fn default() -> Self {
        Self { pt_threshold: 30.0, id_wp: "tight".into(), iso_wp: "tight".into() }
    }
}

/// b-jet selection working points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JetSelection {
    /// Minimum pt in GeV.
    pub pt_threshold: f64,
    /// Jet ID working point.
    pub jet_id: String,
    /// Pileup jet-ID working point.
    pub pileup_id: String,
    /// DeepJet working point.
    pub btag_wp: String,
}

impl Default for JetSelection {
    fn default() -> Self {
        Self {
            pt_threshold: 20.0,
            jet_id: "tightlepveto".into(),
            pileup_id: "T".into(),
            btag_wp: "M".into(),
        }
    }
}

/// Object selection of the Z→ℓℓ control region.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ZToLLSelectionConfig {
    /// Electron cuts.
    pub electron: ElectronSelection,
    /// Muon cuts.
    pub muon: MuonSelection,
    /// b-jet cuts.
    pub jet: JetSelection,
}

/// Lepton channel of the control region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeptonFlavor {
    /// Di-electron channel.
    Ele,
    /// Di-muon channel.
    Mu,
}

impl LeptonFlavor {
    /// Channel label (`ele` / `mu`).
    pub fn as_str(self) -> &'static str {
        match self {
            LeptonFlavor::Ele => "ele",
            LeptonFlavor::Mu => "mu",
        }
    }

    /// Ordered cut list of this channel's region.
    pub fn region(self) -> [&'static str; 10] {
        let (trigger, pair) = match self {
            LeptonFlavor::Ele => ("trigger_ele", "ee"),
            LeptonFlavor::Mu => ("trigger_mu", "mumu"),
        };
        [
            "goodvertex",
            "lumi",
            trigger,
            "metfilters",
            "bjet_veto",
            "two_leptons",
            "neutral",
            "mass_range",
            "mthlt60",
            pair,
        ]
    }
}

impl fmt::Display for LeptonFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeptonFlavor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ele" => Ok(LeptonFlavor::Ele),
            "mu" => Ok(LeptonFlavor::Mu),
            _ => Err(Error::Configuration(format!("unknown lepton flavor '{s}' (expected ele or mu)"))),
        }
    }
}

/// HLT paths per year and channel: `{"2017": {"ele": [...], "mu": [...]}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerTable(pub BTreeMap<String, BTreeMap<String, Vec<String>>>);

impl TriggerTable {
    /// Single-lepton triggers of the Run 2 UL samples.
    pub fn run2_ul() -> Self {
        let entry = |ele: &[&str], mu: &[&str]| {
            BTreeMap::from([
                ("ele".to_string(), ele.iter().map(|s| s.to_string()).collect()),
                ("mu".to_string(), mu.iter().map(|s| s.to_string()).collect()),
            ])
        };
        Self(BTreeMap::from([
            ("2016".to_string(), entry(&["Ele27_WPTight_Gsf"], &["IsoMu24", "IsoTkMu24"])),
            ("2017".to_string(), entry(&["Ele35_WPTight_Gsf"], &["IsoMu27"])),
            ("2018".to_string(), entry(&["Ele32_WPTight_Gsf"], &["IsoMu24"])),
        ]))
    }

    /// Parse from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    /// Trigger paths of `channel` for `period`.
    pub fn paths(&self, period: Period, channel: &str) -> Result<&[String]> {
        self.0
            .get(period.year())
            .and_then(|channels| channels.get(channel))
            .map(Vec::as_slice)
            .ok_or_else(|| {
                Error::Configuration(format!("no '{channel}' triggers configured for {}", period.year()))
            })
    }
}

impl Default for TriggerTable {
    fn default() -> Self {
        Self::run2_ul()
    }
}

/// MET filter names of one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetFilterLists {
    /// Filters applied to simulation.
    pub mc: Vec<String>,
    /// Filters applied to data.
    pub data: Vec<String>,
}

/// MET filters per year: `{"2017": {"mc": [...], "data": [...]}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetFilterTable(pub BTreeMap<String, MetFilterLists>);

impl MetFilterTable {
    /// Recommended UL filters.
    pub fn run2_ul() -> Self {
        let common = [
            "goodVertices",
            "globalSuperTightHalo2016Filter",
            "HBHENoiseFilter",
            "HBHENoiseIsoFilter",
            "EcalDeadCellTriggerPrimitiveFilter",
            "BadPFMuonFilter",
            "BadPFMuonDzFilter",
        ];
        let lists = |extra_mc: &[&str], extra_data: &[&str]| {
            let to_vec = |extra: &[&str]| {
                common.iter().chain(extra).map(|s| s.to_string()).collect::<Vec<_>>()
            };
            MetFilterLists { mc: to_vec(extra_mc), data: to_vec(extra_data) }
        };
        Self(BTreeMap::from([
            ("2016".to_string(), lists(&[], &["eeBadScFilter"])),
            ("2017".to_string(), lists(&["ecalBadCalibFilter"], &["eeBadScFilter", "ecalBadCalibFilter"])),
            ("2018".to_string(), lists(&["ecalBadCalibFilter"], &["eeBadScFilter", "ecalBadCalibFilter"])),
        ]))
    }

    /// Parse from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    /// Filter lists for `period`.
    pub fn lists(&self, period: Period) -> Result<&MetFilterLists> {
        self.0.get(period.year()).ok_or_else(|| {
            Error::Configuration(format!("no MET filters configured for {}", period.year()))
        })
    }
}

impl Default for MetFilterTable {
    fn default() -> Self {
        Self::run2_ul()
    }
}

/// Everything a [`crate::ZToLLProcessor`] needs, including the injected
/// lookup services.
#[derive(Clone)]
pub struct ProcessorConfig {
    /// Run period of the samples.
    pub period: Period,
    /// Lepton channel.
    pub lepton_flavor: LeptonFlavor,
    /// `Nominal`, or the single systematic being processed.
    pub variation: Variation,
    /// Object working points.
    pub selection: ZToLLSelectionConfig,
    /// b-tag scale-factor measurement type.
    pub btag_sf_type: String,
    /// HLT paths.
    pub triggers: TriggerTable,
    /// MET filters.
    pub met_filters: MetFilterTable,
    /// Scale-factor lookup service.
    pub scale_factors: Arc<dyn ScaleFactorService>,
    /// Certified-luminosity mask for data.
    pub lumi_mask: Arc<dyn LumiMask>,
}

impl ProcessorConfig {
    /// Configuration with default working points, Run 2 UL trigger and
    /// filter tables and no luminosity mask.
    pub fn new(
        period: Period,
        lepton_flavor: LeptonFlavor,
        scale_factors: Arc<dyn ScaleFactorService>,
    ) -> Self {
        Self {
            period,
            lepton_flavor,
            variation: Variation::Nominal,
            selection: ZToLLSelectionConfig::default(),
            btag_sf_type: "comb".into(),
            triggers: TriggerTable::default(),
            met_filters: MetFilterTable::default(),
            scale_factors,
            lumi_mask: Arc::new(NoLumiMask),
        }
    }

    /// Set the systematic variation.
    pub fn variation(mut self, variation: impl Into<Variation>) -> Self {
        self.variation = variation.into();
        self
    }

    /// Set the object working points.
    pub fn selection(mut self, selection: ZToLLSelectionConfig) -> Self {
        self.selection = selection;
        self
    }

    /// Set the b-tag scale-factor type.
    pub fn btag_sf_type(mut self, sf_type: impl Into<String>) -> Self {
        self.btag_sf_type = sf_type.into();
        self
    }

    /// Set the trigger table.
    pub fn triggers(mut self, triggers: TriggerTable) -> Self {
        self.triggers = triggers;
        self
    }

    /// Set the MET filter table.
    pub fn met_filters(mut self, met_filters: MetFilterTable) -> Self {
        self.met_filters = met_filters;
        self
    }

    /// Set the luminosity mask applied to data.
    pub fn lumi_mask(mut self, lumi_mask: Arc<dyn LumiMask>) -> Self {
        self.lumi_mask = lumi_mask;
        self
    }
}

impl fmt::Debug for ProcessorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorConfig")
            .field("period", &self.period)
            .field("lepton_flavor", &self.lepton_flavor)
            .field("variation", &self.variation)
            .field("selection", &self.selection)
            .field("btag_sf_type", &self.btag_sf_type)
            .finish_non_exhaustive()
    }
}
