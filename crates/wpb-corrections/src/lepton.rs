//! Electron and muon scale-factor weights.

use wpb_columnar::event::{Electron, Muon};
use wpb_columnar::{Jagged, Weights};
use wpb_core::{Error, Period, Result, ScaleFactorService, Variation};

use crate::sf::{Domain, SYST, SfRequest, TOTAL, register_object_sf};
use crate::working_point::{ElectronIdWp, IsoWp, MuonWp};

const ELECTRON_SF_KEY: &str = "UL-Electron-ID-SF";
const ELECTRON_ID_PT: Domain = Domain::new(10.0, 499.999);
const ELECTRON_RECO_PT: Domain = Domain::new(20.1, 499.999);

const MUON_ABS_ETA: Domain = Domain::new(0.0, 2.399);
const MUON_PT: Domain = Domain::new(15.0, 119.999);
const MUON_TRIGGER_PT: Domain = Domain::new(29.0, 199.999);

/// Period tag of the electron tables: the POG year without the `_UL` suffix.
fn electron_period(period: Period) -> &'static str {
    let pog = period.pog_year();
    pog.strip_suffix("_UL").unwrap_or(pog)
}

/// Registers electron ID and reconstruction weights.
pub struct ElectronCorrector<'a> {
    electrons: &'a Jagged<Electron>,
    weights: &'a mut Weights,
    service: &'a dyn ScaleFactorService,
    period: Period,
    variation: Variation,
}

impl<'a> ElectronCorrector<'a> {
    /// Corrector for the selected electrons of one chunk.
    pub fn new(
        electrons: &'a Jagged<Electron>,
        weights: &'a mut Weights,
        service: &'a dyn ScaleFactorService,
        period: Period,
        variation: &Variation,
    ) -> Self {
        Self { electrons, weights, service, period, variation: variation.clone() }
    }

    /// Register `electron_id` for identification working point `id_wp`.
    pub fn add_id_weight(&mut self, id_wp: &str) -> Result<()> {
        let wp: ElectronIdWp = id_wp.parse()?;
        let eta: Vec<f64> = self.electrons.flat().iter().map(|e| e.eta).collect();
        let pt = ELECTRON_ID_PT.clamp_all(self.electrons.flat().iter().map(|e| e.pt));
        self.register("electron_id", wp.sf_label(), &eta, &pt)
    }

    /// Register `electron_reco` (reconstruction efficiency above 20 GeV).
    pub fn add_reco_weight(&mut self) -> Result<()> {
        let eta: Vec<f64> = self.electrons.flat().iter().map(|e| e.eta).collect();
        let pt = ELECTRON_RECO_PT.clamp_all(self.electrons.flat().iter().map(|e| e.pt));
        self.register("electron_reco", "RecoAbove20", &eta, &pt)
    }

    fn register(&mut self, name: &str, working_point: &str, eta: &[f64], pt: &[f64]) -> Result<()> {
        let request = SfRequest {
            key: ELECTRON_SF_KEY,
            period: electron_period(self.period),
            working_point,
            variants: TOTAL,
        };
        register_object_sf(
            self.weights,
            self.service,
            &self.variation,
            name,
            request,
            &[eta, pt],
            &self.electrons.counts(),
        )
    }
}

/// Registers muon ID, isolation and trigger weights.
///
/// The ID/isolation combination is checked on construction, so an
/// unsupported pairing fails before any weight is registered.
pub struct MuonCorrector<'a> {
    muons: &'a Jagged<Muon>,
    weights: &'a mut Weights,
    service: &'a dyn ScaleFactorService,
    period: Period,
    variation: Variation,
    id_wp: MuonWp,
    iso_wp: IsoWp,
    iso_key: &'static str,
}

impl<'a> MuonCorrector<'a> {
    /// Corrector for the selected muons of one chunk.
    pub fn new(
        muons: &'a Jagged<Muon>,
        weights: &'a mut Weights,
        service: &'a dyn ScaleFactorService,
        period: Period,
        variation: &Variation,
        id_wp: &str,
        iso_wp: &str,
    ) -> Result<Self> {
        let id_wp: MuonWp = id_wp.parse()?;
        let iso_wp: IsoWp = iso_wp.parse()?;
        let iso_key = iso_wp.muon_iso_key(id_wp)?;
        Ok(Self {
            muons,
            weights,
            service,
            period,
            variation: variation.clone(),
            id_wp,
            iso_wp,
            iso_key,
        })
    }

    /// Register `muon_id`.
    pub fn add_id_weight(&mut self) -> Result<()> {
        let (abs_eta, pt) = self.inputs(MUON_PT);
        self.register("muon_id", self.id_wp.id_key(), &abs_eta, &pt)
    }

    /// Register `muon_iso`.
    pub fn add_iso_weight(&mut self) -> Result<()> {
        let (abs_eta, pt) = self.inputs(MUON_PT);
        self.register("muon_iso", self.iso_key, &abs_eta, &pt)
    }

    /// Register `muon_triggeriso`. Only defined for tight ID with tight isolation.
    pub fn add_triggeriso_weight(&mut self) -> Result<()> {
        if self.id_wp != MuonWp::Tight || self.iso_wp != IsoWp::Tight {
            return Err(Error::Configuration(format!(
                "muon trigger scale factors require tight ID and tight isolation, got {:?} ID and {} isolation",
                self.id_wp, self.iso_wp
            )));
        }
        let key = match self.period {
            Period::Y2016Apv | Period::Y2016 => {
                "NUM_IsoMu24_or_IsoTkMu24_DEN_CutBasedIdTight_and_PFIsoTight"
            }
            Period::Y2017 => "NUM_IsoMu27_DEN_CutBasedIdTight_and_PFIsoTight",
            Period::Y2018 => "NUM_IsoMu24_DEN_CutBasedIdTight_and_PFIsoTight",
        };
        let (abs_eta, pt) = self.inputs(MUON_TRIGGER_PT);
        self.register("muon_triggeriso", key, &abs_eta, &pt)
    }

    fn inputs(&self, pt_domain: Domain) -> (Vec<f64>, Vec<f64>) {
        let muons = self.muons.flat();
        let abs_eta = MUON_ABS_ETA.clamp_all(muons.iter().map(|m| m.eta.abs()));
        let pt = pt_domain.clamp_all(muons.iter().map(|m| m.pt));
        (abs_eta, pt)
    }

    fn register(&mut self, name: &str, key: &str, abs_eta: &[f64], pt: &[f64]) -> Result<()> {
        let request =
            SfRequest { key, period: self.period.pog_year(), working_point: "", variants: SYST };
        register_object_sf(
            self.weights,
            self.service,
            &self.variation,
            name,
            request,
            &[abs_eta, pt],
            &self.muons.counts(),
        )
    }
}
