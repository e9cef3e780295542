//! Jet energy corrections.

use wpb_columnar::event::Jet;
use wpb_columnar::{EventBatch, Jagged};
use wpb_core::error::ensure_len;
use wpb_core::{Error, Period, Result, ScaleFactorService, SfVariant};

/// Service key of the jet energy correction factor.
pub const JEC_KEY: &str = "jet_energy_scale";

/// Jet-energy-scale shift applied on top of the nominal correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JesShift {
    /// Nominal correction.
    #[default]
    Nominal,
    /// +1σ.
    Up,
    /// −1σ.
    Down,
}

impl JesShift {
    /// Shift implied by a systematic variation name (`JESUp`, `JESDown`).
    pub fn from_variation(name: &str) -> Self {
        match name {
            "JESUp" => JesShift::Up,
            "JESDown" => JesShift::Down,
            _ => JesShift::Nominal,
        }
    }

    fn variant(self) -> SfVariant {
        match self {
            JesShift::Nominal => SfVariant::Sf,
            JesShift::Up => SfVariant::SystUp,
            JesShift::Down => SfVariant::SystDown,
        }
    }
}

/// Re-derives jet energies of simulated jets from their raw energies.
///
/// Applies the jet energy scale only. Jets are not smeared for energy
/// resolution, so the result is a pure function of the chunk and the shift.
pub struct JetCorrector<'a> {
    service: &'a dyn ScaleFactorService,
    period: Period,
}

impl<'a> JetCorrector<'a> {
    /// Corrector for `period`.
    pub fn new(service: &'a dyn ScaleFactorService, period: Period) -> Self {
        Self { service, period }
    }

    /// Corrected jets of one chunk, in the original order.
    ///
    /// Only pt, mass and the raw factor change. Data jets are returned as is.
    pub fn correct(&self, events: &EventBatch, shift: JesShift) -> Result<Jagged<Jet>> {
        let jets = &events.jets;
        if !events.is_mc() {
            return Ok(jets.clone());
        }
        let rho = events.rho.as_deref().ok_or_else(|| {
            Error::Configuration("jet energy corrections require per-event rho".to_string())
        })?;
        let rho = jets.broadcast(rho)?;
        let flat = jets.flat();
        let area: Vec<f64> = flat.iter().map(|j| j.area).collect();
        let eta: Vec<f64> = flat.iter().map(|j| j.eta).collect();
        let raw_pt: Vec<f64> = flat.iter().map(|j| (1.0 - j.raw_factor) * j.pt).collect();

        let factor = self.service.evaluate(
            JEC_KEY,
            self.period.pog_year(),
            shift.variant(),
            "",
            &[&area, &eta, &raw_pt, rho.flat()],
        )?;
        ensure_len("jet energy correction factors", flat.len(), factor.len())?;

        let corrected = flat
            .iter()
            .zip(&raw_pt)
            .zip(&factor)
            .map(|((jet, &raw_pt), &f)| {
                let raw_mass = (1.0 - jet.raw_factor) * jet.mass;
                let pt = raw_pt * f;
                let raw_factor = if pt > 0.0 { 1.0 - raw_pt / pt } else { 0.0 };
                Jet { pt, mass: raw_mass * f, raw_factor, ..jet.clone() }
            })
            .collect();
        log::debug!("corrected {} jets ({shift:?})", flat.len());
        jets.with_flat(corrected)
    }
}
