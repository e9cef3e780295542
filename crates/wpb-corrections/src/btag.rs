//! b-tagging event weights.
//!
//! Per-jet data/simulation scale factors and simulated tagging efficiencies
//! are combined into one event weight by a [`BTagWeightMethod`]. The default
//! is the fixed-working-point method ([`FixedWpMethod`]):
//!
//! w = ∏_{tagged} SF_i · ∏_{untagged} (1 − SF_j·ε_j) / (1 − ε_j)

use wpb_columnar::event::Jet;
use wpb_columnar::{Jagged, Weights};
use wpb_core::error::ensure_len;
use wpb_core::{Error, Period, Result, ScaleFactorService, SfVariant, Variation};

use crate::working_point::{BTagFlavor, BTagWp, SfType};

/// Service key of the simulated tagging efficiencies.
pub const BTAG_EFFICIENCY_KEY: &str = "btag_efficiency";

const BTAG_MAX_ABS_ETA: f64 = 2.5;
const BTAG_MIN_PT: f64 = 20.0;

/// Strategy combining per-jet scale factors into one event weight.
pub trait BTagWeightMethod: Send + Sync {
    /// Event weight from the jets of one event.
    ///
    /// The three slices are aligned: tag decision, scale factor and
    /// simulated tagging efficiency of each jet.
    fn event_weight(&self, tagged: &[bool], sf: &[f64], efficiency: &[f64]) -> f64;
}

/// Fixed-working-point weight using tagged and untagged jets.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedWpMethod;

impl BTagWeightMethod for FixedWpMethod {
    fn event_weight(&self, tagged: &[bool], sf: &[f64], efficiency: &[f64]) -> f64 {
        tagged
            .iter()
            .zip(sf)
            .zip(efficiency)
            .map(|((&tag, &sf), &eff)| {
                if tag {
                    sf
                } else if eff < 1.0 {
                    (1.0 - sf * eff) / (1.0 - eff)
                } else {
                    1.0
                }
            })
            .product()
    }
}

/// Registers b-tagging weights for one chunk.
pub struct BTagCorrector<'a> {
    jets: &'a Jagged<Jet>,
    weights: &'a mut Weights,
    service: &'a dyn ScaleFactorService,
    sf_type: SfType,
    working_point: BTagWp,
    period: Period,
    variation: Variation,
    method: Box<dyn BTagWeightMethod + 'a>,
}

impl<'a> BTagCorrector<'a> {
    /// Corrector for the DeepJet tagger; working point and scale-factor
    /// type are parsed here.
    pub fn new(
        jets: &'a Jagged<Jet>,
        weights: &'a mut Weights,
        service: &'a dyn ScaleFactorService,
        sf_type: &str,
        working_point: &str,
        period: Period,
        variation: &Variation,
    ) -> Result<Self> {
        Ok(Self {
            jets,
            weights,
            service,
            sf_type: sf_type.parse()?,
            working_point: working_point.parse()?,
            period,
            variation: variation.clone(),
            method: Box::new(FixedWpMethod),
        })
    }

    /// Replace the weight combination strategy.
    pub fn with_method(mut self, method: impl BTagWeightMethod + 'a) -> Self {
        self.method = Box::new(method);
        self
    }

    /// Register `btag_<flavor>` for flavour group `flavor` (`bc` or `light`).
    pub fn add_btag_weights(&mut self, flavor: &str) -> Result<()> {
        let flavor: BTagFlavor = flavor.parse()?;
        let name = format!("btag_{}", flavor.as_str());
        if self.weights.factor(&name).is_some() {
            return Err(Error::DuplicateWeight(name));
        }
        let threshold = self.working_point.threshold(self.period);
        let mask = self.jets.map(|j| {
            j.pt > BTAG_MIN_PT && j.eta.abs() < BTAG_MAX_ABS_ETA && flavor.contains(j.hadron_flavour)
        });
        let jets = self.jets.filter(&mask)?;
        let flat = jets.flat();
        let abs_eta: Vec<f64> = flat.iter().map(|j| j.eta.abs()).collect();
        let pt: Vec<f64> = flat.iter().map(|j| j.pt).collect();
        let hadron_flavour: Vec<f64> = flat.iter().map(|j| f64::from(j.hadron_flavour)).collect();
        let tagged = jets.map(|j| j.btag_deep_flav_b > threshold);
        let inputs: [&[f64]; 3] = [&abs_eta, &pt, &hadron_flavour];

        let sf_key = format!("deepJet_{}", self.sf_type.as_str());
        let wp = self.working_point.label();
        let pog_year = self.period.pog_year();
        let efficiency =
            self.service.evaluate(BTAG_EFFICIENCY_KEY, pog_year, SfVariant::Sf, wp, &inputs)?;
        ensure_len("b-tag efficiencies", flat.len(), efficiency.len())?;
        let efficiency = jets.with_flat(efficiency)?;

        let event_weights = |variant: SfVariant| -> Result<Vec<f64>> {
            let sf = self.service.evaluate(&sf_key, pog_year, variant, wp, &inputs)?;
            let sf = jets.with_flat(sf)?;
            Ok((0..jets.n_events())
                .map(|i| {
                    self.method.event_weight(tagged.event(i), sf.event(i), efficiency.event(i))
                })
                .collect())
        };
        let nominal = event_weights(SfVariant::Sf)?;
        let (up, down) = if self.variation.is_nominal() {
            (Some(event_weights(SfVariant::SystUp)?), Some(event_weights(SfVariant::SystDown)?))
        } else {
            (None, None)
        };
        self.weights.add(name, nominal, up, down)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// SF 0.9 (up 1.0, down 0.8) and efficiency 0.5 for every jet.
    struct FixedService;

    impl ScaleFactorService for FixedService {
        fn evaluate(
            &self,
            key: &str,
            _period: &str,
            variant: SfVariant,
            working_point: &str,
            inputs: &[&[f64]],
        ) -> Result<Vec<f64>> {
            assert_eq!(working_point, "M");
            let value = match (key, variant) {
                (BTAG_EFFICIENCY_KEY, _) => 0.5,
                ("deepJet_comb", SfVariant::Sf) => 0.9,
                ("deepJet_comb", SfVariant::SystUp) => 1.0,
                ("deepJet_comb", SfVariant::SystDown) => 0.8,
                _ => return Err(Error::Lookup(format!("{key} {variant}"))),
            };
            Ok(vec![value; inputs[0].len()])
        }

        fn has_key(&self, _key: &str) -> bool {
            true
        }
    }

    fn jet(pt: f64, score: f64, flavour: i32) -> Jet {
        Jet { btag_deep_flav_b: score, hadron_flavour: flavour, ..Jet::new(pt, 0.3, 0.0) }
    }

    #[test]
    fn fixed_wp_formula() {
        let w = FixedWpMethod.event_weight(&[true, false], &[0.9, 0.9], &[0.6, 0.5]);
        assert_relative_eq!(w, 0.9 * (1.0 - 0.45) / 0.5, epsilon = 1e-12);
        assert_eq!(FixedWpMethod.event_weight(&[], &[], &[]), 1.0);
        assert_eq!(FixedWpMethod.event_weight(&[false], &[0.9], &[1.0]), 1.0);
    }

    #[test]
    fn bc_weight_uses_only_heavy_flavour_jets() {
        let jets = Jagged::from_nested(vec![
            vec![jet(50.0, 0.9, 5), jet(40.0, 0.1, 4), jet(60.0, 0.9, 0)],
            vec![jet(10.0, 0.9, 5)],
        ]);
        let mut w = Weights::new(2);
        let mut c =
            BTagCorrector::new(&jets, &mut w, &FixedService, "comb", "M", Period::Y2017, &Variation::Nominal)
                .unwrap();
        c.add_btag_weights("bc").unwrap();
        assert!(matches!(c.add_btag_weights("bc"), Err(Error::DuplicateWeight(_))));
        drop(c);
        let bc = w.factor("btag_bc").unwrap();
        assert_relative_eq!(bc[0], 0.9 * (1.0 - 0.45) / 0.5, epsilon = 1e-12);
        assert_eq!(bc[1], 1.0);
        let up = w.weight(Some("btag_bcUp")).unwrap();
        assert_relative_eq!(up[0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn custom_method_is_used() {
        struct TaggedCount;
        impl BTagWeightMethod for TaggedCount {
            fn event_weight(&self, tagged: &[bool], _sf: &[f64], _efficiency: &[f64]) -> f64 {
                tagged.iter().filter(|t| **t).count() as f64
            }
        }
        let jets = Jagged::from_nested(vec![vec![jet(30.0, 0.9, 0), jet(30.0, 0.0, 0)]]);
        let mut w = Weights::new(1);
        BTagCorrector::new(&jets, &mut w, &FixedService, "comb", "M", Period::Y2018, &Variation::from("JESUp"))
            .unwrap()
            .with_method(TaggedCount)
            .add_btag_weights("light")
            .unwrap();
        assert_eq!(w.factor("btag_light").unwrap(), &[1.0]);
        assert!(w.variations().is_empty());
    }

    #[test]
    fn bad_configuration() {
        let jets: Jagged<Jet> = Jagged::empty(0);
        let mut w = Weights::new(0);
        let svc = FixedService;
        assert!(BTagCorrector::new(&jets, &mut w, &svc, "ttbar", "M", Period::Y2017, &Variation::Nominal).is_err());
        let mut w = Weights::new(0);
        assert!(BTagCorrector::new(&jets, &mut w, &svc, "comb", "XL", Period::Y2017, &Variation::Nominal).is_err());
    }
}
