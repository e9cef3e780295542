//! Shared plumbing for scale-factor weights: input clamping and the
//! lookup → per-event product → ledger registration sequence.

use wpb_columnar::{Weights, unflat_product};
use wpb_core::{Error, Result, ScaleFactorService, SfVariant, Variation};

/// Closed interval an input is clamped into before a table lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    /// Lower bound.
    pub lo: f64,
    /// Upper bound.
    pub hi: f64,
}

impl Domain {
    /// `[lo, hi]`; `lo` must not exceed `hi`.
    pub const fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    /// Clamp one value. NaN stays NaN.
    pub fn clamp(self, x: f64) -> f64 {
        if x < self.lo {
            self.lo
        } else if x > self.hi {
            self.hi
        } else {
            x
        }
    }

    /// Clamp every value of an iterator.
    pub fn clamp_all(self, values: impl IntoIterator<Item = f64>) -> Vec<f64> {
        values.into_iter().map(|x| self.clamp(x)).collect()
    }
}

/// Labels of the nominal, up and down variants of one table family.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Variants {
    pub nominal: SfVariant,
    pub up: SfVariant,
    pub down: SfVariant,
}

/// `sf` / `sfup` / `sfdown`.
pub(crate) const TOTAL: Variants =
    Variants { nominal: SfVariant::Sf, up: SfVariant::SfUp, down: SfVariant::SfDown };

/// `sf` / `systup` / `systdown`.
pub(crate) const SYST: Variants =
    Variants { nominal: SfVariant::Sf, up: SfVariant::SystUp, down: SfVariant::SystDown };

/// Which table entry a weight is looked up from.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SfRequest<'a> {
    pub key: &'a str,
    pub period: &'a str,
    pub working_point: &'a str,
    pub variants: Variants,
}

/// Look up per-object scale factors, reduce them to per-event products and
/// register the result as factor `name`.
///
/// Up/down variants are looked up and registered only in nominal mode.
pub(crate) fn register_object_sf(
    weights: &mut Weights,
    service: &dyn ScaleFactorService,
    variation: &Variation,
    name: &str,
    request: SfRequest<'_>,
    inputs: &[&[f64]],
    counts: &[usize],
) -> Result<()> {
    if weights.factor(name).is_some() {
        return Err(Error::DuplicateWeight(name.to_string()));
    }
    let per_event = |variant: SfVariant| -> Result<Vec<f64>> {
        let sf =
            service.evaluate(request.key, request.period, variant, request.working_point, inputs)?;
        unflat_product(&sf, counts)
    };
    let nominal = per_event(request.variants.nominal)?;
    if variation.is_nominal() {
        let up = per_event(request.variants.up)?;
        let down = per_event(request.variants.down)?;
        weights.add(name, nominal, Some(up), Some(down))
    } else {
        weights.add(name, nominal, None, None)
    }
}
