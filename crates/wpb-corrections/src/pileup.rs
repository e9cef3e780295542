//! Per-event weights: pileup reweighting and L1 pre-firing.

use wpb_columnar::{EventBatch, Weights};
use wpb_core::error::ensure_len;
use wpb_core::{Error, Period, Result, ScaleFactorService, Variation};

use crate::sf::{SfRequest, TOTAL, register_object_sf};

/// Service key of the pileup reweighting table.
pub const PILEUP_KEY: &str = "pileup";

/// Register `pileup`, binned in the true number of interactions.
pub fn add_pileup_weight(
    events: &EventBatch,
    weights: &mut Weights,
    service: &dyn ScaleFactorService,
    period: Period,
    variation: &Variation,
) -> Result<()> {
    let n_true_int = events.pileup_n_true_int.as_deref().ok_or_else(|| {
        Error::Configuration("pileup reweighting requires the true number of interactions".into())
    })?;
    ensure_len("pileup_n_true_int", weights.n_events(), n_true_int.len())?;
    let request = SfRequest {
        key: PILEUP_KEY,
        period: period.pog_year(),
        working_point: "",
        variants: TOTAL,
    };
    let one_per_event = vec![1; n_true_int.len()];
    register_object_sf(weights, service, variation, "pileup", request, &[n_true_int], &one_per_event)
}

/// Register `l1prefiring` from the weights shipped with the sample.
///
/// 2018 has no pre-firing correction; nothing is registered there.
pub fn add_l1prefiring_weight(
    events: &EventBatch,
    weights: &mut Weights,
    period: Period,
    variation: &Variation,
) -> Result<()> {
    if !period.has_l1_prefiring() {
        log::debug!("no L1 pre-firing correction for {period}");
        return Ok(());
    }
    let prefiring = events.l1_prefiring.as_ref().ok_or_else(|| {
        Error::Configuration(format!("L1 pre-firing weights are required for {period}"))
    })?;
    if variation.is_nominal() {
        weights.add(
            "l1prefiring",
            prefiring.nom.clone(),
            Some(prefiring.up.clone()),
            Some(prefiring.dn.clone()),
        )
    } else {
        weights.add("l1prefiring", prefiring.nom.clone(), None, None)
    }
}
