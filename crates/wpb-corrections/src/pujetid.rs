//! Pileup jet-ID efficiency weight.

use wpb_columnar::event::Jet;
use wpb_columnar::{Jagged, Weights};
use wpb_core::{Period, Result, ScaleFactorService, Variation};

use crate::sf::{SfRequest, TOTAL, register_object_sf};
use crate::working_point::PileupIdWp;

/// Service key of the pileup jet-ID scale factors.
pub const PUJETID_KEY: &str = "PUJetID_eff";

/// Register `pujetid` for jets with 20 < pt < 50 GeV passing `working_point`.
pub fn add_pujetid_weight(
    jets: &Jagged<Jet>,
    weights: &mut Weights,
    service: &dyn ScaleFactorService,
    period: Period,
    working_point: &str,
    variation: &Variation,
) -> Result<()> {
    let wp: PileupIdWp = working_point.parse()?;
    let bit = wp.bit(period);
    let mask = jets.map(|j| j.pt > 20.0 && j.pt < 50.0 && j.pu_id & bit != 0);
    let selected = jets.filter(&mask)?;
    let eta: Vec<f64> = selected.flat().iter().map(|j| j.eta).collect();
    let pt: Vec<f64> = selected.flat().iter().map(|j| j.pt).collect();
    let request = SfRequest {
        key: PUJETID_KEY,
        period: period.pog_year(),
        working_point: wp.label(),
        variants: TOTAL,
    };
    register_object_sf(weights, service, variation, "pujetid", request, &[&eta, &pt], &selected.counts())
}
