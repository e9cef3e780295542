//! Missing-transverse-momentum corrections.

use wpb_columnar::Jagged;
use wpb_columnar::event::{Jet, Met};
use wpb_core::error::ensure_len;
use wpb_core::{Error, Period, Result};

/// Jets below this corrected pt do not contribute to the type-1 correction.
const TYPE1_MIN_JET_PT: f64 = 15.0;
/// Vertex multiplicity is clamped to this value in the XY correction.
const XY_MAX_NPV: f64 = 100.0;

/// Propagate jet energy corrections to MET (type-1).
///
/// For every jet whose corrected pt exceeds 15 GeV, the change of its
/// transverse momentum vector is subtracted from the MET vector.
pub fn propagate_jet_corrections(
    met: &[Met],
    original: &Jagged<Jet>,
    corrected: &Jagged<Jet>,
) -> Result<Vec<Met>> {
    ensure_len("type-1 MET jets", met.len(), original.n_events())?;
    if !original.same_structure(corrected) {
        return Err(Error::Shape("type-1 MET: corrected jets differ in structure".to_string()));
    }
    let out = met
        .iter()
        .zip(original.iter().zip(corrected.iter()))
        .map(|(m, (before, after))| {
            let (mut mx, mut my) = (m.pt * m.phi.cos(), m.pt * m.phi.sin());
            for (b, a) in before.iter().zip(after) {
                if a.pt > TYPE1_MIN_JET_PT {
                    mx -= a.pt * a.phi.cos() - b.pt * b.phi.cos();
                    my -= a.pt * a.phi.sin() - b.pt * b.phi.sin();
                }
            }
            Met { pt: mx.hypot(my), phi: my.atan2(mx) }
        })
        .collect();
    Ok(out)
}

/// Per-period XY-modulation coefficients: x = -(ax·npv + bx), y = -(ay·npv + by).
fn xy_coefficients(period: Period) -> [f64; 4] {
    match period {
        Period::Y2016Apv => [-0.188743, 0.136539, 0.0127927, 0.117747],
        Period::Y2016 => [-0.153497, -0.231751, 0.00731978, 0.243323],
        Period::Y2017 => [-0.300155, 1.90608, 0.300213, -2.02232],
        Period::Y2018 => [0.183518, 0.546754, 0.192263, -0.42121],
    }
}

/// Correct the MET φ modulation with the number of good vertices.
///
/// Only simulated samples are corrected; data is returned unchanged.
pub fn met_phi_correction(
    met: &[Met],
    npvs_good: &[u32],
    period: Period,
    is_mc: bool,
) -> Result<Vec<Met>> {
    ensure_len("MET phi correction npvs_good", met.len(), npvs_good.len())?;
    if !is_mc {
        return Ok(met.to_vec());
    }
    let [ax, bx, ay, by] = xy_coefficients(period);
    let out = met
        .iter()
        .zip(npvs_good)
        .map(|(m, &npv)| {
            let npv = f64::from(npv).min(XY_MAX_NPV);
            let x = m.pt * m.phi.cos() - (ax * npv + bx);
            let y = m.pt * m.phi.sin() - (ay * npv + by);
            Met { pt: x.hypot(y), phi: y.atan2(x) }
        })
        .collect();
    Ok(out)
}
