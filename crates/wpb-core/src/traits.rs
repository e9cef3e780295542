//! Service traits for external lookups.
//!
//! The processing core never loads correction tables or certification files
//! itself; it receives implementations of these traits through its
//! configuration. Implementations are shared read-only across chunks, hence
//! the `Send + Sync` bounds.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Variant label requested from a scale-factor table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SfVariant {
    /// Nominal scale factor.
    Sf,
    /// Total uncertainty, +1σ.
    SfUp,
    /// Total uncertainty, −1σ.
    SfDown,
    /// Systematic uncertainty, +1σ.
    SystUp,
    /// Systematic uncertainty, −1σ.
    SystDown,
}

impl SfVariant {
    /// Label as used by the tables.
    pub fn as_str(self) -> &'static str {
        match self {
            SfVariant::Sf => "sf",
            SfVariant::SfUp => "sfup",
            SfVariant::SfDown => "sfdown",
            SfVariant::SystUp => "systup",
            SfVariant::SystDown => "systdown",
        }
    }
}

impl fmt::Display for SfVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scale-factor lookup service.
pub trait ScaleFactorService: Send + Sync {
    /// Evaluate table `key` for one period tag, variant and working point.
    ///
    /// `inputs` holds one slice per binning variable, all of the same length
    /// (one entry per flattened object). The result has that same length and
    /// preserves input order.
    fn evaluate(
        &self,
        key: &str,
        period: &str,
        variant: SfVariant,
        working_point: &str,
        inputs: &[&[f64]],
    ) -> Result<Vec<f64>>;

    /// Whether the service knows table `key`.
    fn has_key(&self, key: &str) -> bool;
}

/// Certified-luminosity mask for real detector data.
pub trait LumiMask: Send + Sync {
    /// `true` for every (run, luminosity block) pair certified as good.
    fn mask(&self, run: &[u32], luminosity_block: &[u32]) -> Vec<bool>;
}

/// Mask accepting every luminosity block.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLumiMask;

impl LumiMask for NoLumiMask {
    fn mask(&self, run: &[u32], _luminosity_block: &[u32]) -> Vec<bool> {
        vec![true; run.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_labels() {
        assert_eq!(SfVariant::Sf.as_str(), "sf");
        assert_eq!(SfVariant::SystDown.to_string(), "systdown");
        let v: SfVariant = serde_json::from_str("\"sfup\"").unwrap();
        assert_eq!(v, SfVariant::SfUp);
    }

    #[test]
    fn no_lumi_mask_accepts_everything() {
        let m = NoLumiMask.mask(&[1, 2, 3], &[4, 5, 6]);
        assert_eq!(m, vec![true; 3]);
    }
}
