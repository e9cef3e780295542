//! Certified-luminosity ("golden JSON") mask.

use std::collections::BTreeMap;
use std::path::Path;

use wpb_core::{Error, LumiMask, Result};

/// [`LumiMask`] built from a certification file of the form
/// `{"<run>": [[first_lumi, last_lumi], ...], ...}` (ranges inclusive).
#[derive(Debug, Clone, Default)]
pub struct GoldenJson {
    runs: BTreeMap<u32, Vec<(u32, u32)>>,
}

impl GoldenJson {
    /// Parse a certification file from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let raw: BTreeMap<u32, Vec<[u32; 2]>> = serde_json::from_str(text)?;
        let mut runs = BTreeMap::new();
        for (run, ranges) in raw {
            let mut ranges: Vec<(u32, u32)> = ranges.into_iter().map(|[a, b]| (a, b)).collect();
            if let Some((a, b)) = ranges.iter().find(|(a, b)| a > b) {
                return Err(Error::Configuration(format!(
                    "golden JSON: run {run} has inverted range [{a}, {b}]"
                )));
            }
            ranges.sort_unstable();
            runs.insert(run, ranges);
        }
        Ok(Self { runs })
    }

    /// Load a certification file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let mask = Self::from_json_str(&text)?;
        log::debug!("loaded {} certified runs from {}", mask.runs.len(), path.as_ref().display());
        Ok(mask)
    }

    /// Whether one (run, luminosity block) pair is certified.
    pub fn contains(&self, run: u32, luminosity_block: u32) -> bool {
        let Some(ranges) = self.runs.get(&run) else {
            return false;
        };
        // Ranges are sorted by first block; find the last one starting at or before the block.
        let idx = ranges.partition_point(|&(first, _)| first <= luminosity_block);
        ranges[..idx].iter().rev().any(|&(_, last)| luminosity_block <= last)
    }

    /// Number of certified runs.
    pub fn n_runs(&self) -> usize {
        self.runs.len()
    }
}

impl LumiMask for GoldenJson {
    fn mask(&self, run: &[u32], luminosity_block: &[u32]) -> Vec<bool> {
        run.iter().zip(luminosity_block).map(|(&r, &l)| self.contains(r, l)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOLDEN: &str = r#"{"297050": [[12, 137], [193, 776]], "297056": [[12, 203]]}"#;

    #[test]
    fn ranges_are_inclusive() {
        let g = GoldenJson::from_json_str(GOLDEN).unwrap();
        assert_eq!(g.n_runs(), 2);
        assert!(g.contains(297050, 12));
        assert!(g.contains(297050, 137));
        assert!(!g.contains(297050, 138));
        assert!(g.contains(297050, 500));
        assert!(!g.contains(297050, 777));
        assert!(!g.contains(297050, 11));
        assert!(!g.contains(299000, 50));
    }

    #[test]
    fn mask_is_elementwise() {
        let g = GoldenJson::from_json_str(GOLDEN).unwrap();
        let m = g.mask(&[297050, 297056, 297056, 1], &[100, 203, 204, 1]);
        assert_eq!(m, vec![true, true, false, false]);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = GoldenJson::from_json_str(r#"{"1": [[5, 4]]}"#).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
