//! File-backed binned scale-factor tables.
//!
//! A [`BinnedCorrectionSet`] is the JSON counterpart of a correction library:
//!
//! ```json
//! {
//!   "corrections": {
//!     "UL-Electron-ID-SF": [
//!       {"period": "2017", "variant": "sf", "working_point": "wp80iso",
//!        "edges": [[-2.5, 0.0, 2.5], [10.0, 50.0, 500.0]],
//!        "values": [0.97, 0.99, 0.98, 1.0]}
//!     ]
//!   }
//! }
//! ```
//!
//! `period`, `variant` and `working_point` are optional and match anything
//! when omitted. `values` are row-major over the input dimensions. An entry
//! with no `edges` is a constant.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use wpb_core::{Error, Result, ScaleFactorService, SfVariant};

/// Out-of-range policy of one table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowPolicy {
    /// Out-of-range inputs are a lookup error.
    #[default]
    Error,
    /// Out-of-range inputs use the first/last bin.
    Clamp,
}

/// One binned table for a (period, variant, working point) combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionEntry {
    /// Period tag, or `None` for every period.
    #[serde(default)]
    pub period: Option<String>,
    /// Variant, or `None` for every variant.
    #[serde(default)]
    pub variant: Option<SfVariant>,
    /// Working point, or `None` for every working point.
    #[serde(default)]
    pub working_point: Option<String>,
    /// Bin edges per input dimension.
    #[serde(default)]
    pub edges: Vec<Vec<f64>>,
    /// Row-major bin contents.
    pub values: Vec<f64>,
    /// Out-of-range policy.
    #[serde(default)]
    pub flow: FlowPolicy,
}

impl CorrectionEntry {
    fn matches(&self, period: &str, variant: SfVariant, working_point: &str) -> bool {
        self.period.as_deref().is_none_or(|p| p == period)
            && self.variant.is_none_or(|v| v == variant)
            && self.working_point.as_deref().is_none_or(|w| w == working_point)
    }

    fn validate(&self, key: &str) -> Result<()> {
        let mut expected = 1usize;
        for (dim, edges) in self.edges.iter().enumerate() {
            if edges.len() < 2 {
                return Err(Error::Configuration(format!(
                    "correction '{key}': dimension {dim} needs at least two edges"
                )));
            }
            if edges.iter().any(|e| e.is_nan()) || edges.windows(2).any(|w| w[0] >= w[1]) {
                return Err(Error::Configuration(format!(
                    "correction '{key}': edges of dimension {dim} must be strictly increasing"
                )));
            }
            expected *= edges.len() - 1;
        }
        if self.values.len() != expected {
            return Err(Error::Configuration(format!(
                "correction '{key}': expected {expected} values, got {}",
                self.values.len()
            )));
        }
        Ok(())
    }

    fn lookup(&self, key: &str, point: &[f64]) -> Result<f64> {
        let mut index = 0usize;
        for (dim, (edges, &x)) in self.edges.iter().zip(point).enumerate() {
            let n_bins = edges.len() - 1;
            let bin = match (find_bin(edges, x), self.flow) {
                (Some(b), _) => b,
                (None, FlowPolicy::Clamp) if x < edges[0] => 0,
                (None, FlowPolicy::Clamp) if x >= edges[n_bins] => n_bins - 1,
                _ => {
                    return Err(Error::Lookup(format!(
                        "correction '{key}': input {x} outside [{}, {}) in dimension {dim}",
                        edges[0], edges[n_bins]
                    )));
                }
            };
            index = index * n_bins + bin;
        }
        Ok(self.values[index])
    }
}

/// Find bin index for `val` given sorted edges.
/// Lower edges are inclusive, upper edges exclusive.
fn find_bin(edges: &[f64], val: f64) -> Option<usize> {
    if val.is_nan() || val < edges[0] || val >= edges[edges.len() - 1] {
        return None;
    }
    match edges.binary_search_by(|e| e.total_cmp(&val)) {
        Ok(i) => {
            if i >= edges.len() - 1 {
                None
            } else {
                Some(i)
            }
        }
        Err(i) => {
            if i == 0 || i >= edges.len() {
                None
            } else {
                Some(i - 1)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct CorrectionFile {
    corrections: HashMap<String, Vec<CorrectionEntry>>,
}

/// [`ScaleFactorService`] backed by binned tables loaded from JSON.
#[derive(Debug, Clone, Default)]
pub struct BinnedCorrectionSet {
    corrections: HashMap<String, Vec<CorrectionEntry>>,
}

impl BinnedCorrectionSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a set from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let file: CorrectionFile = serde_json::from_str(text)?;
        let mut set = Self::new();
        for (key, entries) in file.corrections {
            for entry in entries {
                set.insert(key.clone(), entry)?;
            }
        }
        Ok(set)
    }

    /// Load a set from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let set = Self::from_json_str(&text)?;
        log::debug!(
            "loaded {} correction keys from {}",
            set.corrections.len(),
            path.as_ref().display()
        );
        Ok(set)
    }

    /// Add one entry under `key`. Entries are matched in insertion order.
    pub fn insert(&mut self, key: impl Into<String>, entry: CorrectionEntry) -> Result<()> {
        let key = key.into();
        entry.validate(&key)?;
        self.corrections.entry(key).or_default().push(entry);
        Ok(())
    }

    /// Merge the entries of another set into this one.
    pub fn extend(&mut self, other: BinnedCorrectionSet) {
        for (key, entries) in other.corrections {
            self.corrections.entry(key).or_default().extend(entries);
        }
    }

    /// Known keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.corrections.keys().map(String::as_str)
    }
}

impl ScaleFactorService for BinnedCorrectionSet {
    fn evaluate(
        &self,
        key: &str,
        period: &str,
        variant: SfVariant,
        working_point: &str,
        inputs: &[&[f64]],
    ) -> Result<Vec<f64>> {
        let entries = self
            .corrections
            .get(key)
            .ok_or_else(|| Error::Lookup(format!("unknown correction '{key}'")))?;
        let entry = entries
            .iter()
            .find(|e| e.matches(period, variant, working_point))
            .ok_or_else(|| {
                Error::Lookup(format!(
                    "correction '{key}' has no entry for period '{period}', variant '{variant}', \
                     working point '{working_point}'"
                ))
            })?;
        let n = inputs.first().map_or(0, |c| c.len());
        if entry.edges.is_empty() {
            return Ok(vec![entry.values[0]; n]);
        }
        if inputs.len() != entry.edges.len() {
            return Err(Error::Lookup(format!(
                "correction '{key}' takes {} inputs, got {}",
                entry.edges.len(),
                inputs.len()
            )));
        }
        if let Some(col) = inputs.iter().find(|c| c.len() != n) {
            return Err(Error::Lookup(format!(
                "correction '{key}': input columns differ in length ({n} vs {})",
                col.len()
            )));
        }
        let mut point = vec![0.0; inputs.len()];
        (0..n)
            .map(|i| {
                for (p, col) in point.iter_mut().zip(inputs) {
                    *p = col[i];
                }
                entry.lookup(key, &point)
            })
            .collect()
    }

    fn has_key(&self, key: &str) -> bool {
        self.corrections.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> BinnedCorrectionSet {
        BinnedCorrectionSet::from_json_str(
            r#"{
                "corrections": {
                    "sf2d": [
                        {"period": "2017", "variant": "sf", "working_point": "T",
                         "edges": [[0.0, 1.2, 2.4], [15.0, 30.0, 120.0]],
                         "values": [1.0, 2.0, 3.0, 4.0]},
                        {"period": "2017", "variant": "systup", "working_point": "T",
                         "edges": [[0.0, 2.4]], "values": [1.5], "flow": "clamp"}
                    ],
                    "flat": [{"values": [0.5]}]
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn find_bin_edge_cases() {
        let edges = vec![0.0, 1.0, 2.0, 3.0];
        assert_eq!(find_bin(&edges, -0.5), None);
        assert_eq!(find_bin(&edges, 3.0), None);
        assert_eq!(find_bin(&edges, 0.0), Some(0));
        assert_eq!(find_bin(&edges, 1.0), Some(1));
        assert_eq!(find_bin(&edges, 2.99), Some(2));
        assert_eq!(find_bin(&edges, f64::NAN), None);
    }

    #[test]
    fn row_major_lookup() {
        let s = set();
        let eta = [0.5, 0.5, 2.0, 2.0];
        let pt = [20.0, 50.0, 20.0, 119.0];
        let out = s.evaluate("sf2d", "2017", SfVariant::Sf, "T", &[&eta, &pt]).unwrap();
        assert_eq!(out, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn out_of_range_errors_unless_clamped() {
        let s = set();
        let err = s.evaluate("sf2d", "2017", SfVariant::Sf, "T", &[&[0.5], &[120.0]]).unwrap_err();
        assert!(matches!(err, Error::Lookup(_)));
        let out = s.evaluate("sf2d", "2017", SfVariant::SystUp, "T", &[&[7.0]]).unwrap();
        assert_eq!(out, vec![1.5]);
    }

    #[test]
    fn missing_entries_are_lookup_errors() {
        let s = set();
        assert!(s.evaluate("nope", "2017", SfVariant::Sf, "T", &[]).is_err());
        let err = s.evaluate("sf2d", "2018", SfVariant::Sf, "T", &[&[0.5], &[20.0]]).unwrap_err();
        assert!(err.to_string().contains("2018"));
        assert!(s.evaluate("sf2d", "2017", SfVariant::Sf, "T", &[&[0.5]]).is_err());
    }

    #[test]
    fn wildcard_constant_entry() {
        let s = set();
        let out = s.evaluate("flat", "2016postVFP_UL", SfVariant::SfDown, "", &[&[1.0, 2.0, 3.0]]).unwrap();
        assert_eq!(out, vec![0.5; 3]);
        assert!(s.has_key("flat"));
        assert!(!s.has_key("pileup"));
    }

    #[test]
    fn malformed_entries_are_rejected() {
        let bad_count = r#"{"corrections": {"x": [{"edges": [[0.0, 1.0, 2.0]], "values": [1.0]}]}}"#;
        assert!(matches!(BinnedCorrectionSet::from_json_str(bad_count), Err(Error::Configuration(_))));
        let unsorted = r#"{"corrections": {"x": [{"edges": [[1.0, 0.0]], "values": [1.0]}]}}"#;
        assert!(matches!(BinnedCorrectionSet::from_json_str(unsorted), Err(Error::Configuration(_))));
        assert!(matches!(BinnedCorrectionSet::from_json_str("{"), Err(Error::Json(_))));
    }
}
