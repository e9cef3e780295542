//! Per-chunk processor output and chunk merging.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use wpb_columnar::{Cutflow, WeightStatistics};
use wpb_core::{Error, Result};

/// Named feature columns of the selected events, all of equal length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureTable {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl FeatureTable {
    /// Table without columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append column `name`; its length must match the existing columns.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        if self.names.contains(&name) {
            return Err(Error::Configuration(format!("feature '{name}' already present")));
        }
        if let Some(first) = self.columns.first()
            && first.len() != values.len()
        {
            return Err(Error::Shape(format!(
                "feature '{name}': expected length {}, got {}",
                first.len(),
                values.len()
            )));
        }
        self.names.push(name);
        self.columns.push(values);
        Ok(())
    }

    /// Column by name.
    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.names.iter().position(|n| n == name).map(|i| self.columns[i].as_slice())
    }

    /// Column names, in insertion order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append the rows of `other`. Both tables must have the same columns
    /// in the same order, unless `self` has no columns yet.
    pub fn append(&mut self, other: FeatureTable) -> Result<()> {
        if self.names.is_empty() {
            *self = other;
            return Ok(());
        }
        if other.names.is_empty() {
            return Ok(());
        }
        if self.names != other.names {
            return Err(Error::Shape(format!(
                "cannot append feature table with columns {:?} to {:?}",
                other.names, self.names
            )));
        }
        for (col, extra) in self.columns.iter_mut().zip(other.columns) {
            col.extend(extra);
        }
        Ok(())
    }
}

impl Serialize for FeatureTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.names.len()))?;
        for (name, col) in self.names.iter().zip(&self.columns) {
            map.serialize_entry(name, col)?;
        }
        map.end()
    }
}

/// Per-factor weight statistics in ledger registration order, serialized
/// as a map.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeightStatisticsTable {
    entries: Vec<(String, WeightStatistics)>,
}

impl WeightStatisticsTable {
    /// Statistics of factor `name`.
    pub fn get(&self, name: &str) -> Option<&WeightStatistics> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    /// Whether factor `name` is present.
    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Factor names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Entries, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &WeightStatistics)> + '_ {
        self.entries.iter().map(|(n, s)| (n.as_str(), s))
    }

    /// Number of factors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no factor was registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge the statistics of another chunk. Known names are combined in
    /// place, new names are appended.
    pub fn merge(&mut self, other: &WeightStatisticsTable) {
        for (name, stats) in &other.entries {
            match self.entries.iter_mut().find(|(n, _)| n == name) {
                Some((_, s)) => s.merge(stats),
                None => self.entries.push((name.clone(), *stats)),
            }
        }
    }
}

impl FromIterator<(String, WeightStatistics)> for WeightStatisticsTable {
    fn from_iter<I: IntoIterator<Item = (String, WeightStatistics)>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

impl Serialize for WeightStatisticsTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, stats) in &self.entries {
            map.serialize_entry(name, stats)?;
        }
        map.end()
    }
}

/// Bookkeeping of one processed chunk.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RunMetadata {
    /// Sum of combined nominal weights before any selection.
    pub sumw: f64,
    /// Statistics of every registered weight factor.
    pub weight_statistics: WeightStatisticsTable,
    /// Cutflow of the configured region.
    pub cutflow: Cutflow,
    /// Events in the chunk.
    pub events_before: u64,
    /// Events passing the full region selection.
    pub events_after: u64,
}

impl RunMetadata {
    /// Add the bookkeeping of another chunk.
    pub fn merge(&mut self, other: &RunMetadata) {
        self.sumw += other.sumw;
        self.weight_statistics.merge(&other.weight_statistics);
        self.cutflow.merge(&other.cutflow);
        self.events_before += other.events_before;
        self.events_after += other.events_after;
    }
}

/// Result of processing one chunk.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ChunkOutput {
    /// Bookkeeping.
    pub metadata: RunMetadata,
    /// Features of the selected events.
    pub arrays: FeatureTable,
}

impl ChunkOutput {
    /// Fold another chunk into this one: columns are concatenated, counts
    /// and sums are added.
    pub fn merge(&mut self, other: ChunkOutput) -> Result<()> {
        self.arrays.append(other.arrays)?;
        self.metadata.merge(&other.metadata);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wpb_columnar::CutflowStep;

    fn chunk(rows: usize, weight: f64) -> ChunkOutput {
        let mut arrays = FeatureTable::new();
        arrays.insert("mll", vec![91.0; rows]).unwrap();
        arrays.insert("weights", vec![weight; rows]).unwrap();
        ChunkOutput {
            metadata: RunMetadata {
                sumw: weight * 10.0,
                weight_statistics: [("genweight".to_string(), WeightStatistics::from_values(&[weight; 10]))]
                    .into_iter()
                    .collect(),
                cutflow: Cutflow {
                    steps: vec![CutflowStep { name: "goodvertex".into(), sumw: weight * 10.0, n_events: 10 }],
                },
                events_before: 10,
                events_after: rows as u64,
            },
            arrays,
        }
    }

    #[test]
    fn insert_checks_length_and_names() {
        let mut t = FeatureTable::new();
        t.insert("a", vec![1.0, 2.0]).unwrap();
        assert!(matches!(t.insert("b", vec![1.0]), Err(Error::Shape(_))));
        assert!(t.insert("a", vec![1.0, 2.0]).is_err());
        assert_eq!(t.len(), 2);
        assert_eq!(t.names(), ["a".to_string()]);
    }

    #[test]
    fn merge_concatenates_and_sums() {
        let mut a = chunk(2, 1.0);
        a.merge(chunk(3, 0.5)).unwrap();
        assert_eq!(a.arrays.len(), 5);
        assert_eq!(a.arrays.get("weights").unwrap(), &[1.0, 1.0, 0.5, 0.5, 0.5]);
        assert_eq!(a.metadata.events_before, 20);
        assert_eq!(a.metadata.events_after, 5);
        assert_eq!(a.metadata.sumw, 15.0);
        assert_eq!(a.metadata.cutflow.n_events("goodvertex"), Some(20));
        let g = a.metadata.weight_statistics.get("genweight").unwrap();
        assert_eq!(g.n, 20);
        assert_eq!(g.minw, 0.5);
    }

    #[test]
    fn merge_into_default() {
        let mut total = ChunkOutput::default();
        total.merge(chunk(1, 2.0)).unwrap();
        total.merge(chunk(0, 2.0)).unwrap();
        assert_eq!(total.arrays.len(), 1);
        assert_eq!(total.metadata.events_before, 20);
    }

    #[test]
    fn mismatched_columns_fail() {
        let mut a = chunk(1, 1.0);
        let mut b = FeatureTable::new();
        b.insert("ptl1", vec![40.0]).unwrap();
        assert!(a.arrays.append(b).is_err());
    }

    #[test]
    fn serializes_columns_in_order() {
        let json = serde_json::to_string(&chunk(1, 1.0).arrays).unwrap();
        assert_eq!(json, r#"{"mll":[91.0],"weights":[1.0]}"#);
    }

    #[test]
    fn weight_statistics_keep_registration_order() {
        let stats = |v: f64| WeightStatistics::from_values(&[v]);
        let mut a: WeightStatisticsTable =
            [("genweight".to_string(), stats(1.0)), ("pileup".to_string(), stats(0.9))].into_iter().collect();
        let b: WeightStatisticsTable =
            [("pileup".to_string(), stats(1.1)), ("btag_bc".to_string(), stats(0.8))].into_iter().collect();
        a.merge(&b);
        assert_eq!(a.names().collect::<Vec<_>>(), ["genweight", "pileup", "btag_bc"]);
        assert_eq!(a.get("pileup").unwrap().n, 2);
        let json = serde_json::to_string(&a).unwrap();
        assert!(json.find("genweight").unwrap() < json.find("pileup").unwrap());
        assert!(json.find("pileup").unwrap() < json.find("btag_bc").unwrap());
    }
}
