//! Event-weight ledger: named multiplicative factors with optional up/down variants.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use wpb_core::error::ensure_len;
use wpb_core::{Error, Result};

/// Direction of a systematic shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shift {
    /// +1σ.
    Up,
    /// −1σ.
    Down,
}

impl Shift {
    /// Suffix appended to a factor name to form a modifier (`"Up"` / `"Down"`).
    pub fn suffix(self) -> &'static str {
        match self {
            Shift::Up => "Up",
            Shift::Down => "Down",
        }
    }
}

/// Summary of one factor's nominal values, kept for validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightStatistics {
    /// Sum of values.
    pub sumw: f64,
    /// Sum of squared values.
    pub sumw2: f64,
    /// Smallest value (`+inf` when empty).
    pub minw: f64,
    /// Largest value (`-inf` when empty).
    pub maxw: f64,
    /// Number of values.
    pub n: u64,
}

impl WeightStatistics {
    /// Statistics of a slice of values.
    pub fn from_values(values: &[f64]) -> Self {
        let mut s = Self::default();
        for &w in values {
            s.sumw += w;
            s.sumw2 += w * w;
            s.minw = s.minw.min(w);
            s.maxw = s.maxw.max(w);
            s.n += 1;
        }
        s
    }

    /// Combine with the statistics of another chunk.
    pub fn merge(&mut self, other: &WeightStatistics) {
        self.sumw += other.sumw;
        self.sumw2 += other.sumw2;
        self.minw = self.minw.min(other.minw);
        self.maxw = self.maxw.max(other.maxw);
        self.n += other.n;
    }
}

impl Default for WeightStatistics {
    fn default() -> Self {
        Self { sumw: 0.0, sumw2: 0.0, minw: f64::INFINITY, maxw: f64::NEG_INFINITY, n: 0 }
    }
}

#[derive(Debug, Clone)]
struct WeightFactor {
    name: String,
    nominal: Vec<f64>,
    variations: Option<(Vec<f64>, Vec<f64>)>,
}

/// Ledger of per-event multiplicative weight factors for one chunk.
///
/// The combined weight is the elementwise product of every registered
/// nominal factor. Registration order is kept for reporting only.
#[derive(Debug, Clone)]
pub struct Weights {
    n_events: usize,
    factors: Vec<WeightFactor>,
    name_to_index: HashMap<String, usize>,
}

impl Weights {
    /// Empty ledger for a chunk of `n_events` events (combined weight is 1.0).
    pub fn new(n_events: usize) -> Self {
        Self { n_events, factors: Vec::new(), name_to_index: HashMap::new() }
    }

    /// Number of events every factor must cover.
    pub fn n_events(&self) -> usize {
        self.n_events
    }

    /// Register factor `name`, optionally with its up/down variants.
    ///
    /// Fails without modifying the ledger on a duplicate name, a length
    /// mismatch, or when only one of `weight_up` / `weight_down` is given.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        weight: Vec<f64>,
        weight_up: Option<Vec<f64>>,
        weight_down: Option<Vec<f64>>,
    ) -> Result<()> {
        let name = name.into();
        if self.name_to_index.contains_key(&name) {
            return Err(Error::DuplicateWeight(name));
        }
        let variations = match (weight_up, weight_down) {
            (Some(up), Some(down)) => Some((up, down)),
            (None, None) => None,
            _ => {
                return Err(Error::Configuration(format!(
                    "weight '{name}': up and down variations must be given together"
                )));
            }
        };
        ensure_len(&format!("weight '{name}'"), self.n_events, weight.len())?;
        if let Some((up, down)) = &variations {
            ensure_len(&format!("weight '{name}' up"), self.n_events, up.len())?;
            ensure_len(&format!("weight '{name}' down"), self.n_events, down.len())?;
        }
        self.name_to_index.insert(name.clone(), self.factors.len());
        self.factors.push(WeightFactor { name, nominal: weight, variations });
        Ok(())
    }

    /// Combined per-event weight.
    ///
    /// `None` gives the product of all nominal factors. `Some("<factor>Up")`
    /// or `Some("<factor>Down")` substitutes that factor's variant.
    pub fn weight(&self, modifier: Option<&str>) -> Result<Vec<f64>> {
        let Some(modifier) = modifier else {
            return Ok(self.product(None));
        };
        let (name, shift) = if let Some(name) = modifier.strip_suffix("Up") {
            (name, Shift::Up)
        } else if let Some(name) = modifier.strip_suffix("Down") {
            (name, Shift::Down)
        } else {
            return Err(Error::Configuration(format!(
                "weight modifier '{modifier}' must end in 'Up' or 'Down'"
            )));
        };
        self.weight_shifted(name, shift)
    }

    /// Combined weight with factor `name` shifted up or down.
    pub fn weight_shifted(&self, name: &str, shift: Shift) -> Result<Vec<f64>> {
        let &index = self
            .name_to_index
            .get(name)
            .ok_or_else(|| Error::UnknownWeight(name.to_string()))?;
        if self.factors[index].variations.is_none() {
            return Err(Error::MissingVariation(name.to_string()));
        }
        Ok(self.product(Some((index, shift))))
    }

    fn product(&self, substitute: Option<(usize, Shift)>) -> Vec<f64> {
        let mut out = vec![1.0; self.n_events];
        for (i, factor) in self.factors.iter().enumerate() {
            let values = match (substitute, &factor.variations) {
                (Some((j, Shift::Up)), Some((up, _))) if j == i => up,
                (Some((j, Shift::Down)), Some((_, down))) if j == i => down,
                _ => &factor.nominal,
            };
            for (o, &w) in out.iter_mut().zip(values) {
                *o *= w;
            }
        }
        out
    }

    /// Every valid modifier (`"<factor>Up"`, `"<factor>Down"`), in registration order.
    pub fn variations(&self) -> Vec<String> {
        self.factors
            .iter()
            .filter(|f| f.variations.is_some())
            .flat_map(|f| [Shift::Up, Shift::Down].map(|s| format!("{}{}", f.name, s.suffix())))
            .collect()
    }

    /// Registered factor names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.factors.iter().map(|f| f.name.as_str())
    }

    /// Nominal values of one factor.
    pub fn factor(&self, name: &str) -> Option<&[f64]> {
        self.name_to_index.get(name).map(|&i| self.factors[i].nominal.as_slice())
    }

    /// Per-factor statistics of the nominal values, in registration order.
    pub fn weight_statistics(&self) -> Vec<(String, WeightStatistics)> {
        self.factors
            .iter()
            .map(|f| (f.name.clone(), WeightStatistics::from_values(&f.nominal)))
            .collect()
    }
}
