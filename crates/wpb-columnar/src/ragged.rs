//! Ragged (jagged) per-event collections.
//!
//! A [`Jagged<T>`] stores all objects of a chunk in one flat array plus
//! per-event offsets. Per-object masks and per-object derived quantities are
//! `Jagged` values with the same offsets as the collection they index.

use std::f64::consts::PI;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use wpb_core::{Error, Result};

use crate::kinematics::Momentum;

/// A jagged (variable-length) collection: flat values + per-event offsets.
///
/// `offsets` has length `n_events + 1`. Event `i` owns
/// `flat[offsets[i]..offsets[i+1]]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Jagged<T> {
    flat: Vec<T>,
    offsets: Vec<usize>,
}

impl<T> Default for Jagged<T> {
    fn default() -> Self {
        Self { flat: Vec::new(), offsets: vec![0] }
    }
}

impl<T> Jagged<T> {
    /// Collection of `n_events` empty events.
    pub fn empty(n_events: usize) -> Self {
        Self { flat: Vec::new(), offsets: vec![0; n_events + 1] }
    }

    /// Build from one `Vec` per event.
    pub fn from_nested(nested: Vec<Vec<T>>) -> Self {
        let mut offsets = Vec::with_capacity(nested.len() + 1);
        offsets.push(0);
        let total = nested.iter().map(Vec::len).sum();
        let mut flat = Vec::with_capacity(total);
        for event in nested {
            flat.extend(event);
            offsets.push(flat.len());
        }
        Self { flat, offsets }
    }

    /// Unflatten: rebuild per-event boundaries from a flat array and per-event counts.
    pub fn from_flat_counts(flat: Vec<T>, counts: &[usize]) -> Result<Self> {
        let mut offsets = Vec::with_capacity(counts.len() + 1);
        offsets.push(0);
        let mut acc = 0usize;
        for &c in counts {
            acc += c;
            offsets.push(acc);
        }
        if acc != flat.len() {
            return Err(Error::Shape(format!(
                "counts sum to {acc} but flat array has {} entries",
                flat.len()
            )));
        }
        Ok(Self { flat, offsets })
    }

    /// Build from a flat array and explicit offsets.
    pub fn from_parts(flat: Vec<T>, offsets: Vec<usize>) -> Result<Self> {
        if offsets.first() != Some(&0) {
            return Err(Error::Shape("offsets must start at 0".into()));
        }
        if offsets.windows(2).any(|w| w[1] < w[0]) {
            return Err(Error::Shape("offsets must be non-decreasing".into()));
        }
        let end = offsets[offsets.len() - 1];
        if end != flat.len() {
            return Err(Error::Shape(format!(
                "last offset {end} does not match flat length {}",
                flat.len()
            )));
        }
        Ok(Self { flat, offsets })
    }

    /// Number of events.
    pub fn n_events(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Total number of objects across all events.
    pub fn n_objects(&self) -> usize {
        self.flat.len()
    }

    /// Flat view of all objects.
    pub fn flat(&self) -> &[T] {
        &self.flat
    }

    /// Event boundaries.
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Number of objects in each event.
    pub fn counts(&self) -> Vec<usize> {
        self.offsets.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Objects of event `i`.
    pub fn event(&self, i: usize) -> &[T] {
        &self.flat[self.offsets[i]..self.offsets[i + 1]]
    }

    /// Iterate over events.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &[T]> + '_ {
        self.offsets.windows(2).map(move |w| &self.flat[w[0]..w[1]])
    }

    /// Consume into the flat array and offsets.
    pub fn into_parts(self) -> (Vec<T>, Vec<usize>) {
        (self.flat, self.offsets)
    }

    /// `true` if `other` has exactly the same per-event cardinality.
    pub fn same_structure<U>(&self, other: &Jagged<U>) -> bool {
        self.offsets == other.offsets
    }

    /// Apply `f` to every object, keeping the structure.
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Jagged<U> {
        Jagged { flat: self.flat.iter().map(f).collect(), offsets: self.offsets.clone() }
    }

    /// Attach a flat per-object array computed elsewhere (e.g. a scale-factor lookup).
    pub fn with_flat<U>(&self, flat: Vec<U>) -> Result<Jagged<U>> {
        if flat.len() != self.flat.len() {
            return Err(Error::Shape(format!(
                "per-object array has {} entries, collection has {}",
                flat.len(),
                self.flat.len()
            )));
        }
        Ok(Jagged { flat, offsets: self.offsets.clone() })
    }

    /// Combine two aligned collections object by object.
    pub fn zip_map<U, V>(
        &self,
        other: &Jagged<U>,
        mut f: impl FnMut(&T, &U) -> V,
    ) -> Result<Jagged<V>> {
        if !self.same_structure(other) {
            return Err(Error::Shape("zip_map on collections with different structure".into()));
        }
        let flat = self.flat.iter().zip(&other.flat).map(|(a, b)| f(a, b)).collect();
        Ok(Jagged { flat, offsets: self.offsets.clone() })
    }

    /// Broadcast one value per event onto every object of that event.
    pub fn broadcast<U: Clone>(&self, per_event: &[U]) -> Result<Jagged<U>> {
        wpb_core::error::ensure_len("broadcast", self.n_events(), per_event.len())?;
        let mut flat = Vec::with_capacity(self.flat.len());
        for (value, w) in per_event.iter().zip(self.offsets.windows(2)) {
            flat.extend(std::iter::repeat_n(value.clone(), w[1] - w[0]));
        }
        Ok(Jagged { flat, offsets: self.offsets.clone() })
    }

    /// Reduce every event to a single value.
    pub fn per_event<U>(&self, f: impl FnMut(&[T]) -> U) -> Vec<U> {
        self.iter().map(f).collect()
    }
}

impl<T: Clone> Jagged<T> {
    /// Keep only objects whose mask entry is `true`.
    pub fn filter(&self, mask: &Jagged<bool>) -> Result<Jagged<T>> {
        if !self.same_structure(mask) {
            return Err(Error::Shape(format!(
                "object mask does not match collection ({} vs {} objects over {} vs {} events)",
                mask.n_objects(),
                self.n_objects(),
                mask.n_events(),
                self.n_events()
            )));
        }
        let mut flat = Vec::new();
        let mut offsets = Vec::with_capacity(self.offsets.len());
        offsets.push(0);
        for w in self.offsets.windows(2) {
            for j in w[0]..w[1] {
                if mask.flat[j] {
                    flat.push(self.flat[j].clone());
                }
            }
            offsets.push(flat.len());
        }
        Ok(Jagged { flat, offsets })
    }

    /// Object `k` of every event, `None` where the event has fewer objects.
    pub fn nth(&self, k: usize) -> Vec<Option<T>> {
        self.iter().map(|ev| ev.get(k).cloned()).collect()
    }

    /// Leading object of every event.
    pub fn firsts(&self) -> Vec<Option<T>> {
        self.nth(0)
    }

    /// Pad every event with `None` up to at least `k` entries.
    pub fn pad_none(&self, k: usize) -> Jagged<Option<T>> {
        let nested = self
            .iter()
            .map(|ev| {
                let mut out: Vec<Option<T>> = ev.iter().cloned().map(Some).collect();
                out.resize(out.len().max(k), None);
                out
            })
            .collect();
        Jagged::from_nested(nested)
    }
}

impl Jagged<bool> {
    /// Object-wise AND of two aligned masks.
    pub fn and(&self, other: &Jagged<bool>) -> Result<Jagged<bool>> {
        self.zip_map(other, |a, b| *a && *b)
    }

    /// Number of `true` entries per event.
    pub fn count_true(&self) -> Vec<usize> {
        self.per_event(|ev| ev.iter().filter(|&&b| b).count())
    }
}

impl<T: Serialize> Serialize for Jagged<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Jagged<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Vec::<Vec<T>>::deserialize(deserializer).map(Jagged::from_nested)
    }
}

/// Azimuthal difference `phi1 - phi2` wrapped to (-π, π].
pub fn delta_phi(phi1: f64, phi2: f64) -> f64 {
    let mut d = (phi1 - phi2) % (2.0 * PI);
    if d > PI {
        d -= 2.0 * PI;
    } else if d <= -PI {
        d += 2.0 * PI;
    }
    d
}

/// Angular separation ΔR = sqrt(Δη² + Δφ²).
pub fn delta_r(eta1: f64, phi1: f64, eta2: f64, phi2: f64) -> f64 {
    let deta = eta1 - eta2;
    let dphi = delta_phi(phi1, phi2);
    (deta * deta + dphi * dphi).sqrt()
}

/// Per-object mask: `true` when no `reference` object of the same event lies
/// within `threshold` in ΔR.
///
/// Matching uses the nearest reference object; events without reference
/// objects keep every object.
pub fn delta_r_mask<A: Momentum, B: Momentum>(
    collection: &Jagged<A>,
    reference: &Jagged<B>,
    threshold: f64,
) -> Result<Jagged<bool>> {
    wpb_core::error::ensure_len("delta_r_mask reference", collection.n_events(), reference.n_events())?;
    let mut flat = Vec::with_capacity(collection.n_objects());
    for (objects, refs) in collection.iter().zip(reference.iter()) {
        for obj in objects {
            let nearest = refs
                .iter()
                .map(|r| delta_r(obj.eta(), obj.phi(), r.eta(), r.phi()))
                .fold(None, |acc: Option<f64>, dr| Some(acc.map_or(dr, |a| a.min(dr))));
            flat.push(nearest.is_none_or(|dr| dr > threshold));
        }
    }
    collection.with_flat(flat)
}

/// Replace missing entries with 0.0.
pub fn normalize(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().map(|v| v.unwrap_or(0.0)).collect()
}

/// Per-event product of per-object values; events without objects get 1.0.
pub fn unflat_product(flat: &[f64], counts: &[usize]) -> Result<Vec<f64>> {
    let total: usize = counts.iter().sum();
    wpb_core::error::ensure_len("unflat_product", total, flat.len())?;
    let mut out = Vec::with_capacity(counts.len());
    let mut start = 0;
    for &c in counts {
        out.push(flat[start..start + c].iter().product());
        start += c;
    }
    Ok(out)
}
