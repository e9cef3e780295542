//! Named, write-once per-event selection masks.

use std::collections::HashMap;

use wpb_core::error::ensure_len;
use wpb_core::{Error, Result};

/// Registry of named per-event boolean masks for one chunk.
///
/// Masks are registered once and never modified; the set of names only grows.
#[derive(Debug, Clone)]
pub struct Selection {
    n_events: usize,
    names: Vec<String>,
    masks: Vec<Vec<bool>>,
    name_to_index: HashMap<String, usize>,
}

impl Selection {
    /// Empty registry for a chunk of `n_events` events.
    pub fn new(n_events: usize) -> Self {
        Self { n_events, names: Vec::new(), masks: Vec::new(), name_to_index: HashMap::new() }
    }

    /// Number of events every mask must cover.
    pub fn n_events(&self) -> usize {
        self.n_events
    }

    /// Register mask `name`.
    pub fn add(&mut self, name: impl Into<String>, mask: Vec<bool>) -> Result<()> {
        let name = name.into();
        if self.name_to_index.contains_key(&name) {
            return Err(Error::DuplicateSelection(name));
        }
        ensure_len(&format!("selection '{name}'"), self.n_events, mask.len())?;
        self.name_to_index.insert(name.clone(), self.masks.len());
        self.names.push(name);
        self.masks.push(mask);
        Ok(())
    }

    /// Elementwise AND of the named masks. An empty name list selects every event.
    pub fn all(&self, names: &[&str]) -> Result<Vec<bool>> {
        let masks = names
            .iter()
            .map(|&n| self.get(n).ok_or_else(|| Error::UnknownSelection(n.to_string())))
            .collect::<Result<Vec<_>>>()?;
        let mut out = vec![true; self.n_events];
        for mask in masks {
            for (o, &m) in out.iter_mut().zip(mask) {
                *o &= m;
            }
        }
        Ok(out)
    }

    /// Registered mask by name.
    pub fn get(&self, name: &str) -> Option<&[bool]> {
        self.name_to_index.get(name).map(|&i| self.masks[i].as_slice())
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.name_to_index.contains_key(name)
    }
}
