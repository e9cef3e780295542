//! Cumulative cutflow accounting over a selection registry.

use serde::{Deserialize, Serialize};
use wpb_core::error::ensure_len;
use wpb_core::Result;

use crate::selection::Selection;

/// One cutflow step: the AND of this cut with every previous cut of the region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutflowStep {
    /// Cut name.
    pub name: String,
    /// Sum of event weights passing all cuts up to and including this one.
    pub sumw: f64,
    /// Number of events passing all cuts up to and including this one.
    pub n_events: u64,
}

/// Ordered cutflow of one region.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Cutflow {
    /// Steps in region order.
    pub steps: Vec<CutflowStep>,
}

impl Cutflow {
    /// Progressively AND `cuts` and record the selected weight sum at each prefix.
    pub fn compute(selection: &Selection, weights: &[f64], cuts: &[&str]) -> Result<Self> {
        ensure_len("cutflow weights", selection.n_events(), weights.len())?;
        let mut steps = Vec::with_capacity(cuts.len());
        for i in 0..cuts.len() {
            let mask = selection.all(&cuts[..=i])?;
            let (sumw, n_events) = mask
                .iter()
                .zip(weights)
                .filter(|(m, _)| **m)
                .fold((0.0, 0u64), |(s, n), (_, &w)| (s + w, n + 1));
            steps.push(CutflowStep { name: cuts[i].to_string(), sumw, n_events });
        }
        Ok(Self { steps })
    }

    /// Weight sum after cut `name`.
    pub fn sumw(&self, name: &str) -> Option<f64> {
        self.steps.iter().find(|s| s.name == name).map(|s| s.sumw)
    }

    /// Event count after cut `name`.
    pub fn n_events(&self, name: &str) -> Option<u64> {
        self.steps.iter().find(|s| s.name == name).map(|s| s.n_events)
    }

    /// Add another chunk's cutflow step by step (matched by name; new names are appended).
    pub fn merge(&mut self, other: &Cutflow) {
        for step in &other.steps {
            match self.steps.iter_mut().find(|s| s.name == step.name) {
                Some(s) => {
                    s.sumw += step.sumw;
                    s.n_events += step.n_events;
                }
                None => self.steps.push(step.clone()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wpb_core::Error;

    fn registry() -> Selection {
        let mut s = Selection::new(5);
        s.add("a", vec![true, true, true, false, true]).unwrap();
        s.add("b", vec![true, false, true, true, true]).unwrap();
        s.add("c", vec![false, false, true, true, true]).unwrap();
        s
    }

    #[test]
    fn cumulative_sums() {
        let s = registry();
        let w = [1.0, 2.0, 3.0, 4.0, 5.0];
        let cf = Cutflow::compute(&s, &w, &["a", "b", "c"]).unwrap();
        assert_eq!(cf.steps.len(), 3);
        assert_eq!(cf.sumw("a"), Some(11.0));
        assert_eq!(cf.sumw("b"), Some(9.0));
        assert_eq!(cf.sumw("c"), Some(8.0));
        assert_eq!(cf.n_events("c"), Some(2));
    }

    #[test]
    fn monotonically_non_increasing() {
        let s = registry();
        let w = [0.5, 1.5, 0.25, 2.0, 1.0];
        for cuts in [["a", "b", "c"], ["c", "a", "b"], ["b", "c", "a"]] {
            let cf = Cutflow::compute(&s, &w, &cuts).unwrap();
            for pair in cf.steps.windows(2) {
                assert!(pair[1].sumw <= pair[0].sumw);
                assert!(pair[1].n_events <= pair[0].n_events);
            }
        }
    }

    #[test]
    fn zero_weights_keep_counts() {
        let s = registry();
        let cf = Cutflow::compute(&s, &[0.0; 5], &["a", "b"]).unwrap();
        assert!(cf.steps.iter().all(|st| st.sumw == 0.0));
        assert_eq!(cf.n_events("a"), Some(4));
        assert_eq!(cf.n_events("b"), Some(3));
    }

    #[test]
    fn unknown_cut_fails() {
        let s = registry();
        let err = Cutflow::compute(&s, &[1.0; 5], &["a", "zzz"]).unwrap_err();
        assert!(matches!(err, Error::UnknownSelection(_)));
        assert!(Cutflow::compute(&s, &[1.0; 4], &["a"]).is_err());
    }

    #[test]
    fn merge_adds_matching_steps() {
        let s = registry();
        let mut a = Cutflow::compute(&s, &[1.0; 5], &["a", "b"]).unwrap();
        let b = Cutflow::compute(&s, &[2.0; 5], &["a", "b"]).unwrap();
        a.merge(&b);
        assert_eq!(a.sumw("a"), Some(12.0));
        assert_eq!(a.n_events("b"), Some(6));
    }
}
