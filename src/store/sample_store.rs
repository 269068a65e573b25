//! Fixed-capacity rolling buffer of samples.
//!
//! Backs both the chart series and the min/max readouts of a view. Samples
//! are kept oldest-first; the newest sample is always at the back.

use crate::telemetry::{Field, Sample};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct SampleStore {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl SampleStore {
    /// Create an empty store. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Newest stored sample.
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Iterate oldest → newest.
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn to_vec(&self) -> Vec<Sample> {
        self.samples.iter().cloned().collect()
    }

    /// Append a sample, evicting from the front past capacity.
    pub fn append(&mut self, sample: Sample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Replace the contents with a batch delivered newest-first.
    ///
    /// The batch is reversed into chronological order and only the last
    /// `limit` points are kept (`None` keeps up to capacity). The limit is
    /// never allowed to exceed capacity.
    pub fn replace_all(&mut self, newest_first: Vec<Sample>, limit: Option<usize>) {
        let keep = limit.unwrap_or(self.capacity).min(self.capacity);
        self.samples = newest_first.into_iter().take(keep).rev().collect();
    }

    /// Seed the store from an already chronological list (e.g. a cache).
    pub fn restore(&mut self, oldest_first: Vec<Sample>) {
        let skip = oldest_first.len().saturating_sub(self.capacity);
        self.samples = oldest_first.into_iter().skip(skip).collect();
    }

    /// `(min, max)` over the parsable values of `field`; `None` when there are none.
    pub fn min_max(&self, field: Field) -> Option<(f64, f64)> {
        self.samples
            .iter()
            .filter_map(|s| s.number(field))
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}
