//! Bounded time-series history
//!
//! Fixed-capacity, time-ordered sample buffers backing every chart and
//! analytics consumer. Oldest samples are evicted first.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Width of a chart bucket in milliseconds
pub const MINUTE_MS: i64 = 60_000;

/// One point in a history buffer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Epoch milliseconds
    pub time: i64,
    /// Sampled value
    pub value: f64,
}

impl Sample {
    pub fn new(time: i64, value: f64) -> Self {
        Self { time, value }
    }
}

/// Fixed-capacity FIFO of samples with non-decreasing timestamps
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl HistoryBuffer {
    /// Create an empty buffer holding at most `capacity` samples
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest past capacity
    ///
    /// A sample whose timestamp is not newer than the newest stored sample
    /// overwrites that sample's value instead of appending.
    pub fn push(&mut self, sample: Sample) {
        self.push_bucketed(sample, 1);
    }

    /// Append a sample unless it falls inside the newest sample's bucket
    ///
    /// When `sample.time - newest.time < bucket_ms` the newest value is
    /// overwritten in place (its timestamp is kept), otherwise the sample is
    /// appended and the oldest entry evicted past capacity.
    pub fn push_bucketed(&mut self, sample: Sample, bucket_ms: i64) {
        if self.capacity == 0 {
            return;
        }

        if let Some(last) = self.samples.back_mut() {
            if sample.time - last.time < bucket_ms {
                last.value = sample.value;
                return;
            }
        }

        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Newest sample
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Sample `n` positions back from the newest (0 = newest)
    pub fn nth_back(&self, n: usize) -> Option<&Sample> {
        let len = self.samples.len();
        if n >= len {
            return None;
        }
        self.samples.get(len - 1 - n)
    }

    /// Values of the newest `n` samples, oldest first
    pub fn tail_values(&self, n: usize) -> Vec<f64> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip).map(|s| s.value).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn to_vec(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
