//! In-memory mirror of recent scanner signals

use super::types::ScannerSignal;
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

/// Newest-first list of recent signals shared with every session
#[derive(Clone)]
pub struct SignalFeed {
    signals: Arc<RwLock<VecDeque<ScannerSignal>>>,
    capacity: usize,
}

impl SignalFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            signals: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Add a signal at the front, dropping the oldest past capacity
    pub fn push(&self, signal: ScannerSignal) {
        let Ok(mut signals) = self.signals.write() else {
            return;
        };
        signals.push_front(signal);
        signals.truncate(self.capacity);
    }

    /// Replace the contents with `signals`, already newest first
    pub fn prime(&self, signals: Vec<ScannerSignal>) {
        let Ok(mut current) = self.signals.write() else {
            return;
        };
        current.clear();
        current.extend(signals.into_iter().take(self.capacity));
    }

    /// Copy of the current list, newest first
    pub fn snapshot(&self) -> Vec<ScannerSignal> {
        self.signals
            .read()
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.signals.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
