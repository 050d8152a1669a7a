//! In-memory signal store

use super::{SignalStore, StoreError};
use crate::scanner::ScannerSignal;
use async_trait::async_trait;
use std::sync::Mutex;

/// Volatile store used when no database path is configured
#[derive(Debug, Default)]
pub struct MemorySignalStore {
    signals: Mutex<Vec<ScannerSignal>>,
}

impl MemorySignalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SignalStore for MemorySignalStore {
    async fn insert(&self, signal: &ScannerSignal) -> Result<(), StoreError> {
        let mut signals = self.signals.lock().map_err(|_| StoreError::Poisoned)?;
        signals.push(signal.clone());
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ScannerSignal>, StoreError> {
        let signals = self.signals.lock().map_err(|_| StoreError::Poisoned)?;
        let mut out: Vec<ScannerSignal> = signals.iter().rev().cloned().collect();
        // Stable sort keeps insertion order (newest first) among equal timestamps
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        out.truncate(limit);
        Ok(out)
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}
