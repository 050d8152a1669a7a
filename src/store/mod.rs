//! Signal persistence
//!
//! Append-only store of scanner signals with newest-first retrieval.

mod memory;
mod sqlite;

pub use memory::MemorySignalStore;
pub use sqlite::SqliteSignalStore;

use crate::scanner::ScannerSignal;
use async_trait::async_trait;
use thiserror::Error;

/// Signal store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Failed to create store directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("Blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("Store connection lock poisoned")]
    Poisoned,
}

/// Persistence sink for scanner signals
#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Append one signal
    async fn insert(&self, signal: &ScannerSignal) -> Result<(), StoreError>;

    /// Up to `limit` most recent signals, newest first
    async fn recent(&self, limit: usize) -> Result<Vec<ScannerSignal>, StoreError>;

    /// Backend name for logs
    fn backend_type(&self) -> &'static str;
}
