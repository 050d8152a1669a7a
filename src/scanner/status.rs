//! Scanner status line with a cancellable self-revert

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Status shown before the universe feed connects
pub const IDLE_STATUS: &str = "Initializing...";

struct Inner {
    tx: watch::Sender<String>,
    revert: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Ok(mut revert) = self.revert.lock() {
            if let Some(handle) = revert.take() {
                handle.abort();
            }
        }
    }
}

/// Shared, observable scanner status
///
/// A flashed status reverts on its own after a delay. The pending revert is
/// owned here: a newer status replaces it and [`StatusBoard::shutdown`]
/// cancels it.
#[derive(Clone)]
pub struct StatusBoard {
    inner: Arc<Inner>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBoard {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(IDLE_STATUS.to_string());
        Self {
            inner: Arc::new(Inner {
                tx,
                revert: Mutex::new(None),
            }),
        }
    }

    /// Current status text
    pub fn current(&self) -> String {
        self.inner.tx.borrow().clone()
    }

    /// Watch status changes
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.inner.tx.subscribe()
    }

    fn cancel_revert(&self) {
        if let Ok(mut revert) = self.inner.revert.lock() {
            if let Some(handle) = revert.take() {
                handle.abort();
            }
        }
    }

    /// Replace the status, dropping any pending revert
    pub fn set(&self, status: impl Into<String>) {
        self.cancel_revert();
        self.inner.tx.send_replace(status.into());
    }

    /// Show `status` now and fall back to `steady` after `after`
    pub fn flash(&self, status: impl Into<String>, steady: impl Into<String>, after: Duration) {
        self.set(status);

        let tx = self.inner.tx.clone();
        let steady = steady.into();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            tx.send_replace(steady);
        });

        if let Ok(mut revert) = self.inner.revert.lock() {
            *revert = Some(handle);
        }
    }

    /// Cancel any pending revert
    pub fn shutdown(&self) {
        self.cancel_revert();
    }
}
