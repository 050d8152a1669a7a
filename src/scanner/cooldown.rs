//! Per-symbol alert cooldown

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Last alert time per symbol
#[derive(Debug)]
pub struct CooldownMap {
    period: Duration,
    last_alert: HashMap<String, Instant>,
}

impl CooldownMap {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_alert: HashMap::new(),
        }
    }

    /// Whether `symbol` alerted less than one period before `now`
    pub fn is_cooling(&self, symbol: &str, now: Instant) -> bool {
        self.last_alert
            .get(symbol)
            .is_some_and(|last| now.saturating_duration_since(*last) < self.period)
    }

    /// Record an alert for `symbol` at `now`
    pub fn mark(&mut self, symbol: impl Into<String>, now: Instant) {
        self.last_alert.insert(symbol.into(), now);
    }

    pub fn len(&self) -> usize {
        self.last_alert.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_alert.is_empty()
    }
}
