//! Rate-limited top-trader ratio lookup

use crate::config::EnrichmentConfig;
use crate::feed::MarketData;
use crate::state::RatioKind;
use crate::telemetry::{self, CounterMetric};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Global gate around the top-trader position ratio endpoint
///
/// At most `concurrency` callers hold a slot at once, and each slot stays
/// taken for `hold` after its response arrives. The caller gets its value
/// right away; a timer releases the slot when the hold ends, or at once
/// after [`RateLimitedEnrichment::shutdown`].
///
/// A caller that cannot get a slot within `max_wait`, or that is still
/// waiting when the gate is shut down, gets the default ratio instead.
#[derive(Clone)]
pub struct RateLimitedEnrichment {
    market: Arc<dyn MarketData>,
    gate: Arc<Semaphore>,
    slots: u32,
    hold: Duration,
    max_wait: Duration,
    default_ratio: f64,
    period: String,
    cancel: CancellationToken,
}

impl RateLimitedEnrichment {
    pub fn new(market: Arc<dyn MarketData>, config: &EnrichmentConfig) -> Self {
        let slots = config.concurrency.max(1);
        Self {
            market,
            gate: Arc::new(Semaphore::new(slots)),
            slots: slots as u32,
            hold: config.hold(),
            max_wait: config.max_wait(),
            default_ratio: config.default_ratio,
            period: config.period.clone(),
            cancel: CancellationToken::new(),
        }
    }

    /// Slots currently free
    pub fn available(&self) -> usize {
        self.gate.available_permits()
    }

    /// Slots held by an in-flight lookup or a running hold timer
    pub fn held(&self) -> usize {
        self.slots as usize - self.available()
    }

    /// Top-trader long/short position ratio, or the neutral default on failure
    pub async fn top_trader_ratio(&self, symbol: &str) -> f64 {
        let acquire = tokio::time::timeout(self.max_wait, Arc::clone(&self.gate).acquire_owned());
        let permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return self.fallback(symbol, "shutdown"),
            acquired = acquire => match acquired {
                Ok(Ok(permit)) => permit,
                Ok(Err(_)) => return self.fallback(symbol, "closed"),
                Err(_) => return self.fallback(symbol, "busy"),
            },
        };

        let lookup = self
            .market
            .positioning_ratio(symbol, RatioKind::TopPositions, &self.period);
        let ratio = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => self.fallback(symbol, "shutdown"),
            reading = lookup => match reading {
                Ok(Some(reading)) => reading.long_short_ratio,
                Ok(None) => self.fallback(symbol, "empty"),
                Err(e) => {
                    tracing::error!(symbol = %symbol, error = %e, "Top trader ratio lookup failed");
                    self.fallback(symbol, "error")
                }
            },
        };

        let hold = self.hold;
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(hold) => {}
            }
            drop(permit);
        });

        ratio
    }

    /// Fail pending lookups over to the default and cut every hold short
    ///
    /// Returns once all slots are back, so no release timer outlives the call.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        if let Ok(all) = self.gate.acquire_many(self.slots).await {
            drop(all);
        }
    }

    fn fallback(&self, symbol: &str, reason: &'static str) -> f64 {
        tracing::debug!(symbol = %symbol, reason, "Using default top trader ratio");
        telemetry::increment(CounterMetric::EnrichmentFallbacks, reason);
        self.default_ratio
    }
}
