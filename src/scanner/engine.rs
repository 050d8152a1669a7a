//! Supervised universe scan loop

use super::cooldown::CooldownMap;
use super::enrichment::RateLimitedEnrichment;
use super::feed::SignalFeed;
use super::rule::SignalRule;
use super::status::StatusBoard;
use super::types::ScannerSignal;
use crate::config::{EnrichmentConfig, ScannerConfig};
use crate::feed::{MarketData, TickerSource, UniverseTicker};
use crate::store::SignalStore;
use crate::telemetry::{self, CounterMetric, LatencyMetric};
use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Status while the universe feed is being opened
pub const CONNECTING_STATUS: &str = "Connecting...";

/// Interval of the candles the rule is evaluated on
const CANDLE_INTERVAL: &str = "1m";

/// Length of the error excerpt shown in the reconnect status
const STATUS_ERROR_CHARS: usize = 15;

/// Universe-wide signal scanner
pub struct Scanner {
    config: ScannerConfig,
    quote_asset: String,
    rule: SignalRule,
    tickers: Arc<dyn TickerSource>,
    market: Arc<dyn MarketData>,
    enrichment: RateLimitedEnrichment,
    store: Arc<dyn SignalStore>,
    feed: SignalFeed,
    status: StatusBoard,
}

impl Scanner {
    pub fn new(
        config: ScannerConfig,
        enrichment: &EnrichmentConfig,
        quote_asset: impl Into<String>,
        tickers: Arc<dyn TickerSource>,
        market: Arc<dyn MarketData>,
        store: Arc<dyn SignalStore>,
    ) -> Self {
        Self {
            rule: SignalRule::from(&config),
            feed: SignalFeed::new(config.mirror_capacity),
            enrichment: RateLimitedEnrichment::new(Arc::clone(&market), enrichment),
            status: StatusBoard::new(),
            quote_asset: quote_asset.into(),
            config,
            tickers,
            market,
            store,
        }
    }

    /// Shared view of recent signals
    pub fn feed(&self) -> SignalFeed {
        self.feed.clone()
    }

    /// Shared status line
    pub fn status(&self) -> StatusBoard {
        self.status.clone()
    }

    /// Steady status while the feed is healthy
    pub fn monitoring_status(&self) -> String {
        format!("Active | Monitoring {} perpetuals", self.quote_asset)
    }

    /// Fill the in-memory feed from the store
    pub async fn prime(&self) {
        match self.store.recent(self.config.mirror_capacity).await {
            Ok(signals) => {
                tracing::info!(count = signals.len(), "Primed scanner feed from store");
                self.feed.prime(signals);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to prime scanner feed");
            }
        }
    }

    /// Scan until `cancel` fires, reconnecting after every feed failure
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            move_threshold_pct = self.config.move_threshold_pct,
            cooldown_secs = self.config.cooldown_secs,
            store = self.store.backend_type(),
            "Scanner started"
        );

        let mut cooldown = CooldownMap::new(self.config.cooldown());
        let mut tasks = JoinSet::new();

        loop {
            self.status.set(CONNECTING_STATUS);

            match self.stream_once(&cancel, &mut cooldown, &mut tasks).await {
                Ok(()) => break,
                Err(e) => {
                    let msg = e.to_string();
                    let excerpt: String = msg.chars().take(STATUS_ERROR_CHARS).collect();
                    self.status.set(format!("Reconnecting... ({excerpt})"));
                    telemetry::increment(CounterMetric::FeedReconnects, "universe");
                    tracing::error!(error = %msg, "Scanner feed error");

                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.config.reconnect_delay()) => {}
                    }
                }
            }
        }

        self.status.shutdown();

        // Pending signals still get stored, with the default ratio if need be
        self.enrichment.shutdown().await;
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "Signal task failed");
            }
        }
        tracing::info!("Scanner stopped");
    }

    /// One connection's lifetime; `Ok` only when cancelled
    async fn stream_once(
        &self,
        cancel: &CancellationToken,
        cooldown: &mut CooldownMap,
        tasks: &mut JoinSet<()>,
    ) -> anyhow::Result<()> {
        let stream_token = cancel.child_token();
        let _stream_guard = stream_token.clone().drop_guard();

        let mut rx = self.tickers.subscribe_tickers(stream_token).await?;
        self.status.set(self.monitoring_status());

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),

                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        tracing::warn!(error = %e, "Signal task failed");
                    }
                }

                batch = rx.recv() => match batch {
                    Some(batch) => self.process_batch(batch, cancel, cooldown, tasks).await,
                    None => anyhow::bail!("ticker stream closed"),
                },
            }
        }
    }

    async fn process_batch(
        &self,
        batch: Vec<UniverseTicker>,
        cancel: &CancellationToken,
        cooldown: &mut CooldownMap,
        tasks: &mut JoinSet<()>,
    ) {
        for ticker in batch {
            if cancel.is_cancelled() {
                return;
            }
            self.process_ticker(ticker, cooldown, tasks).await;
        }
    }

    async fn process_ticker(
        &self,
        ticker: UniverseTicker,
        cooldown: &mut CooldownMap,
        tasks: &mut JoinSet<()>,
    ) {
        if !ticker.symbol.ends_with(&self.quote_asset) {
            return;
        }
        let Some(change) = ticker.change_pct() else {
            return;
        };
        if change.abs() <= self.config.move_threshold_pct {
            return;
        }

        let now = Instant::now();
        if cooldown.is_cooling(&ticker.symbol, now) {
            return;
        }
        telemetry::increment(CounterMetric::ScannerCandidates, "move");

        let started = Instant::now();
        let candles = match self
            .market
            .klines(&ticker.symbol, CANDLE_INTERVAL, self.config.candle_limit)
            .await
        {
            Ok(candles) => candles,
            Err(e) => {
                tracing::warn!(symbol = %ticker.symbol, error = %e, "Candle fetch failed");
                return;
            }
        };
        telemetry::record_latency(LatencyMetric::CandleFetch, started.elapsed());

        let Some(eval) = self.rule.evaluate(&candles) else {
            return;
        };

        // Mark before handing off so a burst of tickers cannot alert twice
        cooldown.mark(ticker.symbol.clone(), now);
        telemetry::increment(CounterMetric::ScannerSignals, eval.kind.as_str());
        self.status.flash(
            format!("SIGNAL DETECTED: {}", ticker.symbol),
            self.monitoring_status(),
            self.config.status_revert(),
        );

        tracing::info!(
            symbol = %ticker.symbol,
            kind = eval.kind.as_str(),
            rsi = eval.rsi,
            momentum_pct = eval.momentum_pct,
            change_pct = change,
            "Signal detected"
        );

        let enrichment = self.enrichment.clone();
        let store = Arc::clone(&self.store);
        let feed = self.feed.clone();
        tasks.spawn(async move {
            let top_trader_ratio = enrichment.top_trader_ratio(&ticker.symbol).await;
            let signal = ScannerSignal {
                timestamp: Utc::now(),
                symbol: ticker.symbol,
                price: ticker.last_price,
                rsi: eval.rsi,
                cvd_delta: eval.cvd_delta,
                top_trader_ratio,
            };
            record_signal(store.as_ref(), &feed, signal).await;
        });
    }
}

/// Persist a signal and mirror it; a failed write still reaches the mirror
pub async fn record_signal(store: &dyn SignalStore, feed: &SignalFeed, signal: ScannerSignal) {
    if let Err(e) = store.insert(&signal).await {
        telemetry::increment(CounterMetric::StoreFailures, store.backend_type());
        tracing::error!(symbol = %signal.symbol, error = %e, "Failed to persist signal");
    }
    feed.push(signal);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemorySignalStore, StoreError};
    use async_trait::async_trait;

    struct FailingStore;

    #[async_trait]
    impl SignalStore for FailingStore {
        async fn insert(&self, _: &ScannerSignal) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }

        async fn recent(&self, _: usize) -> Result<Vec<ScannerSignal>, StoreError> {
            Err(StoreError::Poisoned)
        }

        fn backend_type(&self) -> &'static str {
            "failing"
        }
    }

    fn signal() -> ScannerSignal {
        ScannerSignal {
            timestamp: Utc::now(),
            symbol: "DOGEUSDT".into(),
            price: 0.1,
            rsi: 80.0,
            cvd_delta: 10.0,
            top_trader_ratio: 1.0,
        }
    }

    #[tokio::test]
    async fn test_record_signal_persists_and_mirrors() {
        let store = MemorySignalStore::new();
        let feed = SignalFeed::new(30);

        record_signal(&store, &feed, signal()).await;

        assert_eq!(store.recent(10).await.unwrap().len(), 1);
        assert_eq!(feed.len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_still_mirrors() {
        let feed = SignalFeed::new(30);
        record_signal(&FailingStore, &feed, signal()).await;
        assert_eq!(feed.snapshot()[0].symbol, "DOGEUSDT");
    }
}
