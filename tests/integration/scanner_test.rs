//! Universe scanner integration tests
//!
//! Drives the scanner with an in-process ticker channel and canned candles
//! under paused time.

use async_trait::async_trait;
use flow_terminal::config::{EnrichmentConfig, ScannerConfig};
use flow_terminal::feed::{
    Candle, MarketData, OpenInterest, RatioReading, SymbolInfo, TickerSource, UniverseTicker,
};
use flow_terminal::scanner::{Scanner, CONNECTING_STATUS};
use flow_terminal::state::RatioKind;
use flow_terminal::store::{MemorySignalStore, SignalStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Hands out one pre-built receiver, then refuses
struct ChannelTickers {
    rx: Mutex<Option<mpsc::Receiver<Vec<UniverseTicker>>>>,
}

impl ChannelTickers {
    fn new() -> (Arc<Self>, mpsc::Sender<Vec<UniverseTicker>>) {
        let (tx, rx) = mpsc::channel(16);
        (
            Arc::new(Self {
                rx: Mutex::new(Some(rx)),
            }),
            tx,
        )
    }
}

#[async_trait]
impl TickerSource for ChannelTickers {
    async fn subscribe_tickers(
        &self,
        _cancel: CancellationToken,
    ) -> anyhow::Result<mpsc::Receiver<Vec<UniverseTicker>>> {
        match self.rx.lock().unwrap().take() {
            Some(rx) => Ok(rx),
            None => anyhow::bail!("already subscribed"),
        }
    }
}

/// Steadily rising candles: RSI 100 and ~5% momentum
struct RisingMarket {
    kline_calls: AtomicUsize,
}

impl RisingMarket {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            kline_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl MarketData for RisingMarket {
    async fn klines(&self, _: &str, _: &str, limit: u32) -> anyhow::Result<Vec<Candle>> {
        self.kline_calls.fetch_add(1, Ordering::SeqCst);
        let mut open = 100.0;
        Ok((0..limit as i64)
            .map(|i| {
                let close = open * 1.01;
                let candle = Candle {
                    open_time: i * 60_000,
                    open,
                    high: close,
                    low: open,
                    close,
                    volume: 1_000.0,
                    taker_buy_volume: 600.0,
                };
                open = close;
                candle
            })
            .collect())
    }

    async fn open_interest(&self, _: &str) -> anyhow::Result<OpenInterest> {
        anyhow::bail!("unused")
    }

    async fn positioning_ratio(
        &self,
        _: &str,
        kind: RatioKind,
        _: &str,
    ) -> anyhow::Result<Option<RatioReading>> {
        Ok(Some(RatioReading {
            kind,
            long_ratio: 0.7,
            short_ratio: 0.3,
            long_short_ratio: 2.5,
            timestamp: 0,
        }))
    }

    async fn spot_price(&self, _: &str) -> anyhow::Result<f64> {
        anyhow::bail!("unused")
    }

    async fn symbols(&self, _: &str) -> anyhow::Result<Vec<SymbolInfo>> {
        Ok(Vec::new())
    }
}

fn ticker(symbol: &str, change_pct: f64) -> UniverseTicker {
    UniverseTicker {
        symbol: symbol.to_string(),
        last_price: 100.0 * (1.0 + change_pct / 100.0),
        open_price: 100.0,
    }
}

fn scanner_with(
    tickers: Arc<ChannelTickers>,
    market: Arc<RisingMarket>,
    store: Arc<MemorySignalStore>,
) -> Arc<Scanner> {
    scanner_with_enrichment(tickers, market, store, &EnrichmentConfig::default())
}

fn scanner_with_enrichment(
    tickers: Arc<ChannelTickers>,
    market: Arc<RisingMarket>,
    store: Arc<MemorySignalStore>,
    enrichment: &EnrichmentConfig,
) -> Arc<Scanner> {
    Arc::new(Scanner::new(
        ScannerConfig::default(),
        enrichment,
        "USDT",
        tickers,
        market,
        store,
    ))
}

fn burst() -> Vec<UniverseTicker> {
    ["AUSDT", "BUSDT", "CUSDT", "DUSDT", "EUSDT"]
        .into_iter()
        .map(|symbol| ticker(symbol, 5.0))
        .collect()
}

async fn ratios(store: &MemorySignalStore) -> Vec<f64> {
    let mut ratios: Vec<f64> = store
        .recent(100)
        .await
        .unwrap()
        .iter()
        .map(|s| s.top_trader_ratio)
        .collect();
    ratios.sort_by(|a, b| a.total_cmp(b));
    ratios
}

async fn wait_for_signals(store: &MemorySignalStore, n: usize) {
    for _ in 0..100 {
        if store.recent(100).await.unwrap().len() >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_cooldown_allows_one_signal_per_symbol() {
    let (tickers, tx) = ChannelTickers::new();
    let market = RisingMarket::new();
    let store = Arc::new(MemorySignalStore::new());
    let scanner = scanner_with(tickers, Arc::clone(&market), Arc::clone(&store));

    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let scanner = Arc::clone(&scanner);
        let cancel = cancel.clone();
        async move { scanner.run(cancel).await }
    });

    // Same symbol twice in one batch and again in the next batch
    tokio_test::assert_ok!(
        tx.send(vec![ticker("DOGEUSDT", 5.0), ticker("DOGEUSDT", 5.5)])
            .await
    );
    tokio_test::assert_ok!(tx.send(vec![ticker("DOGEUSDT", 6.0)]).await);

    wait_for_signals(&store, 1).await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    let signals = store.recent(10).await.unwrap();
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].symbol, "DOGEUSDT");
    assert_eq!(signals[0].top_trader_ratio, 2.5);
    assert_eq!(signals[0].rsi, 100.0);
    assert_eq!(market.kline_calls.load(Ordering::SeqCst), 1);
    assert_eq!(scanner.feed().len(), 1);

    // Past the cooldown the symbol may alert again
    tokio::time::sleep(Duration::from_secs(121)).await;
    tokio_test::assert_ok!(tx.send(vec![ticker("DOGEUSDT", 5.0)]).await);
    wait_for_signals(&store, 2).await;

    assert_eq!(store.recent(10).await.unwrap().len(), 2);
    assert_eq!(scanner.feed().snapshot()[0].symbol, "DOGEUSDT");

    cancel.cancel();
    tokio_test::assert_ok!(handle.await);
}

#[tokio::test(start_paused = true)]
async fn test_small_moves_and_other_quotes_are_ignored() {
    let (tickers, tx) = ChannelTickers::new();
    let market = RisingMarket::new();
    let store = Arc::new(MemorySignalStore::new());
    let scanner = scanner_with(tickers, Arc::clone(&market), Arc::clone(&store));

    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let scanner = Arc::clone(&scanner);
        let cancel = cancel.clone();
        async move { scanner.run(cancel).await }
    });

    tokio_test::assert_ok!(
        tx.send(vec![
            ticker("BTCUSDT", 0.5),
            ticker("ETHUSDT", -1.0),
            ticker("ETHBTC", 9.0),
        ])
        .await
    );
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(market.kline_calls.load(Ordering::SeqCst), 0);
    assert!(store.recent(10).await.unwrap().is_empty());

    cancel.cancel();
    tokio_test::assert_ok!(handle.await);
}

#[tokio::test(start_paused = true)]
async fn test_status_flashes_then_reverts() {
    let (tickers, tx) = ChannelTickers::new();
    let store = Arc::new(MemorySignalStore::new());
    let scanner = scanner_with(tickers, RisingMarket::new(), Arc::clone(&store));
    let status = scanner.status();

    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let scanner = Arc::clone(&scanner);
        let cancel = cancel.clone();
        async move { scanner.run(cancel).await }
    });

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(status.current(), "Active | Monitoring USDT perpetuals");

    tokio_test::assert_ok!(tx.send(vec![ticker("SOLUSDT", -4.0)]).await);
    wait_for_signals(&store, 1).await;
    assert_eq!(status.current(), "SIGNAL DETECTED: SOLUSDT");

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(status.current(), "Active | Monitoring USDT perpetuals");

    cancel.cancel();
    tokio_test::assert_ok!(handle.await);
}

#[tokio::test(start_paused = true)]
async fn test_closed_feed_reports_reconnecting() {
    let (tickers, tx) = ChannelTickers::new();
    let store = Arc::new(MemorySignalStore::new());
    let scanner = scanner_with(tickers, RisingMarket::new(), store);
    let status = scanner.status();
    assert_ne!(status.current(), CONNECTING_STATUS);

    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let scanner = Arc::clone(&scanner);
        let cancel = cancel.clone();
        async move { scanner.run(cancel).await }
    });

    tokio::time::sleep(Duration::from_millis(10)).await;
    drop(tx);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(status.current(), "Reconnecting... (ticker stream c)");

    // The retry after the reconnect delay fails as well
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(status.current(), "Reconnecting... (already subscri)");

    cancel.cancel();
    tokio_test::assert_ok!(handle.await);
}

#[tokio::test(start_paused = true)]
async fn test_burst_is_persisted_without_waiting_for_the_gate() {
    let (tickers, tx) = ChannelTickers::new();
    let store = Arc::new(MemorySignalStore::new());
    let scanner = scanner_with(tickers, RisingMarket::new(), Arc::clone(&store));

    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let scanner = Arc::clone(&scanner);
        let cancel = cancel.clone();
        async move { scanner.run(cancel).await }
    });

    tokio_test::assert_ok!(tx.send(burst()).await);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(store.recent(100).await.unwrap().len(), 2);

    // Signals that cannot get a slot within the wait bound take the default ratio
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(ratios(&store).await, vec![1.0, 1.0, 1.0, 2.5, 2.5]);
    assert_eq!(scanner.feed().len(), 5);

    cancel.cancel();
    tokio_test::assert_ok!(handle.await);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_persists_signals_still_waiting() {
    let (tickers, tx) = ChannelTickers::new();
    let store = Arc::new(MemorySignalStore::new());
    let enrichment = EnrichmentConfig {
        max_wait_secs: 600,
        ..EnrichmentConfig::default()
    };
    let scanner = scanner_with_enrichment(
        tickers,
        RisingMarket::new(),
        Arc::clone(&store),
        &enrichment,
    );

    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let scanner = Arc::clone(&scanner);
        let cancel = cancel.clone();
        async move { scanner.run(cancel).await }
    });

    tokio_test::assert_ok!(tx.send(burst()).await);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(store.recent(100).await.unwrap().len(), 2);

    cancel.cancel();
    tokio_test::assert_ok!(handle.await);

    assert_eq!(ratios(&store).await, vec![1.0, 1.0, 1.0, 2.5, 2.5]);
    assert_eq!(scanner.feed().len(), 5);
}
