//! End-to-end integration tests: sessions and the HTTP surface

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use flow_terminal::config::Config;
use flow_terminal::feed::{
    Candle, InstrumentFeed, MarkPriceTick, MarketData, OpenInterest, RatioReading, StreamEvent,
    SymbolInfo, TradeTick,
};
use flow_terminal::ingest::Sources;
use flow_terminal::news::{
    FearGreed, FearGreedPoint, NewsCache, SentimentCache, SentimentSource, TrendingCoin,
};
use flow_terminal::scanner::{ScannerSignal, SignalFeed, StatusBoard};
use flow_terminal::server::create_router;
use flow_terminal::session::{AppContext, Session};
use flow_terminal::state::{NewsItem, RatioKind};
use flow_terminal::store::{MemorySignalStore, SignalStore};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

/// Hands each subscription's event sender to the test until cancelled
#[derive(Default)]
struct RecordingFeed {
    senders: Mutex<HashMap<String, mpsc::Sender<StreamEvent>>>,
}

impl RecordingFeed {
    fn sender(&self, symbol: &str) -> Option<mpsc::Sender<StreamEvent>> {
        self.senders.lock().unwrap().get(symbol).cloned()
    }
}

#[async_trait]
impl InstrumentFeed for RecordingFeed {
    async fn stream_instrument(
        &self,
        symbol: &str,
        events: mpsc::Sender<StreamEvent>,
        cancel: CancellationToken,
    ) -> anyhow::Result<()> {
        self.senders.lock().unwrap().insert(symbol.to_string(), events);
        cancel.cancelled().await;
        self.senders.lock().unwrap().remove(symbol);
        Ok(())
    }
}

struct FixedMarket;

#[async_trait]
impl MarketData for FixedMarket {
    async fn klines(&self, _: &str, _: &str, limit: u32) -> anyhow::Result<Vec<Candle>> {
        Ok((0..limit as i64)
            .map(|i| Candle {
                open_time: i * 60_000,
                open: 100.0,
                high: 100.0,
                low: 100.0,
                close: 100.0,
                volume: 1.0,
                taker_buy_volume: 0.5,
            })
            .collect())
    }

    async fn open_interest(&self, _: &str) -> anyhow::Result<OpenInterest> {
        Ok(OpenInterest {
            value: 777.0,
            time: 0,
        })
    }

    async fn positioning_ratio(
        &self,
        _: &str,
        kind: RatioKind,
        _: &str,
    ) -> anyhow::Result<Option<RatioReading>> {
        Ok(Some(RatioReading {
            kind,
            long_ratio: 0.6,
            short_ratio: 0.4,
            long_short_ratio: 1.5,
            timestamp: 0,
        }))
    }

    async fn spot_price(&self, _: &str) -> anyhow::Result<f64> {
        Ok(99.0)
    }

    async fn symbols(&self, quote: &str) -> anyhow::Result<Vec<SymbolInfo>> {
        Ok(vec![SymbolInfo {
            symbol: format!("BTC{quote}"),
            price: 42_000.0,
            change: 1.5,
            volume: 1e9,
        }])
    }
}

/// Canned Fear & Greed reading and one trending coin
struct FixedSentiment;

#[async_trait]
impl SentimentSource for FixedSentiment {
    async fn fear_greed(&self) -> anyhow::Result<Option<FearGreed>> {
        let today = FearGreedPoint {
            value: 72,
            label: "Greed".into(),
            timestamp: 1_704_153_600,
        };
        Ok(Some(FearGreed {
            value: 72,
            label: "Greed".into(),
            history: vec![today],
        }))
    }

    async fn trending(&self) -> anyhow::Result<Vec<TrendingCoin>> {
        Ok(vec![TrendingCoin {
            name: "Pepe".into(),
            symbol: "PEPE".into(),
            rank: Some(24),
            price: 0.0000112,
            change_24h: 12.35,
            thumb: String::new(),
        }])
    }
}

struct Harness {
    ctx: Arc<AppContext>,
    feed: Arc<RecordingFeed>,
    store: Arc<MemorySignalStore>,
}

fn harness() -> Harness {
    let mut config = Config::default();
    config.feed.default_symbol = "BTCUSDT".into();
    config.feed.history_candles = 5;

    let feed = Arc::new(RecordingFeed::default());
    let store = Arc::new(MemorySignalStore::new());
    let sources = Sources {
        feed: feed.clone(),
        market: Arc::new(FixedMarket),
        news: None,
        social: None,
        feed_config: config.feed.clone(),
        news_config: config.news.clone(),
    };

    let status = StatusBoard::new();
    status.set("Active | Monitoring USDT perpetuals");

    let ctx = Arc::new(AppContext::new(
        config,
        sources,
        store.clone(),
        SignalFeed::new(30),
        status,
        NewsCache::new(),
        SentimentCache::new(Arc::new(FixedSentiment), Duration::from_secs(300)),
        CancellationToken::new(),
    ));

    Harness { ctx, feed, store }
}

fn signal(symbol: &str) -> ScannerSignal {
    ScannerSignal {
        timestamp: Utc::now(),
        symbol: symbol.into(),
        price: 1.0,
        rsi: 75.0,
        cvd_delta: 500.0,
        top_trader_ratio: 1.2,
    }
}

fn trade(symbol: &str, price: f64, qty: f64, buy: bool, ts: i64) -> StreamEvent {
    StreamEvent::Trade(TradeTick {
        symbol: symbol.into(),
        price,
        quantity: qty,
        taker_is_buyer: buy,
        event_time: ts,
    })
}

fn mark(symbol: &str, price: f64, ts: i64) -> StreamEvent {
    StreamEvent::MarkPrice(MarkPriceTick {
        symbol: symbol.into(),
        mark_price: price,
        index_price: price - 1.0,
        funding_rate: 0.0001,
        event_time: ts,
    })
}

#[tokio::test(start_paused = true)]
async fn test_session_renders_live_and_shared_state() {
    let h = harness();
    h.ctx.signals.push(signal("DOGEUSDT"));
    h.ctx.global_news.set(vec![NewsItem {
        title: "Headline".into(),
        url: "https://example.com/a".into(),
        source: "wire".into(),
    }]);

    let session = Session::open(Arc::clone(&h.ctx));
    assert_eq!(session.symbol(), "BTCUSDT");
    assert_eq!(h.ctx.active_sessions(), 1);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let tx = h.feed.sender("BTCUSDT").expect("subscribed");
    let ts = 10 * 60_000;
    tokio_test::assert_ok!(tx.send(trade("BTCUSDT", 100.0, 3.0, true, ts)).await);
    tokio_test::assert_ok!(tx.send(mark("BTCUSDT", 101.0, ts)).await);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let snapshot = session.render().await;
    assert_eq!(snapshot.symbol, "BTCUSDT");
    assert_eq!(snapshot.price, 101.0);
    assert_eq!(snapshot.spot_price, 99.0);
    assert_eq!(snapshot.basis, 2.0);
    assert_eq!(snapshot.momentum.cvd, 300.0);
    assert_eq!(snapshot.momentum.open_interest, 777.0);
    assert_eq!(snapshot.ratios.top_positions.long, 0.6);
    // Five seeded minutes plus the live mark price
    assert_eq!(snapshot.history.price.len(), 6);
    assert_eq!(snapshot.scanner_signals.len(), 1);
    assert_eq!(snapshot.scanner_status, "Active | Monitoring USDT perpetuals");
    assert_eq!(snapshot.news.global[0].title, "Headline");

    session.close().await;
    assert_eq!(h.ctx.active_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_switches_instrument() {
    let h = harness();
    let mut session = Session::open(Arc::clone(&h.ctx));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let btc = h.feed.sender("BTCUSDT").expect("subscribed");
    tokio_test::assert_ok!(btc.send(trade("BTCUSDT", 100.0, 1.0, false, 60_000)).await);
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Garbage, empty and unchanged symbols are no-ops
    assert!(!session.handle_control("not json").await);
    assert!(!session.handle_control(r#"{"action":"subscribe","symbol":""}"#).await);
    assert!(!session.handle_control(r#"{"action":"subscribe","symbol":"btcusdt"}"#).await);
    assert_eq!(session.render().await.momentum.cvd, -100.0);

    drop(btc);
    assert!(session.handle_control(r#"{"action":"subscribe","symbol":"ethusdt"}"#).await);
    assert_eq!(session.symbol(), "ETHUSDT");

    // The old stream has hung up before the switch returns
    assert!(h.feed.sender("BTCUSDT").is_none());

    let snapshot = session.render().await;
    assert_eq!(snapshot.symbol, "ETHUSDT");
    assert_eq!(snapshot.momentum.cvd, 0.0);
    assert!(snapshot.trades.is_empty());

    tokio::time::sleep(Duration::from_millis(50)).await;
    let eth = h.feed.sender("ETHUSDT").expect("resubscribed");
    tokio_test::assert_ok!(eth.send(trade("ETHUSDT", 2000.0, 0.5, true, 120_000)).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(session.render().await.momentum.cvd, 1000.0);

    session.close().await;
}

async fn get_json(ctx: Arc<AppContext>, uri: &str) -> (StatusCode, Value) {
    let response = create_router(ctx)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_health_and_info() {
    let h = harness();

    let (status, json) = get_json(h.ctx.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["sessions"], 0);

    let (status, json) = get_json(h.ctx.clone(), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "flow-terminal");
}

#[tokio::test]
async fn test_signals_endpoint_returns_newest_first() {
    let h = harness();
    for symbol in ["AUSDT", "BUSDT", "CUSDT"] {
        tokio_test::assert_ok!(h.store.insert(&signal(symbol)).await);
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let (status, json) = get_json(h.ctx.clone(), "/signals?limit=2").await;
    assert_eq!(status, StatusCode::OK);
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["symbol"], "CUSDT");
    assert_eq!(rows[1]["symbol"], "BUSDT");
    assert!(rows[0]["topTraderRatio"].is_number());
}

#[tokio::test]
async fn test_symbols_and_news_endpoints() {
    let h = harness();
    h.ctx.global_news.set(vec![NewsItem {
        title: "Global".into(),
        url: "https://example.com/g".into(),
        source: "wire".into(),
    }]);

    let (status, json) = get_json(h.ctx.clone(), "/symbols").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[0]["symbol"], "BTCUSDT");

    let (status, json) = get_json(h.ctx.clone(), "/headlines").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[0]["title"], "Global");

    let (status, json) = get_json(h.ctx.clone(), "/news").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["fearGreed"]["value"], 72);
    assert_eq!(json["fearGreed"]["history"][0]["label"], "Greed");
    assert_eq!(json["trending"][0]["symbol"], "PEPE");
    assert_eq!(json["trending"][0]["change24h"], 12.35);
}

#[test]
fn test_embedded_config_loads() {
    let config = Config::embedded().unwrap();
    assert_eq!(config.feed.default_symbol, "BTCUSDT");
    assert_eq!(config.server.broadcast_interval_ms, 250);
    assert_eq!(config.news.sentiment_ttl_secs, 300);
    assert_eq!(config.enrichment.max_wait_secs, 5);
    assert!(config.store.path.is_some());
}
