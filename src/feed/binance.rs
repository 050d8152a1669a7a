//! Binance USD-M futures WebSocket streams

use super::types::{de_f64, LiquidationTick, MarkPriceTick, StreamEvent, TradeTick, UniverseTicker};
use super::{InstrumentFeed, TickerSource};
use crate::state::Side;
use crate::ws::{WsClient, WsConfig, WsMessage};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Binance futures WebSocket base URL
pub const BINANCE_FUTURES_WS_URL: &str = "wss://fstream.binance.com";

/// Combined-stream envelope
#[derive(Debug, Deserialize)]
struct Combined<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "e")]
enum RawEvent {
    #[serde(rename = "aggTrade")]
    AggTrade(RawAggTrade),
    #[serde(rename = "forceOrder")]
    ForceOrder(RawForceOrder),
    #[serde(rename = "markPriceUpdate")]
    MarkPrice(RawMarkPrice),
}

#[derive(Debug, Deserialize)]
struct RawAggTrade {
    #[serde(rename = "E")]
    event_time: i64,
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "p", deserialize_with = "de_f64")]
    price: f64,
    #[serde(rename = "q", deserialize_with = "de_f64")]
    quantity: f64,
    /// Buyer is the maker, i.e. the taker sold
    #[serde(rename = "m")]
    buyer_is_maker: bool,
}

#[derive(Debug, Deserialize)]
struct RawForceOrder {
    #[serde(rename = "E")]
    event_time: i64,
    #[serde(rename = "o")]
    order: RawLiquidationOrder,
}

#[derive(Debug, Deserialize)]
struct RawLiquidationOrder {
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "S")]
    side: String,
    #[serde(rename = "q", deserialize_with = "de_f64")]
    quantity: f64,
    #[serde(rename = "p", deserialize_with = "de_f64")]
    price: f64,
    #[serde(rename = "ap", deserialize_with = "de_f64")]
    average_price: f64,
}

#[derive(Debug, Deserialize)]
struct RawMarkPrice {
    #[serde(rename = "E")]
    event_time: i64,
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "p", deserialize_with = "de_f64")]
    mark_price: f64,
    #[serde(rename = "i", deserialize_with = "de_f64")]
    index_price: f64,
    #[serde(rename = "r", deserialize_with = "de_f64")]
    funding_rate: f64,
}

#[derive(Debug, Deserialize)]
struct RawTicker {
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "c", deserialize_with = "de_f64")]
    last_price: f64,
    #[serde(rename = "o", deserialize_with = "de_f64")]
    open_price: f64,
}

impl RawEvent {
    fn into_event(self) -> Option<StreamEvent> {
        match self {
            RawEvent::AggTrade(t) => Some(StreamEvent::Trade(TradeTick {
                symbol: t.symbol,
                price: t.price,
                quantity: t.quantity,
                taker_is_buyer: !t.buyer_is_maker,
                event_time: t.event_time,
            })),
            RawEvent::ForceOrder(f) => {
                let side = Side::from_binance(&f.order.side)?;
                let price = if f.order.average_price > 0.0 {
                    f.order.average_price
                } else {
                    f.order.price
                };
                Some(StreamEvent::Liquidation(LiquidationTick {
                    symbol: f.order.symbol,
                    side,
                    price,
                    quantity: f.order.quantity,
                    event_time: f.event_time,
                }))
            }
            RawEvent::MarkPrice(m) => Some(StreamEvent::MarkPrice(MarkPriceTick {
                symbol: m.symbol,
                mark_price: m.mark_price,
                index_price: m.index_price,
                funding_rate: m.funding_rate,
                event_time: m.event_time,
            })),
        }
    }
}

/// Binance futures stream client
#[derive(Debug, Clone)]
pub struct BinanceStreams {
    base_url: String,
    reconnect_delay: Duration,
}

impl BinanceStreams {
    /// Create a stream client against `base_url` with a fixed reconnect delay
    pub fn new(base_url: impl Into<String>, reconnect_delay: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            reconnect_delay,
        }
    }

    /// Combined trade, liquidation and mark-price stream URL for one symbol
    pub fn instrument_url(&self, symbol: &str) -> String {
        let s = symbol.to_lowercase();
        format!(
            "{}/stream?streams={s}@aggTrade/{s}@forceOrder/{s}@markPrice@1s",
            self.base_url
        )
    }

    /// All-market 24h ticker stream URL
    pub fn universe_url(&self) -> String {
        format!("{}/ws/!ticker@arr", self.base_url)
    }

    /// Parse one instrument stream message, combined or raw
    pub fn parse_event(msg: &str) -> Option<StreamEvent> {
        let raw = match serde_json::from_str::<Combined<RawEvent>>(msg) {
            Ok(combined) => combined.data,
            Err(_) => serde_json::from_str::<RawEvent>(msg).ok()?,
        };
        raw.into_event()
    }

    /// Parse one universe ticker batch
    pub fn parse_tickers(msg: &str) -> Option<Vec<UniverseTicker>> {
        let raw: Vec<RawTicker> = serde_json::from_str(msg).ok()?;
        Some(
            raw.into_iter()
                .map(|t| UniverseTicker {
                    symbol: t.symbol,
                    last_price: t.last_price,
                    open_price: t.open_price,
                })
                .collect(),
        )
    }

    /// Forward decoded instrument events until the socket or receiver goes away
    async fn run_event_loop(mut ws_rx: mpsc::Receiver<WsMessage>, tx: mpsc::Sender<StreamEvent>) {
        while let Some(msg) = ws_rx.recv().await {
            match msg {
                WsMessage::Text(text) => {
                    if let Some(event) = Self::parse_event(&text) {
                        if tx.send(event).await.is_err() {
                            tracing::debug!("Event receiver dropped, stopping stream");
                            break;
                        }
                    }
                }
                WsMessage::Connected => {
                    tracing::info!("Instrument stream connected");
                }
                WsMessage::Disconnected => {
                    tracing::warn!("Instrument stream disconnected");
                    break;
                }
                WsMessage::Reconnecting { attempt } => {
                    tracing::warn!(attempt, "Instrument stream reconnecting...");
                }
            }
        }
    }

    /// Forward decoded ticker batches until the first disconnect
    async fn run_ticker_loop(
        mut ws_rx: mpsc::Receiver<WsMessage>,
        tx: mpsc::Sender<Vec<UniverseTicker>>,
    ) {
        while let Some(msg) = ws_rx.recv().await {
            match msg {
                WsMessage::Text(text) => {
                    if let Some(batch) = Self::parse_tickers(&text) {
                        if tx.send(batch).await.is_err() {
                            break;
                        }
                    }
                }
                WsMessage::Connected => {
                    tracing::info!("Universe ticker stream connected");
                }
                WsMessage::Disconnected | WsMessage::Reconnecting { .. } => break,
            }
        }
    }
}

#[async_trait]
impl InstrumentFeed for BinanceStreams {
    async fn stream_instrument(
        &self,
        symbol: &str,
        events: mpsc::Sender<StreamEvent>,
        cancel: CancellationToken,
    ) -> anyhow::Result<()> {
        let config = WsConfig::new(self.instrument_url(symbol)).reconnect_delay(self.reconnect_delay);
        let (ws_tx, ws_rx) = mpsc::channel(config.buffer_size);
        let client = WsClient::new(config);

        tracing::info!(symbol = %symbol, "Subscribing to instrument streams");

        tokio::join!(client.run(ws_tx, cancel), Self::run_event_loop(ws_rx, events));

        tracing::debug!(symbol = %symbol, "Instrument streams closed");
        Ok(())
    }
}

#[async_trait]
impl TickerSource for BinanceStreams {
    async fn subscribe_tickers(
        &self,
        cancel: CancellationToken,
    ) -> anyhow::Result<mpsc::Receiver<Vec<UniverseTicker>>> {
        let (tx, rx) = mpsc::channel(64);

        // The scanner supervises reconnects itself, so surface the first failure
        let config = WsConfig::new(self.universe_url()).max_reconnects(1);
        let ws_rx = WsClient::new(config).connect(cancel);

        tokio::spawn(async move {
            Self::run_ticker_loop(ws_rx, tx).await;
        });

        Ok(rx)
    }
}
