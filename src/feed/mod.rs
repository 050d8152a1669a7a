//! Market data feeds
//!
//! Real-time Binance USD-M streams for one instrument and for the whole
//! universe, plus the REST queries the pollers and the scanner need.

mod binance;
mod rest;
mod types;

pub use binance::{BinanceStreams, BINANCE_FUTURES_WS_URL};
pub(crate) use types::{de_f64, de_i64};
pub use rest::{BinanceRest, RestConfig, BINANCE_FUTURES_REST_URL, BINANCE_SPOT_REST_URL};
pub use types::{
    Candle, LiquidationTick, MarkPriceTick, OpenInterest, RatioReading, StreamEvent, SymbolInfo,
    TradeTick, UniverseTicker,
};

use crate::state::RatioKind;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Real-time event stream for one instrument
#[async_trait]
pub trait InstrumentFeed: Send + Sync {
    /// Forward trade, liquidation and mark-price events into `events`
    ///
    /// Runs on the caller's task and reconnects on its own until `cancel`
    /// fires. Any connection it opened is closed before it returns.
    async fn stream_instrument(
        &self,
        symbol: &str,
        events: mpsc::Sender<StreamEvent>,
        cancel: CancellationToken,
    ) -> anyhow::Result<()>;
}

/// Universe-wide ticker stream
#[async_trait]
pub trait TickerSource: Send + Sync {
    /// Subscribe to ticker batches; the receiver closes when the connection drops
    async fn subscribe_tickers(
        &self,
        cancel: CancellationToken,
    ) -> anyhow::Result<mpsc::Receiver<Vec<UniverseTicker>>>;
}

/// Point-in-time market queries
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Most recent `limit` candles of `interval`, oldest first
    async fn klines(&self, symbol: &str, interval: &str, limit: u32) -> anyhow::Result<Vec<Candle>>;

    /// Current open interest
    async fn open_interest(&self, symbol: &str) -> anyhow::Result<OpenInterest>;

    /// Latest long/short ratio of one kind, `None` when the endpoint returns nothing
    async fn positioning_ratio(
        &self,
        symbol: &str,
        kind: RatioKind,
        period: &str,
    ) -> anyhow::Result<Option<RatioReading>>;

    /// Spot market last price
    async fn spot_price(&self, symbol: &str) -> anyhow::Result<f64>;

    /// Quote-asset instruments with 24h stats, largest quote volume first
    async fn symbols(&self, quote_asset: &str) -> anyhow::Result<Vec<SymbolInfo>>;
}
