//! Transport-agnostic render of an instrument state

use super::types::{
    DivergenceScore, LiquidationEvent, NewsItem, PositioningRatio, Side, SocialSentiment,
    TradeEntry,
};
use crate::history::Sample;
use crate::scanner::ScannerSignal;
use serde::Serialize;

/// Full nested state record pushed to clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub symbol: String,
    pub price: f64,
    pub index_price: f64,
    pub spot_price: f64,
    pub funding_rate: f64,
    pub basis: f64,
    pub premium_index: f64,
    pub ratios: RatiosSnapshot,
    pub momentum: MomentumSnapshot,
    pub history: HistorySnapshot,
    pub liquidations: Vec<LiquidationRow>,
    pub trades: Vec<TradeRow>,
    pub social: SocialSentiment,
    pub news: NewsSnapshot,
    pub scanner_signals: Vec<ScannerSignal>,
    pub scanner_status: String,
    pub divergence: DivergenceScore,
}

impl Snapshot {
    /// Attach the shared scanner view and global news
    pub fn with_shared(
        mut self,
        scanner_signals: Vec<ScannerSignal>,
        scanner_status: String,
        global_news: Vec<NewsItem>,
    ) -> Self {
        self.scanner_signals = scanner_signals;
        self.scanner_status = scanner_status;
        self.news.global = global_news;
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RatioPair {
    pub long: f64,
    pub short: f64,
}

impl From<&PositioningRatio> for RatioPair {
    fn from(r: &PositioningRatio) -> Self {
        Self {
            long: r.long_ratio,
            short: r.short_ratio,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatiosSnapshot {
    pub global: RatioPair,
    pub top_accounts: RatioPair,
    pub top_positions: RatioPair,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MomentumSnapshot {
    pub cvd: f64,
    pub open_interest: f64,
    pub taker_buy: f64,
    pub taker_sell: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistorySnapshot {
    pub price: Vec<Sample>,
    pub oi: Vec<Sample>,
    pub cvd: Vec<Sample>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LiquidationRow {
    pub price: f64,
    pub side: Side,
    pub qty: f64,
    pub ts: i64,
}

impl From<&LiquidationEvent> for LiquidationRow {
    fn from(l: &LiquidationEvent) -> Self {
        Self {
            price: l.price,
            side: l.side,
            qty: l.quantity,
            ts: l.timestamp_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TradeRow {
    pub price: f64,
    pub qty: f64,
    pub side: Side,
    pub ts: i64,
}

impl From<&TradeEntry> for TradeRow {
    fn from(t: &TradeEntry) -> Self {
        Self {
            price: t.price,
            qty: t.quantity,
            side: t.side,
            ts: t.timestamp_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewsSnapshot {
    pub global: Vec<NewsItem>,
    pub asset: Vec<NewsItem>,
}
