//! Market data feed types

use crate::state::{RatioKind, Side};
use serde::{de, Deserialize, Deserializer, Serialize};

/// One decoded event from an instrument stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Trade(TradeTick),
    Liquidation(LiquidationTick),
    MarkPrice(MarkPriceTick),
}

impl StreamEvent {
    /// Metric label for the event kind
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Trade(_) => "trade",
            StreamEvent::Liquidation(_) => "liquidation",
            StreamEvent::MarkPrice(_) => "mark_price",
        }
    }
}

/// Aggregated aggressor trade
#[derive(Debug, Clone, PartialEq)]
pub struct TradeTick {
    pub symbol: String,
    pub price: f64,
    pub quantity: f64,
    pub taker_is_buyer: bool,
    /// Exchange event time (ms)
    pub event_time: i64,
}

/// Forced liquidation order
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidationTick {
    pub symbol: String,
    pub side: Side,
    pub price: f64,
    pub quantity: f64,
    pub event_time: i64,
}

/// Mark price update
#[derive(Debug, Clone, PartialEq)]
pub struct MarkPriceTick {
    pub symbol: String,
    pub mark_price: f64,
    pub index_price: f64,
    pub funding_rate: f64,
    pub event_time: i64,
}

/// One instrument's entry in a universe ticker batch
#[derive(Debug, Clone, PartialEq)]
pub struct UniverseTicker {
    pub symbol: String,
    pub last_price: f64,
    pub open_price: f64,
}

impl UniverseTicker {
    /// 24h percent change, `None` without a positive open
    pub fn change_pct(&self) -> Option<f64> {
        if self.open_price > 0.0 {
            Some((self.last_price - self.open_price) / self.open_price * 100.0)
        } else {
            None
        }
    }
}

/// One-minute (or other interval) candle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub taker_buy_volume: f64,
}

/// Open interest reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenInterest {
    pub value: f64,
    pub time: i64,
}

/// Long/short ratio reading for one of the three ratio endpoints
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioReading {
    pub kind: RatioKind,
    pub long_ratio: f64,
    pub short_ratio: f64,
    pub long_short_ratio: f64,
    pub timestamp: i64,
}

/// Listing entry for the symbol selector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolInfo {
    pub symbol: String,
    pub price: f64,
    /// 24h percent change
    pub change: f64,
    /// 24h quote volume
    pub volume: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StrOrNum {
    Str(String),
    Float(f64),
}

/// Accept a JSON number or a numeric string
pub(crate) fn de_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    match StrOrNum::deserialize(d)? {
        StrOrNum::Str(s) => s.trim().parse().map_err(de::Error::custom),
        StrOrNum::Float(n) => Ok(n),
    }
}

/// Accept a JSON integer or an integer string
pub(crate) fn de_i64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    match StrOrNum::deserialize(d)? {
        StrOrNum::Str(s) => s.trim().parse().map_err(de::Error::custom),
        StrOrNum::Float(n) => Ok(n as i64),
    }
}
