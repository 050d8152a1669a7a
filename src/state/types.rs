//! Instrument state record types

use serde::{Deserialize, Serialize};

/// Aggressor side of a trade or liquidation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Parse Binance's "BUY" / "SELL"
    pub fn from_binance(s: &str) -> Option<Self> {
        match s {
            "BUY" => Some(Side::Buy),
            "SELL" => Some(Side::Sell),
            _ => None,
        }
    }
}

/// Which of the three long/short ratio slots a poll result belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatioKind {
    /// Global account long/short ratio
    GlobalAccounts,
    /// Top trader account ratio
    TopAccounts,
    /// Top trader position ratio
    TopPositions,
}

impl RatioKind {
    pub const ALL: [RatioKind; 3] = [
        RatioKind::GlobalAccounts,
        RatioKind::TopAccounts,
        RatioKind::TopPositions,
    ];
}

/// Long/short ratio snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositioningRatio {
    pub long_ratio: f64,
    pub short_ratio: f64,
    pub as_of: i64,
}

/// A forced liquidation order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidationEvent {
    pub side: Side,
    pub price: f64,
    pub quantity: f64,
    pub timestamp_ms: i64,
}

/// One entry of the trade tape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeEntry {
    pub price: f64,
    pub quantity: f64,
    pub side: Side,
    pub timestamp_ms: i64,
}

/// Divergence score label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DivergenceLabel {
    #[default]
    Balanced,
    Unstable,
    Critical,
}

impl DivergenceLabel {
    /// Map a 0..=10 score to its label
    pub fn from_score(score: u8) -> Self {
        if score >= 8 {
            DivergenceLabel::Critical
        } else if score >= 5 {
            DivergenceLabel::Unstable
        } else {
            DivergenceLabel::Balanced
        }
    }
}

/// Text used when no divergence factor fired
pub const EQUILIBRIUM: &str = "Market is in equilibrium.";

/// Composite divergence / efficiency score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivergenceScore {
    pub score: u8,
    pub label: DivergenceLabel,
    pub details: String,
}

impl Default for DivergenceScore {
    fn default() -> Self {
        Self {
            score: 0,
            label: DivergenceLabel::Balanced,
            details: EQUILIBRIUM.to_string(),
        }
    }
}

/// One social feed message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialMessage {
    pub text: String,
    pub sentiment: String,
    pub timestamp: i64,
}

/// Social sentiment sub-record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialSentiment {
    pub galaxy_score: f64,
    pub alt_rank: i64,
    /// 0 to 100
    pub sentiment: f64,
    pub sentiment_label: String,
    pub pulse: Vec<SocialMessage>,
}

impl Default for SocialSentiment {
    fn default() -> Self {
        Self {
            galaxy_score: 0.0,
            alt_rank: 0,
            sentiment: 0.0,
            sentiment_label: "Neutral".to_string(),
            pulse: Vec::new(),
        }
    }
}

/// Label a 0..100 sentiment reading
pub fn sentiment_label(sentiment: f64) -> &'static str {
    if sentiment > 75.0 {
        "Extremely Bullish"
    } else if sentiment > 60.0 {
        "Bullish"
    } else if sentiment < 25.0 {
        "Extremely Bearish"
    } else if sentiment < 40.0 {
        "Bearish"
    } else {
        "Neutral"
    }
}

/// A news headline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub url: String,
    pub source: String,
}
