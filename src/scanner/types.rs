//! Scanner record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted scanner alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannerSignal {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub price: f64,
    pub rsi: f64,
    /// Candle-window volume delta
    pub cvd_delta: f64,
    pub top_trader_ratio: f64,
}

/// Which branch of the signal rule fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// Overbought after a strong move up
    Short,
    /// Oversold after a strong move down
    Long,
    /// Large move on a volume spike
    Breakout,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Short => "short",
            SignalKind::Long => "long",
            SignalKind::Breakout => "breakout",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_signal_serializes_camel_case() {
        let signal = ScannerSignal {
            timestamp: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
            symbol: "SOLUSDT".into(),
            price: 61.5,
            rsi: 72.0,
            cvd_delta: -1200.0,
            top_trader_ratio: 1.0,
        };
        let json = serde_json::to_value(&signal).unwrap();
        assert_eq!(json["cvdDelta"], -1200.0);
        assert_eq!(json["topTraderRatio"], 1.0);
        assert_eq!(json["timestamp"], "2023-11-14T22:13:20Z");
    }
}
