//! Binance REST client for candles, open interest, ratios and listings

use super::types::{de_f64, de_i64, Candle, OpenInterest, RatioReading, SymbolInfo};
use super::MarketData;
use crate::state::RatioKind;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Binance USD-M futures REST base URL
pub const BINANCE_FUTURES_REST_URL: &str = "https://fapi.binance.com";
/// Binance spot REST base URL
pub const BINANCE_SPOT_REST_URL: &str = "https://api.binance.com";

/// Configuration for the REST client
#[derive(Debug, Clone)]
pub struct RestConfig {
    pub futures_url: String,
    pub spot_url: String,
    pub timeout: Duration,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            futures_url: BINANCE_FUTURES_REST_URL.to_string(),
            spot_url: BINANCE_SPOT_REST_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawOpenInterest {
    #[serde(rename = "openInterest", deserialize_with = "de_f64")]
    open_interest: f64,
    #[serde(deserialize_with = "de_i64")]
    time: i64,
}

#[derive(Debug, Deserialize)]
struct RawRatio {
    #[serde(rename = "longShortRatio", deserialize_with = "de_f64")]
    long_short_ratio: f64,
    #[serde(rename = "longAccount", deserialize_with = "de_f64")]
    long_account: f64,
    #[serde(rename = "shortAccount", deserialize_with = "de_f64")]
    short_account: f64,
    #[serde(deserialize_with = "de_i64")]
    timestamp: i64,
}

#[derive(Debug, Deserialize)]
struct RawSpotTicker {
    #[serde(deserialize_with = "de_f64")]
    price: f64,
}

#[derive(Debug, Deserialize)]
struct Raw24h {
    symbol: String,
    #[serde(rename = "lastPrice", deserialize_with = "de_f64")]
    last_price: f64,
    #[serde(rename = "priceChangePercent", deserialize_with = "de_f64")]
    price_change_percent: f64,
    #[serde(rename = "quoteVolume", deserialize_with = "de_f64")]
    quote_volume: f64,
}

/// Client for the Binance futures and spot REST APIs
#[derive(Debug, Clone)]
pub struct BinanceRest {
    config: RestConfig,
    client: Client,
}

impl BinanceRest {
    /// Create a client with default endpoints
    pub fn new() -> anyhow::Result<Self> {
        Self::with_config(RestConfig::default())
    }

    /// Create a client with custom endpoints
    pub fn with_config(config: RestConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { config, client })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> anyhow::Result<T> {
        tracing::debug!(url = %url, "Binance REST request");

        let response = self.client.get(url).query(query).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Binance API error: {} - {}", status, body);
        }

        Ok(response.json().await?)
    }

    /// Decode the positional kline array format
    pub fn parse_klines(rows: &[Vec<Value>]) -> Vec<Candle> {
        fn num(v: Option<&Value>) -> Option<f64> {
            match v? {
                Value::String(s) => s.parse().ok(),
                Value::Number(n) => n.as_f64(),
                _ => None,
            }
        }

        rows.iter()
            .filter_map(|row| {
                Some(Candle {
                    open_time: row.first()?.as_i64()?,
                    open: num(row.get(1))?,
                    high: num(row.get(2))?,
                    low: num(row.get(3))?,
                    close: num(row.get(4))?,
                    volume: num(row.get(5))?,
                    taker_buy_volume: num(row.get(9))?,
                })
            })
            .collect()
    }

    fn rank_symbols(raw: Vec<Raw24h>, quote_asset: &str) -> Vec<SymbolInfo> {
        let mut symbols: Vec<SymbolInfo> = raw
            .into_iter()
            .filter(|t| t.symbol.ends_with(quote_asset))
            .map(|t| SymbolInfo {
                symbol: t.symbol,
                price: t.last_price,
                change: t.price_change_percent,
                volume: t.quote_volume,
            })
            .collect();
        symbols.sort_by(|a, b| b.volume.total_cmp(&a.volume));
        symbols
    }
}

fn ratio_path(kind: RatioKind) -> &'static str {
    match kind {
        RatioKind::GlobalAccounts => "globalLongShortAccountRatio",
        RatioKind::TopAccounts => "topLongShortAccountRatio",
        RatioKind::TopPositions => "topLongShortPositionRatio",
    }
}

#[async_trait]
impl MarketData for BinanceRest {
    async fn klines(&self, symbol: &str, interval: &str, limit: u32) -> anyhow::Result<Vec<Candle>> {
        let url = format!("{}/fapi/v1/klines", self.config.futures_url);
        let rows: Vec<Vec<Value>> = self
            .get_json(
                &url,
                &[
                    ("symbol", symbol.to_string()),
                    ("interval", interval.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(Self::parse_klines(&rows))
    }

    async fn open_interest(&self, symbol: &str) -> anyhow::Result<OpenInterest> {
        let url = format!("{}/fapi/v1/openInterest", self.config.futures_url);
        let raw: RawOpenInterest = self.get_json(&url, &[("symbol", symbol.to_string())]).await?;
        Ok(OpenInterest {
            value: raw.open_interest,
            time: raw.time,
        })
    }

    async fn positioning_ratio(
        &self,
        symbol: &str,
        kind: RatioKind,
        period: &str,
    ) -> anyhow::Result<Option<RatioReading>> {
        let url = format!("{}/futures/data/{}", self.config.futures_url, ratio_path(kind));
        let rows: Vec<RawRatio> = self
            .get_json(
                &url,
                &[
                    ("symbol", symbol.to_string()),
                    ("period", period.to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        Ok(rows.into_iter().last().map(|r| RatioReading {
            kind,
            long_ratio: r.long_account,
            short_ratio: r.short_account,
            long_short_ratio: r.long_short_ratio,
            timestamp: r.timestamp,
        }))
    }

    async fn spot_price(&self, symbol: &str) -> anyhow::Result<f64> {
        let url = format!("{}/api/v3/ticker/price", self.config.spot_url);
        let raw: RawSpotTicker = self.get_json(&url, &[("symbol", symbol.to_string())]).await?;
        Ok(raw.price)
    }

    async fn symbols(&self, quote_asset: &str) -> anyhow::Result<Vec<SymbolInfo>> {
        let url = format!("{}/fapi/v1/ticker/24hr", self.config.futures_url);
        let raw: Vec<Raw24h> = self.get_json(&url, &[]).await?;
        Ok(Self::rank_symbols(raw, quote_asset))
    }
}
