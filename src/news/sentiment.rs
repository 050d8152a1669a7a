//! Market mood: Fear & Greed index and trending coins

use crate::feed::{de_f64, de_i64};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// alternative.me Fear & Greed endpoint, last seven days
pub const FEAR_GREED_URL: &str = "https://api.alternative.me/fng/?limit=7";
/// CoinGecko trending search endpoint
pub const COINGECKO_TRENDING_URL: &str = "https://api.coingecko.com/api/v3/search/trending";

/// Trending coins kept per refresh
const TRENDING_LIMIT: usize = 10;

/// One day of the Fear & Greed index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FearGreedPoint {
    pub value: i64,
    pub label: String,
    pub timestamp: i64,
}

/// Today's reading plus the days before it, newest first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FearGreed {
    pub value: i64,
    pub label: String,
    pub history: Vec<FearGreedPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingCoin {
    pub name: String,
    pub symbol: String,
    pub rank: Option<u32>,
    pub price: f64,
    #[serde(rename = "change24h")]
    pub change_24h: f64,
    pub thumb: String,
}

/// Body of the `/news` route
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSentiment {
    pub fear_greed: Option<FearGreed>,
    pub trending: Vec<TrendingCoin>,
}

#[derive(Debug, Deserialize)]
struct FngResponse {
    #[serde(default)]
    data: Vec<RawFng>,
}

#[derive(Debug, Deserialize)]
struct RawFng {
    #[serde(deserialize_with = "de_i64")]
    value: i64,
    value_classification: String,
    #[serde(deserialize_with = "de_i64")]
    timestamp: i64,
}

#[derive(Debug, Deserialize)]
struct TrendingResponse {
    #[serde(default)]
    coins: Vec<TrendingEntry>,
}

#[derive(Debug, Deserialize)]
struct TrendingEntry {
    #[serde(default)]
    item: RawTrending,
}

#[derive(Debug, Default, Deserialize)]
struct RawTrending {
    #[serde(default)]
    name: String,
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    market_cap_rank: Option<u32>,
    #[serde(default)]
    thumb: String,
    #[serde(default)]
    data: RawTrendingData,
}

#[derive(Debug, Default, Deserialize)]
struct RawTrendingData {
    #[serde(default, deserialize_with = "de_price")]
    price: f64,
    #[serde(default)]
    price_change_percentage_24h: Value,
}

/// CoinGecko has sent the price both as a number and as a string
fn de_price<'de, D: serde::Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    de_f64(d).or(Ok(0.0))
}

impl FngResponse {
    fn into_fear_greed(self) -> Option<FearGreed> {
        let history: Vec<FearGreedPoint> = self
            .data
            .into_iter()
            .map(|d| FearGreedPoint {
                value: d.value,
                label: d.value_classification,
                timestamp: d.timestamp,
            })
            .collect();
        let current = history.first()?;

        Some(FearGreed {
            value: current.value,
            label: current.label.clone(),
            history,
        })
    }
}

impl TrendingResponse {
    fn into_coins(self, limit: usize) -> Vec<TrendingCoin> {
        self.coins
            .into_iter()
            .take(limit)
            .map(|entry| {
                let item = entry.item;
                let change = item
                    .data
                    .price_change_percentage_24h
                    .get("usd")
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0);
                TrendingCoin {
                    name: item.name,
                    symbol: item.symbol,
                    rank: item.market_cap_rank,
                    price: item.data.price,
                    change_24h: (change * 100.0).round() / 100.0,
                    thumb: item.thumb,
                }
            })
            .collect()
    }
}

/// Where the market mood comes from
#[async_trait]
pub trait SentimentSource: Send + Sync {
    /// Current index with its recent history; `None` when the feed is empty
    async fn fear_greed(&self) -> anyhow::Result<Option<FearGreed>>;

    /// Most searched coins right now
    async fn trending(&self) -> anyhow::Result<Vec<TrendingCoin>>;
}

/// alternative.me and CoinGecko fetcher; neither needs a key
#[derive(Debug, Clone)]
pub struct SentimentClient {
    fear_greed_url: String,
    trending_url: String,
    client: Client,
}

impl SentimentClient {
    pub fn new(
        fear_greed_url: impl Into<String>,
        trending_url: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            fear_greed_url: fear_greed_url.into(),
            trending_url: trending_url.into(),
            client,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> anyhow::Result<T> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("API error: {} from {}", response.status(), url);
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl SentimentSource for SentimentClient {
    async fn fear_greed(&self) -> anyhow::Result<Option<FearGreed>> {
        let body: FngResponse = self.get_json(&self.fear_greed_url).await?;
        Ok(body.into_fear_greed())
    }

    async fn trending(&self) -> anyhow::Result<Vec<TrendingCoin>> {
        let body: TrendingResponse = self.get_json(&self.trending_url).await?;
        Ok(body.into_coins(TRENDING_LIMIT))
    }
}

/// Read-through cache in front of a [`SentimentSource`]
///
/// A request inside the TTL gets the stored value. Otherwise both sources
/// are asked again; one that fails leaves its half empty for this round.
#[derive(Clone)]
pub struct SentimentCache {
    source: Option<Arc<dyn SentimentSource>>,
    ttl: Duration,
    cached: Arc<Mutex<Option<(Instant, MarketSentiment)>>>,
}

impl SentimentCache {
    pub fn new(source: Arc<dyn SentimentSource>, ttl: Duration) -> Self {
        Self {
            source: Some(source),
            ttl,
            cached: Arc::new(Mutex::new(None)),
        }
    }

    /// Always answers with an empty reading
    pub fn disabled() -> Self {
        Self {
            source: None,
            ttl: Duration::ZERO,
            cached: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn get(&self) -> MarketSentiment {
        let Some(source) = &self.source else {
            return MarketSentiment::default();
        };

        // Held across the refresh so concurrent requests share one fetch
        let mut cached = self.cached.lock().await;
        if let Some((at, sentiment)) = cached.as_ref() {
            if at.elapsed() < self.ttl {
                return sentiment.clone();
            }
        }

        let (fear_greed, trending) = tokio::join!(source.fear_greed(), source.trending());
        let sentiment = MarketSentiment {
            fear_greed: fear_greed.unwrap_or_else(|e| {
                tracing::error!(error = %e, "Fear & Greed fetch failed");
                None
            }),
            trending: trending.unwrap_or_else(|e| {
                tracing::error!(error = %e, "Trending coins fetch failed");
                Vec::new()
            }),
        };

        *cached = Some((Instant::now(), sentiment.clone()));
        sentiment
    }
}
