//! News headlines, market mood and social sentiment
//!
//! Thin fetchers plus the global headline and market-mood caches shared by
//! every session.

mod client;
mod sentiment;
mod social;

pub use client::{NewsClient, CRYPTOCOMPARE_NEWS_URL};
pub use sentiment::{
    FearGreed, FearGreedPoint, MarketSentiment, SentimentCache, SentimentClient, SentimentSource,
    TrendingCoin, COINGECKO_TRENDING_URL, FEAR_GREED_URL,
};
pub use social::{SocialClient, SocialEvent, SocialMetrics, LUNARCRUSH_API_URL, LUNARCRUSH_SSE_URL};

use crate::state::NewsItem;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Base asset of a quote-suffixed symbol (`BTCUSDT` -> `BTC`)
pub fn base_asset<'a>(symbol: &'a str, quote_asset: &str) -> &'a str {
    symbol.strip_suffix(quote_asset).unwrap_or(symbol)
}

/// Latest global headlines
#[derive(Clone, Default)]
pub struct NewsCache {
    items: Arc<RwLock<Vec<NewsItem>>>,
}

impl NewsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Vec<NewsItem> {
        self.items.read().map(|n| n.clone()).unwrap_or_default()
    }

    pub fn set(&self, items: Vec<NewsItem>) {
        if let Ok(mut current) = self.items.write() {
            *current = items;
        }
    }

    /// Refresh from `client` every `interval` until cancelled
    ///
    /// A failed fetch keeps the previous headlines.
    pub fn spawn_poller(
        &self,
        client: NewsClient,
        interval: Duration,
        limit: usize,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            loop {
                match client.fetch(None, limit).await {
                    Ok(items) => {
                        tracing::info!(count = items.len(), "Updated global news");
                        cache.set(items);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Global news fetch failed");
                    }
                }

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        })
    }
}
