//! CryptoCompare news headlines

use crate::state::NewsItem;
use anyhow::Context;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// CryptoCompare news endpoint
pub const CRYPTOCOMPARE_NEWS_URL: &str = "https://min-api.cryptocompare.com/data/v2/news/";

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(rename = "Data", default)]
    data: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
struct RawArticle {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    source: String,
}

/// Headline fetcher
#[derive(Debug, Clone)]
pub struct NewsClient {
    url: String,
    client: Client,
}

impl NewsClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Latest English headlines, optionally restricted to one category
    pub async fn fetch(&self, category: Option<&str>, limit: usize) -> anyhow::Result<Vec<NewsItem>> {
        let mut query = vec![("lang", "EN".to_string())];
        if let Some(category) = category {
            query.push(("categories", category.to_string()));
        }

        let response = self.client.get(&self.url).query(&query).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("News API error: {}", status);
        }

        let body: NewsResponse = response.json().await?;
        Ok(Self::into_items(body, limit))
    }

    fn into_items(body: NewsResponse, limit: usize) -> Vec<NewsItem> {
        body.data
            .into_iter()
            .take(limit)
            .map(|a| NewsItem {
                title: a.title,
                url: a.url,
                source: a.source,
            })
            .collect()
    }
}
