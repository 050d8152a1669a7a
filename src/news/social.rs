//! LunarCrush social metrics and message stream

use crate::state::SharedState;
use anyhow::Context;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// LunarCrush public API base
pub const LUNARCRUSH_API_URL: &str = "https://lunarcrush.com/api4/public";
/// LunarCrush server-sent events endpoint
pub const LUNARCRUSH_SSE_URL: &str = "https://lunarcrush.ai/sse";

/// Coin-level social metrics
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SocialMetrics {
    #[serde(default)]
    pub galaxy_score: f64,
    #[serde(default)]
    pub alt_rank: i64,
    #[serde(default = "neutral_sentiment")]
    pub sentiment: f64,
}

fn neutral_sentiment() -> f64 {
    50.0
}

#[derive(Debug, Deserialize)]
struct CoinResponse {
    data: Option<SocialMetrics>,
}

/// One relevant message from the social stream
#[derive(Debug, Clone, PartialEq)]
pub struct SocialEvent {
    pub text: String,
    pub sentiment: String,
}

/// LunarCrush client; requires an API key
#[derive(Debug, Clone)]
pub struct SocialClient {
    base_url: String,
    sse_url: String,
    api_key: String,
    client: Client,
    stream_client: Client,
}

impl SocialClient {
    pub fn new(
        base_url: impl Into<String>,
        sse_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        // The event stream stays open indefinitely
        let stream_client = Client::builder()
            .connect_timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.into(),
            sse_url: sse_url.into(),
            api_key: api_key.into(),
            client,
            stream_client,
        })
    }

    /// Galaxy score, alt rank and sentiment for `coin`
    pub async fn metrics(&self, coin: &str) -> anyhow::Result<Option<SocialMetrics>> {
        let url = format!("{}/coins/{}/v1", self.base_url, coin);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("LunarCrush REST error: {}", response.status());
        }

        let body: CoinResponse = response.json().await?;
        Ok(body.data)
    }

    /// Parse one event-stream line into a message mentioning `coin` or the market
    pub fn parse_event_line(line: &str, coin: &str) -> Option<SocialEvent> {
        let payload = line.trim().strip_prefix("data:")?.trim();
        let value: Value = serde_json::from_str(payload).ok()?;
        let obj = value.as_object()?;

        let text = obj
            .get("message")
            .or_else(|| obj.get("text"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())?;

        let lower = text.to_lowercase();
        if !lower.contains(&coin.to_lowercase()) && !lower.contains("market") {
            return None;
        }

        let sentiment = obj
            .get("sentiment")
            .and_then(Value::as_str)
            .unwrap_or("neutral");

        Some(SocialEvent {
            text: text.to_string(),
            sentiment: sentiment.to_string(),
        })
    }

    /// Push relevant stream messages into the state's social pulse until
    /// cancelled or the stream ends
    pub async fn stream_into(
        &self,
        coin: &str,
        state: &SharedState,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let mut response = self
            .stream_client
            .get(&self.sse_url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("LunarCrush SSE error: {}", response.status());
        }

        let mut lines = LineBuffer::default();
        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                chunk = response.chunk() => chunk?,
            };
            let Some(chunk) = chunk else {
                anyhow::bail!("LunarCrush SSE stream ended");
            };

            for line in lines.push(&chunk) {
                if let Some(event) = Self::parse_event_line(&line, coin) {
                    let now = chrono::Utc::now().timestamp_millis();
                    state
                        .write()
                        .await
                        .push_social_message(event.text, event.sentiment, now);
                }
            }
        }
    }
}

/// Splits a byte stream into lines, decoding each line only once it is complete
///
/// Network chunks can end inside a multi-byte character.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_coin_metrics() {
        let body: CoinResponse = serde_json::from_str(
            r#"{"config":{"coin":"BTC"},"data":{"id":1,"symbol":"BTC","galaxy_score":71.5,"alt_rank":3,"sentiment":82}}"#,
        )
        .unwrap();
        let m = body.data.unwrap();
        assert_eq!(m.galaxy_score, 71.5);
        assert_eq!(m.alt_rank, 3);
        assert_eq!(m.sentiment, 82.0);
    }

    #[test]
    fn test_missing_sentiment_is_neutral() {
        let body: CoinResponse = serde_json::from_str(r#"{"data":{"galaxy_score":10}}"#).unwrap();
        assert_eq!(body.data.unwrap().sentiment, 50.0);
    }

    #[test]
    fn test_parse_event_line() {
        let line = r#"data: {"message":"BTC whales accumulating","sentiment":"bullish"}"#;
        let event = SocialClient::parse_event_line(line, "BTC").unwrap();
        assert_eq!(event.text, "BTC whales accumulating");
        assert_eq!(event.sentiment, "bullish");

        let market = r#"data: {"text":"Market wide deleveraging"}"#;
        assert_eq!(
            SocialClient::parse_event_line(market, "ETH").unwrap().sentiment,
            "neutral"
        );
    }

    #[test]
    fn test_parse_event_line_filters() {
        assert!(SocialClient::parse_event_line(r#"data: {"message":"DOGE pumps"}"#, "BTC").is_none());
        assert!(SocialClient::parse_event_line("event: ping", "BTC").is_none());
        assert!(SocialClient::parse_event_line("data: not-json", "BTC").is_none());
        assert!(SocialClient::parse_event_line(r#"data: ["BTC"]"#, "BTC").is_none());
    }

    #[test]
    fn test_line_buffer_keeps_split_characters() {
        let line = "data: {\"message\":\"BTC to the moon \u{1F680}\"}\n".as_bytes();
        // Cut inside the four-byte rocket emoji
        let cut = line.len() - 5;
        assert!(std::str::from_utf8(&line[..cut]).is_err());

        let mut lines = LineBuffer::default();
        assert!(lines.push(&line[..cut]).is_empty());
        let decoded = lines.push(&line[cut..]);

        assert_eq!(decoded.len(), 1);
        let event = SocialClient::parse_event_line(&decoded[0], "BTC").unwrap();
        assert_eq!(event.text, "BTC to the moon \u{1F680}");
    }

    #[test]
    fn test_line_buffer_holds_partial_line() {
        let mut lines = LineBuffer::default();
        assert_eq!(lines.push(b"event: a\ndata: "), vec!["event: a\n".to_string()]);
        assert_eq!(lines.push(b"{}\n"), vec!["data: {}\n".to_string()]);
    }
}
