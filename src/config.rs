//! Configuration types for flow-terminal

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Embedded fallback configuration
pub const DEFAULT_CONFIG: &str = include_str!("../config.toml.example");

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Market data endpoints and poll cadences
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedConfig {
    #[serde(default = "default_futures_rest_url")]
    pub futures_rest_url: String,
    #[serde(default = "default_spot_rest_url")]
    pub spot_rest_url: String,
    #[serde(default = "default_futures_ws_url")]
    pub futures_ws_url: String,
    /// Instrument a new session starts on
    #[serde(default = "default_symbol")]
    pub default_symbol: String,
    /// Quote currency suffix for the universe filter and the symbol listing
    #[serde(default = "default_quote_asset")]
    pub quote_asset: String,
    #[serde(default = "default_five")]
    pub reconnect_delay_secs: u64,
    /// Open interest and ratio refresh
    #[serde(default = "default_derivatives_poll_secs")]
    pub derivatives_poll_secs: u64,
    #[serde(default = "default_derivatives_retry_secs")]
    pub derivatives_retry_secs: u64,
    #[serde(default = "default_five")]
    pub spot_poll_secs: u64,
    /// One-minute closes used to seed the price history
    #[serde(default = "default_history_candles")]
    pub history_candles: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_futures_rest_url() -> String {
    crate::feed::BINANCE_FUTURES_REST_URL.to_string()
}
fn default_spot_rest_url() -> String {
    crate::feed::BINANCE_SPOT_REST_URL.to_string()
}
fn default_futures_ws_url() -> String {
    crate::feed::BINANCE_FUTURES_WS_URL.to_string()
}
fn default_symbol() -> String {
    "BTCUSDT".to_string()
}
fn default_quote_asset() -> String {
    "USDT".to_string()
}
fn default_five() -> u64 {
    5
}
fn default_derivatives_poll_secs() -> u64 {
    300
}
fn default_derivatives_retry_secs() -> u64 {
    60
}
fn default_history_candles() -> u32 {
    60
}
fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            futures_rest_url: default_futures_rest_url(),
            spot_rest_url: default_spot_rest_url(),
            futures_ws_url: default_futures_ws_url(),
            default_symbol: default_symbol(),
            quote_asset: default_quote_asset(),
            reconnect_delay_secs: 5,
            derivatives_poll_secs: 300,
            derivatives_retry_secs: 60,
            spot_poll_secs: 5,
            history_candles: 60,
            request_timeout_secs: 10,
        }
    }
}

impl FeedConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Volume confirmation used by the scanner rule
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VolumeRule {
    /// Last three volumes strictly decreasing
    Decreasing,
    /// Last volume above the trailing average times the spike multiplier
    #[default]
    SpikeVsAverage,
}

/// Universe scanner configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScannerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Minimum absolute 24h change (%) before a symbol is analysed
    #[serde(default = "default_move_threshold_pct")]
    pub move_threshold_pct: f64,
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    #[serde(default = "default_candle_limit")]
    pub candle_limit: u32,
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
    #[serde(default = "default_rsi_overbought")]
    pub rsi_overbought: f64,
    #[serde(default = "default_rsi_oversold")]
    pub rsi_oversold: f64,
    /// Candles spanned by the momentum measure
    #[serde(default = "default_five_usize")]
    pub momentum_window: usize,
    #[serde(default = "default_momentum_threshold_pct")]
    pub momentum_threshold_pct: f64,
    #[serde(default)]
    pub volume_rule: VolumeRule,
    /// Require the volume rule on reversal (short/long) signals too
    #[serde(default)]
    pub confirm_reversal_volume: bool,
    #[serde(default = "default_volume_spike_multiplier")]
    pub volume_spike_multiplier: f64,
    #[serde(default = "default_volume_average_window")]
    pub volume_average_window: usize,
    #[serde(default = "default_true")]
    pub enable_breakout: bool,
    #[serde(default = "default_breakout_threshold_pct")]
    pub breakout_threshold_pct: f64,
    #[serde(default = "default_five")]
    pub reconnect_delay_secs: u64,
    /// Seconds a "signal detected" status stays up
    #[serde(default = "default_five")]
    pub status_revert_secs: u64,
    /// In-memory signal feed size
    #[serde(default = "default_mirror_capacity")]
    pub mirror_capacity: usize,
}

fn default_true() -> bool {
    true
}
fn default_move_threshold_pct() -> f64 {
    1.0
}
fn default_cooldown_secs() -> u64 {
    120
}
fn default_candle_limit() -> u32 {
    50
}
fn default_rsi_period() -> usize {
    14
}
fn default_rsi_overbought() -> f64 {
    70.0
}
fn default_rsi_oversold() -> f64 {
    30.0
}
fn default_five_usize() -> usize {
    5
}
fn default_momentum_threshold_pct() -> f64 {
    1.5
}
fn default_volume_spike_multiplier() -> f64 {
    1.5
}
fn default_volume_average_window() -> usize {
    10
}
fn default_breakout_threshold_pct() -> f64 {
    2.0
}
fn default_mirror_capacity() -> usize {
    30
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            move_threshold_pct: 1.0,
            cooldown_secs: 120,
            candle_limit: 50,
            rsi_period: 14,
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            momentum_window: 5,
            momentum_threshold_pct: 1.5,
            volume_rule: VolumeRule::SpikeVsAverage,
            confirm_reversal_volume: false,
            volume_spike_multiplier: 1.5,
            volume_average_window: 10,
            enable_breakout: true,
            breakout_threshold_pct: 2.0,
            reconnect_delay_secs: 5,
            status_revert_secs: 5,
            mirror_capacity: 30,
        }
    }
}

impl ScannerConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn status_revert(&self) -> Duration {
        Duration::from_secs(self.status_revert_secs)
    }
}

/// Top-trader ratio enrichment gate
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnrichmentConfig {
    /// Concurrent holders of the gate
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Seconds a holder keeps its slot after the response
    #[serde(default = "default_hold_secs")]
    pub hold_secs: u64,
    /// Ratio reported when the call fails
    #[serde(default = "default_ratio")]
    pub default_ratio: f64,
    #[serde(default = "default_period")]
    pub period: String,
    /// Seconds a signal waits for a free slot before taking the default ratio
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
}

fn default_concurrency() -> usize {
    2
}
fn default_hold_secs() -> u64 {
    30
}
fn default_ratio() -> f64 {
    1.0
}
fn default_period() -> String {
    "15m".to_string()
}
fn default_max_wait_secs() -> u64 {
    5
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            hold_secs: 30,
            default_ratio: 1.0,
            period: default_period(),
            max_wait_secs: 5,
        }
    }
}

impl EnrichmentConfig {
    pub fn hold(&self) -> Duration {
        Duration::from_secs(self.hold_secs)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}

/// Signal persistence
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// SQLite file; in-memory store when absent
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Rows returned by the signals listing
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

fn default_recent_limit() -> usize {
    20
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            recent_limit: 20,
        }
    }
}

/// HTTP / WebSocket server
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Snapshot push cadence per connection
    #[serde(default = "default_broadcast_interval_ms")]
    pub broadcast_interval_ms: u64,
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}
fn default_broadcast_interval_ms() -> u64 {
    250
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            broadcast_interval_ms: 250,
        }
    }
}

impl ServerConfig {
    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_millis(self.broadcast_interval_ms)
    }
}

/// News and social sentiment
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_news_url")]
    pub news_url: String,
    #[serde(default = "default_lunarcrush_url")]
    pub lunarcrush_url: String,
    #[serde(default = "default_lunarcrush_sse_url")]
    pub lunarcrush_sse_url: String,
    #[serde(default = "default_global_poll_secs")]
    pub global_poll_secs: u64,
    #[serde(default = "default_asset_poll_secs")]
    pub asset_poll_secs: u64,
    #[serde(default = "default_global_limit")]
    pub global_limit: usize,
    #[serde(default = "default_asset_limit")]
    pub asset_limit: usize,
    /// Social metrics are skipped without a key
    #[serde(default)]
    pub lunarcrush_api_key: Option<String>,
    #[serde(default = "default_asset_poll_secs")]
    pub social_poll_secs: u64,
    #[serde(default = "default_fear_greed_url")]
    pub fear_greed_url: String,
    #[serde(default = "default_trending_url")]
    pub trending_url: String,
    /// Seconds the Fear & Greed and trending reading is reused
    #[serde(default = "default_sentiment_ttl_secs")]
    pub sentiment_ttl_secs: u64,
}

fn default_news_url() -> String {
    crate::news::CRYPTOCOMPARE_NEWS_URL.to_string()
}
fn default_fear_greed_url() -> String {
    crate::news::FEAR_GREED_URL.to_string()
}
fn default_trending_url() -> String {
    crate::news::COINGECKO_TRENDING_URL.to_string()
}
fn default_sentiment_ttl_secs() -> u64 {
    300
}
fn default_lunarcrush_url() -> String {
    crate::news::LUNARCRUSH_API_URL.to_string()
}
fn default_lunarcrush_sse_url() -> String {
    crate::news::LUNARCRUSH_SSE_URL.to_string()
}
fn default_global_poll_secs() -> u64 {
    900
}
fn default_asset_poll_secs() -> u64 {
    600
}
fn default_global_limit() -> usize {
    15
}
fn default_asset_limit() -> usize {
    10
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            news_url: default_news_url(),
            lunarcrush_url: default_lunarcrush_url(),
            lunarcrush_sse_url: default_lunarcrush_sse_url(),
            global_poll_secs: 900,
            asset_poll_secs: 600,
            global_limit: 15,
            asset_limit: 10,
            lunarcrush_api_key: None,
            social_poll_secs: 600,
            fear_greed_url: default_fear_greed_url(),
            trending_url: default_trending_url(),
            sentiment_ttl_secs: 300,
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: crate::telemetry::LogFormat,
    /// Prometheus listener port; no exporter when absent
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: crate::telemetry::LogFormat::Pretty,
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// The embedded example configuration
    pub fn embedded() -> anyhow::Result<Self> {
        Self::parse(DEFAULT_CONFIG)
    }
}
