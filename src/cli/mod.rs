//! CLI interface for flow-terminal
//!
//! Provides subcommands for:
//! - `serve`: Run the terminal backend (sessions, scanner, news)
//! - `scan`: Run the universe scanner alone
//! - `signals`: Print recently persisted scanner signals
//! - `symbols`: Print the tradable instrument listing
//! - `config`: Show the effective configuration

mod scan;
mod serve;
mod signals;
mod symbols;

pub use scan::ScanArgs;
pub use serve::ServeArgs;
pub use signals::SignalsArgs;
pub use symbols::SymbolsArgs;

use crate::config::{Config, StoreConfig};
use crate::feed::{BinanceRest, BinanceStreams, RestConfig};
use crate::ingest::Sources;
use crate::news::{NewsClient, SocialClient};
use crate::store::{MemorySignalStore, SignalStore, SqliteSignalStore};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "flow-terminal")]
#[command(about = "Order-flow terminal backend and breakout scanner for Binance USD-M futures")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the terminal backend
    Serve(ServeArgs),
    /// Run the universe scanner only
    Scan(ScanArgs),
    /// Show recent scanner signals
    Signals(SignalsArgs),
    /// List tradable instruments
    Symbols(SymbolsArgs),
    /// Show the effective configuration
    Config,
}

/// REST client for the configured endpoints
pub fn build_market(config: &Config) -> anyhow::Result<Arc<BinanceRest>> {
    let rest = BinanceRest::with_config(RestConfig {
        futures_url: config.feed.futures_rest_url.clone(),
        spot_url: config.feed.spot_rest_url.clone(),
        timeout: config.feed.request_timeout(),
    })?;
    Ok(Arc::new(rest))
}

/// Stream client for the configured endpoint
pub fn build_streams(config: &Config) -> Arc<BinanceStreams> {
    Arc::new(BinanceStreams::new(
        config.feed.futures_ws_url.clone(),
        config.feed.reconnect_delay(),
    ))
}

/// SQLite store when a path is configured, otherwise in-memory
pub fn open_store(config: &StoreConfig) -> anyhow::Result<Arc<dyn SignalStore>> {
    match &config.path {
        Some(path) => {
            let store = SqliteSignalStore::open(path)?;
            tracing::info!(path = %path.display(), "Opened SQLite signal store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::info!("Using in-memory signal store");
            Ok(Arc::new(MemorySignalStore::new()))
        }
    }
}

/// Everything a session's ingestors read from
pub fn build_sources(config: &Config, market: Arc<BinanceRest>) -> anyhow::Result<Sources> {
    let news_cfg = &config.news;
    let timeout = config.feed.request_timeout();

    let news = if news_cfg.enabled {
        Some(NewsClient::new(news_cfg.news_url.clone(), timeout)?)
    } else {
        None
    };

    let social = match (&news_cfg.lunarcrush_api_key, news_cfg.enabled) {
        (Some(key), true) if !key.is_empty() => Some(SocialClient::new(
            news_cfg.lunarcrush_url.clone(),
            news_cfg.lunarcrush_sse_url.clone(),
            key.clone(),
            timeout,
        )?),
        _ => None,
    };

    Ok(Sources {
        feed: build_streams(config),
        market,
        news,
        social,
        feed_config: config.feed.clone(),
        news_config: news_cfg.clone(),
    })
}

/// Token cancelled on Ctrl-C
pub fn shutdown_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
        }
        token.cancel();
    });
    cancel
}
