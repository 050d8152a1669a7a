//! Serve command implementation

use super::{build_market, build_sources, open_store, shutdown_on_ctrl_c};
use crate::config::Config;
use crate::news::{NewsCache, NewsClient, SentimentCache, SentimentClient};
use crate::scanner::{Scanner, SignalFeed, StatusBoard};
use crate::server;
use crate::session::AppContext;
use clap::Args;
use std::sync::Arc;
use std::time::Duration;

const SCANNER_DISABLED_STATUS: &str = "Scanner disabled";

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Override the listen address
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Do not run the universe scanner
    #[arg(long)]
    pub no_scanner: bool,
}

impl ServeArgs {
    pub async fn execute(&self, mut config: Config) -> anyhow::Result<()> {
        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
        }
        let cancel = shutdown_on_ctrl_c();

        let market = build_market(&config)?;
        let store = open_store(&config.store)?;
        let sources = build_sources(&config, Arc::clone(&market))?;

        let mut background = Vec::new();

        let (signals, status) = if config.scanner.enabled && !self.no_scanner {
            let scanner = Scanner::new(
                config.scanner.clone(),
                &config.enrichment,
                config.feed.quote_asset.clone(),
                super::build_streams(&config),
                market,
                Arc::clone(&store),
            );
            scanner.prime().await;
            let (signals, status) = (scanner.feed(), scanner.status());
            let token = cancel.clone();
            background.push(tokio::spawn(async move { scanner.run(token).await }));
            (signals, status)
        } else {
            tracing::info!("Scanner disabled");
            let status = StatusBoard::new();
            status.set(SCANNER_DISABLED_STATUS);
            (SignalFeed::new(config.scanner.mirror_capacity), status)
        };

        let global_news = NewsCache::new();
        if config.news.enabled {
            let client = NewsClient::new(config.news.news_url.clone(), config.feed.request_timeout())?;
            background.push(global_news.spawn_poller(
                client,
                Duration::from_secs(config.news.global_poll_secs),
                config.news.global_limit,
                cancel.clone(),
            ));
        }

        let sentiment = if config.news.enabled {
            let client = SentimentClient::new(
                config.news.fear_greed_url.clone(),
                config.news.trending_url.clone(),
                config.feed.request_timeout(),
            )?;
            SentimentCache::new(
                Arc::new(client),
                Duration::from_secs(config.news.sentiment_ttl_secs),
            )
        } else {
            SentimentCache::disabled()
        };

        let ctx = Arc::new(AppContext::new(
            config,
            sources,
            store,
            signals,
            status,
            global_news,
            sentiment,
            cancel.clone(),
        ));

        let result = server::serve(ctx, cancel.clone()).await;

        cancel.cancel();
        for handle in background {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Background task failed");
            }
        }

        result
    }
}
