//! Per-session ingestor tasks
//!
//! One task per real-time stream and one per poll, all writing into a
//! single [`SharedState`]. Every task shares a cancellation token, so a
//! switch can stop the old set completely before the state is reset.

use crate::config::{FeedConfig, NewsConfig};
use crate::feed::{InstrumentFeed, MarketData, StreamEvent};
use crate::news::{base_asset, NewsClient, SocialClient};
use crate::state::{LiquidationEvent, RatioKind, SharedState};
use crate::telemetry::{self, CounterMetric};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Ratio endpoint period used by the derivatives poller
pub const RATIO_PERIOD: &str = "5m";

/// Decoded events buffered between the stream and the state writer
const STREAM_BUFFER: usize = 1024;

/// Everything an ingestor set reads from
#[derive(Clone)]
pub struct Sources {
    pub feed: Arc<dyn InstrumentFeed>,
    pub market: Arc<dyn MarketData>,
    pub news: Option<NewsClient>,
    pub social: Option<SocialClient>,
    pub feed_config: FeedConfig,
    pub news_config: NewsConfig,
}

/// Running ingestors for one symbol
pub struct IngestorSet {
    symbol: String,
    cancel: CancellationToken,
    tasks: JoinSet<()>,
}

impl IngestorSet {
    /// Spawn every ingestor for `symbol` under a child of `parent`
    pub fn start(
        sources: &Sources,
        state: SharedState,
        symbol: impl Into<String>,
        parent: &CancellationToken,
    ) -> Self {
        let symbol = symbol.into().to_uppercase();
        let cancel = parent.child_token();
        let mut tasks = JoinSet::new();

        tracing::info!(symbol = %symbol, "Starting ingestors");

        tasks.spawn(run_stream(
            Arc::clone(&sources.feed),
            Arc::clone(&sources.market),
            state.clone(),
            symbol.clone(),
            sources.feed_config.history_candles,
            cancel.clone(),
        ));

        let cfg = &sources.feed_config;
        tasks.spawn(poll_loop(
            "derivatives",
            Duration::from_secs(cfg.derivatives_poll_secs),
            Duration::from_secs(cfg.derivatives_retry_secs),
            cancel.clone(),
            {
                let market = Arc::clone(&sources.market);
                let state = state.clone();
                let symbol = symbol.clone();
                move || poll_derivatives(Arc::clone(&market), state.clone(), symbol.clone())
            },
        ));

        let spot_every = Duration::from_secs(cfg.spot_poll_secs);
        tasks.spawn(poll_loop("spot", spot_every, spot_every, cancel.clone(), {
            let market = Arc::clone(&sources.market);
            let state = state.clone();
            let symbol = symbol.clone();
            move || poll_spot(Arc::clone(&market), state.clone(), symbol.clone())
        }));

        let coin = base_asset(&symbol, &cfg.quote_asset).to_string();
        let news_cfg = &sources.news_config;

        if let Some(news) = sources.news.clone() {
            let every = Duration::from_secs(news_cfg.asset_poll_secs);
            let limit = news_cfg.asset_limit;
            let state = state.clone();
            let coin = coin.clone();
            tasks.spawn(poll_loop("asset_news", every, every, cancel.clone(), move || {
                poll_asset_news(news.clone(), state.clone(), coin.clone(), limit)
            }));
        }

        if let Some(social) = sources.social.clone() {
            let every = Duration::from_secs(news_cfg.social_poll_secs);
            {
                let social = social.clone();
                let state = state.clone();
                let coin = coin.clone();
                tasks.spawn(poll_loop("social", every, every, cancel.clone(), move || {
                    poll_social(social.clone(), state.clone(), coin.clone())
                }));
            }
            tasks.spawn(run_social_stream(
                social,
                state,
                coin,
                cfg.reconnect_delay(),
                cancel.clone(),
            ));
        }

        Self {
            symbol,
            cancel,
            tasks,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Cancel every task and wait until all of them have returned
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                if !e.is_cancelled() {
                    tracing::warn!(symbol = %self.symbol, error = %e, "Ingestor task failed");
                }
            }
        }
        tracing::info!(symbol = %self.symbol, "Ingestors stopped");
    }

    /// Stop the current set, hard-reset the state onto `symbol` and restart
    pub async fn switch(
        &mut self,
        sources: &Sources,
        state: &SharedState,
        symbol: &str,
        parent: &CancellationToken,
    ) {
        self.stop().await;
        state.write().await.switch_to(symbol.to_uppercase());
        *self = Self::start(sources, state.clone(), symbol, parent);
    }
}

/// Apply one decoded stream event to the state
pub async fn apply_event(state: &SharedState, event: StreamEvent) {
    telemetry::increment(CounterMetric::StreamEvents, event.kind());

    let mut s = state.write().await;
    match event {
        StreamEvent::Trade(t) => {
            s.apply_trade(t.price, t.quantity, t.taker_is_buyer, t.event_time);
            s.append_cvd_sample(t.event_time);
        }
        StreamEvent::MarkPrice(m) => {
            s.apply_mark_price(m.mark_price, m.index_price, m.funding_rate);
            s.append_price_sample(m.event_time, m.mark_price);
        }
        StreamEvent::Liquidation(l) => {
            s.apply_liquidation(LiquidationEvent {
                side: l.side,
                price: l.price,
                quantity: l.quantity,
                timestamp_ms: l.event_time,
            });
        }
    }
}

/// Seed the price history from recent one-minute closes
pub async fn seed_history(
    market: &dyn MarketData,
    state: &SharedState,
    symbol: &str,
    candles: u32,
) -> anyhow::Result<usize> {
    let candles = market.klines(symbol, "1m", candles).await?;
    let mut s = state.write().await;
    for c in &candles {
        s.append_price_sample(c.open_time, c.close);
    }
    Ok(candles.len())
}

async fn run_stream(
    feed: Arc<dyn InstrumentFeed>,
    market: Arc<dyn MarketData>,
    state: SharedState,
    symbol: String,
    history_candles: u32,
    cancel: CancellationToken,
) {
    // Seed first so live samples always land after the historical ones
    tokio::select! {
        _ = cancel.cancelled() => return,
        seeded = seed_history(market.as_ref(), &state, &symbol, history_candles) => match seeded {
            Ok(n) => tracing::info!(symbol = %symbol, candles = n, "Seeded price history"),
            Err(e) => tracing::error!(symbol = %symbol, error = %e, "Error fetching price history"),
        },
    }

    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    // Dropping the receiver on exit unblocks a stream stuck on a full buffer
    let consume = async {
        let mut rx = rx;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = rx.recv() => match event {
                    Some(event) => apply_event(&state, event).await,
                    None => break,
                },
            }
        }
    };

    // Both halves run on this task, so stopping the set also closes the socket
    let (streamed, ()) = tokio::join!(feed.stream_instrument(&symbol, tx, cancel.clone()), consume);
    if let Err(e) = streamed {
        tracing::error!(symbol = %symbol, error = %e, "Instrument stream failed");
    }
}

/// Run `poll` now and then every `every`, or after `retry` when it fails
async fn poll_loop<F, Fut>(
    name: &'static str,
    every: Duration,
    retry: Duration,
    cancel: CancellationToken,
    mut poll: F,
) where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    loop {
        let outcome = tokio::select! {
            _ = cancel.cancelled() => break,
            outcome = poll() => outcome,
        };

        let delay = match outcome {
            Ok(()) => every,
            Err(e) => {
                telemetry::increment(CounterMetric::PollFailures, name);
                tracing::error!(poller = name, error = %e, "Polling error");
                retry
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

async fn poll_derivatives(
    market: Arc<dyn MarketData>,
    state: SharedState,
    symbol: String,
) -> anyhow::Result<()> {
    let oi = market.open_interest(&symbol).await?;
    state.write().await.apply_open_interest(oi.value, oi.time);

    for kind in RatioKind::ALL {
        if let Some(r) = market.positioning_ratio(&symbol, kind, RATIO_PERIOD).await? {
            state
                .write()
                .await
                .apply_positioning_ratio(kind, r.long_ratio, r.short_ratio, r.timestamp);
        }
    }

    tracing::debug!(symbol = %symbol, open_interest = oi.value, "Derivatives data refreshed");
    Ok(())
}

async fn poll_spot(
    market: Arc<dyn MarketData>,
    state: SharedState,
    symbol: String,
) -> anyhow::Result<()> {
    let price = market.spot_price(&symbol).await?;
    state.write().await.apply_spot_price(price);
    Ok(())
}

async fn poll_asset_news(
    news: NewsClient,
    state: SharedState,
    coin: String,
    limit: usize,
) -> anyhow::Result<()> {
    let items = news.fetch(Some(&coin), limit).await?;
    tracing::info!(coin = %coin, count = items.len(), "Updated asset news");
    state.write().await.set_asset_news(items);
    Ok(())
}

async fn poll_social(social: SocialClient, state: SharedState, coin: String) -> anyhow::Result<()> {
    if let Some(m) = social.metrics(&coin).await? {
        tracing::info!(coin = %coin, galaxy_score = m.galaxy_score, "Updated social metrics");
        state
            .write()
            .await
            .apply_social_metrics(m.galaxy_score, m.alt_rank, m.sentiment);
    }
    Ok(())
}

async fn run_social_stream(
    social: SocialClient,
    state: SharedState,
    coin: String,
    retry: Duration,
    cancel: CancellationToken,
) {
    loop {
        if let Err(e) = social.stream_into(&coin, &state, &cancel).await {
            tracing::debug!(error = %e, "Social stream closed");
        }
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(retry) => {}
        }
    }
}
