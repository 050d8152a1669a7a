//! Client sessions
//!
//! Each connected client owns one instrument state and its ingestors. The
//! scanner feed, the signal store and the news caches live in the
//! process-wide [`AppContext`] and are shared by every session.

use crate::config::Config;
use crate::feed::MarketData;
use crate::ingest::{IngestorSet, Sources};
use crate::news::{NewsCache, SentimentCache};
use crate::scanner::{SignalFeed, StatusBoard};
use crate::state::{self, SharedState, Snapshot};
use crate::store::SignalStore;
use crate::telemetry::{self, GaugeMetric, LatencyMetric};
use serde::Deserialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Process-wide shared components
pub struct AppContext {
    pub config: Config,
    pub sources: Sources,
    pub store: Arc<dyn SignalStore>,
    pub signals: SignalFeed,
    pub status: StatusBoard,
    pub global_news: NewsCache,
    pub sentiment: SentimentCache,
    pub shutdown: CancellationToken,
    active_sessions: AtomicUsize,
}

impl AppContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        sources: Sources,
        store: Arc<dyn SignalStore>,
        signals: SignalFeed,
        status: StatusBoard,
        global_news: NewsCache,
        sentiment: SentimentCache,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            sources,
            store,
            signals,
            status,
            global_news,
            sentiment,
            shutdown,
            active_sessions: AtomicUsize::new(0),
        }
    }

    pub fn market(&self) -> &Arc<dyn MarketData> {
        &self.sources.market
    }

    pub fn active_sessions(&self) -> usize {
        self.active_sessions.load(Ordering::SeqCst)
    }

    fn session_opened(&self) {
        let n = self.active_sessions.fetch_add(1, Ordering::SeqCst) + 1;
        telemetry::set_gauge(GaugeMetric::ActiveSessions, n as f64);
    }

    fn session_closed(&self) {
        let n = self.active_sessions.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        telemetry::set_gauge(GaugeMetric::ActiveSessions, n as f64);
    }
}

/// Inbound control message
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ControlMessage {
    /// Switch the session to another instrument
    Subscribe { symbol: String },
}

/// One client's view: an instrument state plus the tasks feeding it
pub struct Session {
    id: Uuid,
    ctx: Arc<AppContext>,
    state: SharedState,
    ingestors: IngestorSet,
}

impl Session {
    /// Open a session on the configured default symbol
    pub fn open(ctx: Arc<AppContext>) -> Self {
        let symbol = ctx.config.feed.default_symbol.to_uppercase();
        Self::open_on(ctx, symbol)
    }

    /// Open a session on `symbol`
    pub fn open_on(ctx: Arc<AppContext>, symbol: impl Into<String>) -> Self {
        let symbol = symbol.into().to_uppercase();
        let id = Uuid::new_v4();
        let state = state::shared(symbol.clone());
        let ingestors = IngestorSet::start(&ctx.sources, state.clone(), symbol.clone(), &ctx.shutdown);

        ctx.session_opened();
        tracing::info!(session = %id, symbol = %symbol, "Session opened");

        Self {
            id,
            ctx,
            state,
            ingestors,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn symbol(&self) -> &str {
        self.ingestors.symbol()
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Handle one raw control message; returns whether the instrument changed
    ///
    /// Unparseable messages are ignored.
    pub async fn handle_control(&mut self, text: &str) -> bool {
        match serde_json::from_str::<ControlMessage>(text) {
            Ok(ControlMessage::Subscribe { symbol }) => self.switch(&symbol).await,
            Err(e) => {
                tracing::debug!(session = %self.id, error = %e, "Ignoring control message");
                false
            }
        }
    }

    /// Switch to `symbol` unless it is empty or already current
    pub async fn switch(&mut self, symbol: &str) -> bool {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() || symbol == self.symbol() {
            return false;
        }

        tracing::info!(session = %self.id, from = %self.symbol(), to = %symbol, "Switching symbol");
        self.ingestors
            .switch(&self.ctx.sources, &self.state, &symbol, &self.ctx.shutdown)
            .await;
        true
    }

    /// Refresh the divergence score and render the full snapshot
    pub async fn render(&self) -> Snapshot {
        let started = Instant::now();

        let snapshot = {
            let mut s = self.state.write().await;
            s.refresh_divergence();
            s.snapshot()
        };
        let snapshot = snapshot.with_shared(
            self.ctx.signals.snapshot(),
            self.ctx.status.current(),
            self.ctx.global_news.get(),
        );

        telemetry::record_latency(LatencyMetric::SnapshotRender, started.elapsed());
        snapshot
    }

    /// Stop the ingestors and release the session
    pub async fn close(mut self) {
        self.ingestors.stop().await;
        self.ctx.session_closed();
        tracing::info!(session = %self.id, "Session closed");
    }
}
