//! HTTP and WebSocket transport
//!
//! `/ws` upgrades into a [`Session`] that pushes a snapshot on a fixed
//! cadence and accepts subscribe messages. The REST routes are single-shot
//! reads of the shared components; `/news` serves the Fear & Greed index
//! and trending coins, `/headlines` the global news list.

mod error;

pub use error::ApiError;

use crate::feed::SymbolInfo;
use crate::scanner::ScannerSignal;
use crate::news::MarketSentiment;
use crate::session::{AppContext, Session};
use crate::state::NewsItem;
use anyhow::Context;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
    routing::get,
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the application router
pub fn create_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .route("/symbols", get(symbols))
        .route("/signals", get(signals))
        .route("/news", get(news))
        .route("/headlines", get(headlines))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

/// Serve until `cancel` fires
pub async fn serve(ctx: Arc<AppContext>, cancel: CancellationToken) -> anyhow::Result<()> {
    let bind = ctx.config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;

    tracing::info!(addr = %bind, "Server listening");

    axum::serve(listener, create_router(ctx))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

#[derive(Debug, Serialize)]
struct ServiceInfo {
    name: &'static str,
    version: &'static str,
    endpoints: [&'static str; 6],
}

async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        endpoints: ["/ws", "/symbols", "/signals", "/news", "/headlines", "/health"],
    })
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    sessions: usize,
}

async fn health(State(ctx): State<Arc<AppContext>>) -> Json<Health> {
    Json(Health {
        status: "ok",
        sessions: ctx.active_sessions(),
    })
}

async fn symbols(State(ctx): State<Arc<AppContext>>) -> Result<Json<Vec<SymbolInfo>>, ApiError> {
    let quote = &ctx.config.feed.quote_asset;
    let list = ctx
        .market()
        .symbols(quote)
        .await
        .map_err(|e| ApiError::upstream(format!("Symbol listing failed: {}", e)))?;
    Ok(Json(list))
}

#[derive(Debug, Deserialize)]
struct SignalsQuery {
    limit: Option<usize>,
}

async fn signals(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<SignalsQuery>,
) -> Result<Json<Vec<ScannerSignal>>, ApiError> {
    let limit = query.limit.unwrap_or(ctx.config.store.recent_limit);
    let rows = ctx
        .store
        .recent(limit)
        .await
        .map_err(|e| ApiError::internal(format!("Signal query failed: {}", e)))?;
    Ok(Json(rows))
}

async fn news(State(ctx): State<Arc<AppContext>>) -> Json<MarketSentiment> {
    Json(ctx.sentiment.get().await)
}

async fn headlines(State(ctx): State<Arc<AppContext>>) -> Json<Vec<NewsItem>> {
    Json(ctx.global_news.get())
}

async fn ws_handler(ws: WebSocketUpgrade, State(ctx): State<Arc<AppContext>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, ctx))
}

async fn handle_socket(socket: WebSocket, ctx: Arc<AppContext>) {
    let (mut sender, mut receiver) = socket.split();
    let mut session = Session::open(Arc::clone(&ctx));

    let mut ticker = tokio::time::interval(ctx.config.server.broadcast_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ctx.shutdown.cancelled() => break,

            _ = ticker.tick() => {
                let snapshot = session.render().await;
                let json = match serde_json::to_string(&snapshot) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!(session = %session.id(), error = %e, "Snapshot encode failed");
                        continue;
                    }
                };
                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }

            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    session.handle_control(text.as_str()).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(session = %session.id(), error = %e, "Socket error");
                    break;
                }
            },
        }
    }

    session.close().await;
}
