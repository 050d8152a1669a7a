//! Reconnecting WebSocket reader

use super::types::{WsConfig, WsError, WsMessage};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;

/// Why a live connection ended
enum Exit {
    /// Cancelled or consumer gone; stop for good
    Stop,
    /// Link failure; try again after the reconnect delay
    Retry(WsError),
}

/// Read-only WebSocket client that keeps one stream alive
pub struct WsClient {
    config: WsConfig,
}

impl WsClient {
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Spawn the connection task and return its message channel
    ///
    /// The task stops when `cancel` fires, when the receiver is dropped, or
    /// when `max_attempts` consecutive connections have failed. Its last
    /// message is always [`WsMessage::Disconnected`] if anyone is listening.
    pub fn connect(&self, cancel: CancellationToken) -> mpsc::Receiver<WsMessage> {
        let (tx, rx) = mpsc::channel(self.config.buffer_size);
        let client = Self::new(self.config.clone());

        tokio::spawn(async move { client.run(tx, cancel).await });

        rx
    }

    /// Drive the connection on the caller's task, same stop rules as [`connect`]
    ///
    /// The socket is closed by the time this returns.
    ///
    /// [`connect`]: WsClient::connect
    pub async fn run(&self, tx: mpsc::Sender<WsMessage>, cancel: CancellationToken) {
        if let Err(e) = supervise(&self.config, &tx, &cancel).await {
            tracing::warn!(url = %self.config.url, error = %e, "WebSocket stream abandoned");
        }
        let _ = tx.send(WsMessage::Disconnected).await;
    }
}

async fn supervise(
    config: &WsConfig,
    tx: &mpsc::Sender<WsMessage>,
    cancel: &CancellationToken,
) -> Result<(), WsError> {
    let mut failures = 0u32;

    loop {
        let error = match run_once(config, tx, cancel, &mut failures).await {
            Exit::Stop => return Ok(()),
            Exit::Retry(e) => e,
        };

        failures += 1;
        tracing::warn!(url = %config.url, error = %error, attempt = failures, "WebSocket link lost");

        if config.max_attempts.is_some_and(|max| failures >= max) {
            return Err(WsError::GaveUp(failures));
        }
        if tx.send(WsMessage::Reconnecting { attempt: failures }).await.is_err() {
            return Ok(());
        }

        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = tokio::time::sleep(config.reconnect_delay) => {}
        }
    }
}

/// One connection from handshake to exit; a successful handshake clears `failures`
async fn run_once(
    config: &WsConfig,
    tx: &mpsc::Sender<WsMessage>,
    cancel: &CancellationToken,
    failures: &mut u32,
) -> Exit {
    tracing::debug!(url = %config.url, "Opening WebSocket");

    let stream = tokio::select! {
        _ = cancel.cancelled() => return Exit::Stop,
        conn = connect_async(config.url.as_str()) => match conn {
            Ok((stream, _)) => stream,
            Err(e) => return Exit::Retry(WsError::Connect(e.to_string())),
        },
    };
    *failures = 0;

    tracing::info!(url = %config.url, "WebSocket connected");
    if tx.send(WsMessage::Connected).await.is_err() {
        return Exit::Stop;
    }

    let (mut sink, mut frames) = stream.split();
    let mut keepalive = tokio::time::interval(config.ping_interval);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Skip);
    keepalive.tick().await;
    let mut awaiting_pong = false;

    let exit = loop {
        tokio::select! {
            _ = cancel.cancelled() => break Exit::Stop,

            _ = keepalive.tick() => {
                if awaiting_pong {
                    break Exit::Retry(WsError::PongTimeout);
                }
                if let Err(e) = sink.send(Message::Ping(Vec::new())).await {
                    break Exit::Retry(WsError::Send(e.to_string()));
                }
                awaiting_pong = true;
            }

            frame = frames.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if tx.send(WsMessage::Text(text)).await.is_err() {
                        break Exit::Stop;
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    if let Err(e) = sink.send(Message::Pong(payload)).await {
                        break Exit::Retry(WsError::Send(e.to_string()));
                    }
                }
                Some(Ok(Message::Pong(_))) => awaiting_pong = false,
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame.map(|f| f.reason.to_string()).unwrap_or_default();
                    break Exit::Retry(WsError::Closed(reason));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => break Exit::Retry(WsError::Closed(e.to_string())),
                None => break Exit::Retry(WsError::Closed("stream ended".into())),
            },
        }
    };

    if matches!(exit, Exit::Stop) {
        let _ = sink.send(Message::Close(None)).await;
    }
    exit
}
