//! WebSocket types and configuration

use std::time::Duration;
use thiserror::Error;

/// Stream connection settings
#[derive(Debug, Clone)]
pub struct WsConfig {
    pub url: String,
    /// Pause after a lost link before the next attempt
    pub reconnect_delay: Duration,
    /// Failed connections tolerated before giving up; `None` retries forever
    pub max_attempts: Option<u32>,
    /// Keepalive ping cadence; a ping left unanswered for one period drops the link
    pub ping_interval: Duration,
    /// Inbound channel capacity
    pub buffer_size: usize,
}

impl WsConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_delay: Duration::from_secs(5),
            max_attempts: None,
            ping_interval: Duration::from_secs(30),
            buffer_size: 1024,
        }
    }

    /// Give up after `n` failed connections
    pub fn max_reconnects(mut self, n: u32) -> Self {
        self.max_attempts = Some(n);
        self
    }

    pub fn reconnect_delay(mut self, d: Duration) -> Self {
        self.reconnect_delay = d;
        self
    }
}

/// What the connection task reports to its consumer
#[derive(Debug, Clone, PartialEq)]
pub enum WsMessage {
    /// Text frame payload
    Text(String),
    /// Socket (re)opened
    Connected,
    /// Link lost; another attempt follows after the reconnect delay
    Reconnecting { attempt: u32 },
    /// The task has stopped and will not reconnect
    Disconnected,
}

/// Per-connection failures
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WsError {
    #[error("Connection failed: {0}")]
    Connect(String),
    #[error("Connection closed: {0}")]
    Closed(String),
    #[error("Send failed: {0}")]
    Send(String),
    #[error("No pong within the ping interval")]
    PongTimeout,
    #[error("Gave up after {0} failed connections")]
    GaveUp(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builders() {
        let config = WsConfig::new("wss://fstream.binance.com/ws/!ticker@arr");
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.max_attempts, None);
        assert_eq!(config.ping_interval, Duration::from_secs(30));

        let config = config
            .max_reconnects(1)
            .reconnect_delay(Duration::from_secs(7));

        assert_eq!(config.max_attempts, Some(1));
        assert_eq!(config.reconnect_delay, Duration::from_secs(7));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(WsError::GaveUp(3).to_string(), "Gave up after 3 failed connections");
        assert_eq!(
            WsError::Connect("refused".into()).to_string(),
            "Connection failed: refused"
        );
    }
}
