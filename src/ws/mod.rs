//! WebSocket client library
//!
//! A read-only stream client with keepalive pings, a fixed reconnect delay
//! and cooperative cancellation.

mod client;
mod types;

pub use client::WsClient;
pub use types::{WsConfig, WsError, WsMessage};
