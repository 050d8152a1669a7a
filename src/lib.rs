//! flow-terminal: order-flow terminal backend for Binance USD-M futures
//!
//! This library provides the core components for:
//! - Real-time trade, liquidation and mark-price streams per instrument
//! - Instrument state aggregation with bounded histories
//! - Divergence scoring (price vs. CVD, absorption, overextension)
//! - Universe-wide breakout scanning with cooldown and rate-limited enrichment
//! - Signal persistence in SQLite or memory
//! - News and social sentiment
//! - WebSocket sessions with snapshot broadcast
//! - Structured logging and Prometheus metrics

pub mod analytics;
pub mod cli;
pub mod config;
pub mod feed;
pub mod history;
pub mod ingest;
pub mod news;
pub mod scanner;
pub mod server;
pub mod session;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod ws;
