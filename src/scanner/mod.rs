//! Universe signal scanner
//!
//! Watches every instrument's 24h ticker, analyses the large movers on
//! one-minute candles and records momentum / RSI / volume signals. A
//! per-symbol cooldown limits repeat alerts and a global gate limits the
//! top-trader ratio lookups.

mod cooldown;
mod engine;
mod enrichment;
mod feed;
mod rule;
mod status;
mod types;

pub use cooldown::CooldownMap;
pub use engine::{record_signal, Scanner, CONNECTING_STATUS};
pub use enrichment::RateLimitedEnrichment;
pub use feed::SignalFeed;
pub use rule::{Evaluation, SignalRule};
pub use status::{StatusBoard, IDLE_STATUS};
pub use types::{ScannerSignal, SignalKind};
