//! Instrument state aggregation
//!
//! One [`InstrumentState`] per client session, mutated by the ingestors and
//! rendered into a [`Snapshot`] on the broadcast cadence.

mod instrument;
mod snapshot;
mod types;

pub use instrument::{
    InstrumentState, CVD_HISTORY_CAPACITY, OI_HISTORY_CAPACITY, PRICE_HISTORY_CAPACITY,
    RING_CAPACITY, SOCIAL_PULSE_CAPACITY, TAKER_WINDOW_MS,
};
pub use snapshot::{
    HistorySnapshot, LiquidationRow, MomentumSnapshot, NewsSnapshot, RatioPair, RatiosSnapshot,
    Snapshot, TradeRow,
};
pub use types::{
    sentiment_label, DivergenceLabel, DivergenceScore, LiquidationEvent, NewsItem,
    PositioningRatio, RatioKind, Side, SocialMessage, SocialSentiment, TradeEntry, EQUILIBRIUM,
};

use std::sync::Arc;
use tokio::sync::RwLock;

/// State handle shared between a session's ingestors and its renderer
pub type SharedState = Arc<RwLock<InstrumentState>>;

/// Wrap a fresh state for `symbol` in a shared handle
pub fn shared(symbol: impl Into<String>) -> SharedState {
    Arc::new(RwLock::new(InstrumentState::new(symbol)))
}
