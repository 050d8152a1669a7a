//! Analytics
//!
//! Divergence scoring over instrument state and the candle indicators
//! evaluated by the scanner.

mod divergence;
pub mod indicators;

pub use divergence::{
    DivergenceScorer, ABSORPTION_NOTIONAL, ABSORPTION_RANGE_FRACTION, MIN_SAMPLES,
    OVEREXTENSION_WINDOW, OVEREXTENSION_Z,
};
