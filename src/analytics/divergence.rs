//! Delta-to-price divergence scoring
//!
//! Additive 0..=10 score built from three factors:
//! - directional divergence between price and CVD (+4)
//! - absorption: heavy taker volume with a negligible price move (+3)
//! - overextension: price more than two standard deviations from its mean (+3)

use super::indicators::mean_std;
use crate::state::{DivergenceLabel, DivergenceScore, InstrumentState, EQUILIBRIUM};

/// Minimum samples required in both the price and the CVD history
pub const MIN_SAMPLES: usize = 5;
/// Combined taker notional above which absorption is considered
pub const ABSORPTION_NOTIONAL: f64 = 100_000.0;
/// Maximum price move, as a fraction of price, that still counts as absorbed
pub const ABSORPTION_RANGE_FRACTION: f64 = 0.0001;
/// Price samples used for the overextension z-score
pub const OVEREXTENSION_WINDOW: usize = 20;
/// |z| above which price is overextended
pub const OVEREXTENSION_Z: f64 = 2.0;

const DIVERGENCE_POINTS: u8 = 4;
const ABSORPTION_POINTS: u8 = 3;
const OVEREXTENSION_POINTS: u8 = 3;
const MAX_SCORE: u8 = 10;

const BEARISH_DIVERGENCE: &str = "Bearish Divergence (Price ^, CVD v)";
const BULLISH_DIVERGENCE: &str = "Bullish Divergence (Price v, CVD ^)";
const ABSORPTION: &str = "Whale Absorption Detected";
const OVEREXTENDED: &str = "Overextended (Mean Reversion Risk)";

/// Stateless divergence scorer
pub struct DivergenceScorer;

impl DivergenceScorer {
    /// Score the current state
    ///
    /// Returns `None` until both histories hold [`MIN_SAMPLES`] samples.
    pub fn score(state: &InstrumentState) -> Option<DivergenceScore> {
        let prices = state.price_history();
        let cvds = state.cvd_history();
        if prices.len() < MIN_SAMPLES || cvds.len() < MIN_SAMPLES {
            return None;
        }

        let price_now = prices.nth_back(0)?.value;
        let price_prev = prices.nth_back(1)?.value;
        let cvd_now = cvds.nth_back(0)?.value;
        let cvd_prev = cvds.nth_back(1)?.value;

        let mut score = 0u8;
        let mut details = Vec::new();

        if price_now > price_prev && cvd_now < cvd_prev {
            score += DIVERGENCE_POINTS;
            details.push(BEARISH_DIVERGENCE);
        } else if price_now < price_prev && cvd_now > cvd_prev {
            score += DIVERGENCE_POINTS;
            details.push(BULLISH_DIVERGENCE);
        }

        let taker_volume = state.taker_buy_volume() + state.taker_sell_volume();
        let price_range = (price_now - price_prev).abs();
        if taker_volume > ABSORPTION_NOTIONAL
            && price_range < price_now * ABSORPTION_RANGE_FRACTION
        {
            score += ABSORPTION_POINTS;
            details.push(ABSORPTION);
        }

        if let Some((mean, std_dev)) = mean_std(&prices.tail_values(OVEREXTENSION_WINDOW)) {
            if std_dev > 0.0 && ((price_now - mean) / std_dev).abs() > OVEREXTENSION_Z {
                score += OVEREXTENSION_POINTS;
                details.push(OVEREXTENDED);
            }
        }

        let score = score.min(MAX_SCORE);
        let details = if details.is_empty() {
            EQUILIBRIUM.to_string()
        } else {
            details.join(" | ")
        };

        Some(DivergenceScore {
            score,
            label: DivergenceLabel::from_score(score),
            details,
        })
    }
}
