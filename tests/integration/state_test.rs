//! Instrument state and divergence scoring integration tests

use flow_terminal::analytics::{indicators, DivergenceScorer};
use flow_terminal::history::MINUTE_MS;
use flow_terminal::state::{
    DivergenceLabel, InstrumentState, LiquidationEvent, RatioKind, Side, CVD_HISTORY_CAPACITY,
    PRICE_HISTORY_CAPACITY, RING_CAPACITY,
};

const T0: i64 = 1_704_067_200_000;

/// One minute of balanced flow: the same notional bought and sold at `price`
fn balanced_minute(state: &mut InstrumentState, ts: i64, price: f64, notional_each: f64) {
    state.append_price_sample(ts, price);
    let qty = notional_each / price;
    state.apply_trade(price, qty, true, ts);
    state.apply_trade(price, qty, false, ts + 1);
    state.append_cvd_sample(ts + 2);
}

#[test]
fn test_whale_absorption_scores_three() {
    let mut state = InstrumentState::new("BTCUSDT");

    // Price oscillates +-0.005% with 30k bought and 30k sold every minute,
    // so the live 5-minute window carries 150k per side
    for i in 0..50 {
        let price = if i % 2 == 0 { 100.0 } else { 100.005 };
        balanced_minute(&mut state, T0 + i * MINUTE_MS, price, 30_000.0);
    }

    assert!((state.taker_buy_volume() - 150_000.0).abs() < 1e-6);
    assert!((state.taker_sell_volume() - 150_000.0).abs() < 1e-6);

    let score = DivergenceScorer::score(&state).unwrap();
    assert_eq!(score.score, 3);
    assert_eq!(score.label, DivergenceLabel::Balanced);
    assert_eq!(score.details, "Whale Absorption Detected");

    state.refresh_divergence();
    assert_eq!(state.divergence().score, 3);
}

#[test]
fn test_bearish_divergence_with_overextension() {
    let mut state = InstrumentState::new("ETHUSDT");

    // Flat tape for twenty minutes
    for i in 0..20 {
        state.append_price_sample(T0 + i * MINUTE_MS, 2000.0 + (i % 2) as f64);
        state.append_cvd_sample(T0 + i * MINUTE_MS);
    }

    // Price jumps while sellers hit the book
    let ts = T0 + 20 * MINUTE_MS;
    state.apply_trade(2050.0, 1.0, false, ts);
    state.append_price_sample(ts, 2050.0);
    state.append_cvd_sample(ts);

    let score = DivergenceScorer::score(&state).unwrap();
    assert_eq!(score.score, 7);
    assert_eq!(score.label, DivergenceLabel::Unstable);
    assert_eq!(
        score.details,
        "Bearish Divergence (Price ^, CVD v) | Overextended (Mean Reversion Risk)"
    );
}

#[test]
fn test_cvd_follows_aggressor_side() {
    let mut state = InstrumentState::new("BTCUSDT");
    state.apply_trade(100.0, 2.0, true, T0);
    state.apply_trade(100.0, 1.0, false, T0 + 10);
    state.apply_trade(50.0, 1.0, false, T0 + 20);

    assert_eq!(state.cumulative_volume_delta(), 50.0);
    assert_eq!(state.trades().len(), 3);
    assert_eq!(state.trades().back().unwrap().side, Side::Sell);
}

#[test]
fn test_taker_window_tumbles_after_five_minutes() {
    let mut state = InstrumentState::new("BTCUSDT");
    state.apply_trade(100.0, 10.0, true, T0);
    state.apply_trade(100.0, 5.0, false, T0 + 4 * MINUTE_MS);
    assert_eq!(state.taker_buy_volume(), 1000.0);
    assert_eq!(state.taker_sell_volume(), 500.0);

    state.apply_trade(100.0, 1.0, true, T0 + 5 * MINUTE_MS);
    assert_eq!(state.taker_buy_volume(), 100.0);
    assert_eq!(state.taker_sell_volume(), 0.0);
    // CVD is cumulative and never windowed
    assert_eq!(state.cumulative_volume_delta(), 600.0);
}

#[test]
fn test_histories_bucket_and_stay_bounded() {
    let mut state = InstrumentState::new("BTCUSDT");

    // Two samples per minute collapse into one
    for i in 0..(2 * (PRICE_HISTORY_CAPACITY as i64 + 10)) {
        let ts = T0 + i * MINUTE_MS / 2;
        state.append_price_sample(ts, i as f64);
        state.append_cvd_sample(ts);
    }

    let prices = state.price_history();
    assert_eq!(prices.len(), PRICE_HISTORY_CAPACITY);
    let times: Vec<i64> = prices.iter().map(|s| s.time).collect();
    assert!(times.windows(2).all(|w| w[1] - w[0] >= MINUTE_MS));
    // The newest bucket keeps its opening timestamp and the latest value
    let newest = prices.latest().unwrap();
    assert_eq!(newest.value, (2 * (PRICE_HISTORY_CAPACITY as i64 + 10) - 1) as f64);
    assert_eq!((newest.time - T0) % MINUTE_MS, 0);

    assert!(state.cvd_history().len() <= CVD_HISTORY_CAPACITY);
}

#[test]
fn test_rings_evict_oldest() {
    let mut state = InstrumentState::new("BTCUSDT");
    for i in 0..(RING_CAPACITY as i64 + 5) {
        state.apply_liquidation(LiquidationEvent {
            side: Side::Sell,
            price: 100.0 + i as f64,
            quantity: 1.0,
            timestamp_ms: T0 + i,
        });
        state.apply_trade(100.0, 1.0, true, T0 + i);
    }

    assert_eq!(state.liquidations().len(), RING_CAPACITY);
    assert_eq!(state.liquidations().front().unwrap().price, 105.0);
    assert_eq!(state.trades().len(), RING_CAPACITY);
}

#[test]
fn test_basis_and_premium() {
    let mut state = InstrumentState::new("BTCUSDT");
    state.apply_mark_price(101.0, 100.5, 0.0001);
    assert_eq!(state.basis(), 0.0);
    assert_eq!(state.premium_index(), 0.0);

    state.apply_spot_price(100.0);
    assert_eq!(state.basis(), 1.0);
    assert!((state.premium_index() - 0.01).abs() < 1e-12);
}

#[test]
fn test_switch_clears_everything() {
    let mut state = InstrumentState::new("BTCUSDT");
    state.apply_trade(100.0, 1.0, true, T0);
    state.apply_open_interest(5000.0, T0);
    state.apply_positioning_ratio(RatioKind::TopAccounts, 0.6, 0.4, T0);
    state.append_price_sample(T0, 100.0);

    state.switch_to("ethusdt");

    assert_eq!(state.symbol(), "ETHUSDT");
    assert_eq!(state.cumulative_volume_delta(), 0.0);
    assert_eq!(state.open_interest(), 0.0);
    assert_eq!(state.ratio(RatioKind::TopAccounts).long_ratio, 0.0);
    assert!(state.price_history().is_empty());
    assert!(state.trades().is_empty());
}

#[test]
fn test_snapshot_render() {
    let mut state = InstrumentState::new("BTCUSDT");
    state.apply_mark_price(42_000.0, 41_990.0, 0.0001);
    state.apply_spot_price(41_980.0);
    state.apply_positioning_ratio(RatioKind::GlobalAccounts, 0.55, 0.45, T0);

    let json = serde_json::to_value(state.snapshot()).unwrap();
    assert_eq!(json["symbol"], "BTCUSDT");
    assert_eq!(json["price"], 42_000.0);
    assert_eq!(json["basis"], 20.0);
    assert_eq!(json["divergence"]["label"], "BALANCED");
    assert_eq!(json["divergence"]["details"], "Market is in equilibrium.");
    assert!(json["scannerSignals"].as_array().unwrap().is_empty());
}

#[test]
fn test_rsi_monotonic_rise_is_hundred() {
    let closes: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
    assert_eq!(indicators::rsi(&closes, 14), Some(100.0));
    assert_eq!(indicators::rsi(&closes[..14], 14), None);
}
