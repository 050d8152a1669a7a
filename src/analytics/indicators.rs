//! Candle indicators used by the scanner

use crate::feed::Candle;

/// Relative strength index of the newest close
///
/// Uses a simple rolling mean of the last `period` gains and losses. A zero
/// loss mean clamps to 100 (or 50 when the window is perfectly flat).
/// Returns `None` with fewer than `period + 1` closes.
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let window = &closes[closes.len() - period - 1..];
    let (gains, losses) = window
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0, 0.0), |(g, l), d| {
            if d > 0.0 {
                (g + d, l)
            } else {
                (g, l - d)
            }
        });

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        return Some(if avg_gain == 0.0 { 50.0 } else { 100.0 });
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// Percent change from the open `window` candles back to the newest close
pub fn momentum_pct(candles: &[Candle], window: usize) -> Option<f64> {
    if window == 0 || candles.len() < window {
        return None;
    }
    let start = candles[candles.len() - window].open;
    let end = candles.last()?.close;
    if start <= 0.0 {
        return None;
    }
    Some((end - start) / start * 100.0)
}

/// Newest volume exceeds `multiplier` times the mean of the preceding `window`
pub fn volume_spike(volumes: &[f64], window: usize, multiplier: f64) -> bool {
    if window == 0 || volumes.len() < window + 1 {
        return false;
    }
    let last = volumes.len() - 1;
    let avg = volumes[last - window..last].iter().sum::<f64>() / window as f64;
    volumes[last] > avg * multiplier
}

/// Three strictly decreasing volumes ending at the newest candle
pub fn volume_decreasing(volumes: &[f64]) -> bool {
    match volumes {
        [.., a, b, c] => c < b && b < a,
        _ => false,
    }
}

/// Taker buy minus taker sell volume summed over the candles
pub fn candle_cvd(candles: &[Candle]) -> f64 {
    candles
        .iter()
        .map(|c| c.taker_buy_volume - (c.volume - c.taker_buy_volume))
        .sum()
}

/// Mean and population standard deviation
pub fn mean_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, var.sqrt()))
}
