//! Momentum / RSI / volume signal rule

use super::types::SignalKind;
use crate::analytics::indicators;
use crate::config::{ScannerConfig, VolumeRule};
use crate::feed::Candle;

/// Indicator readings behind a positive evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub kind: SignalKind,
    pub rsi: f64,
    pub momentum_pct: f64,
    pub cvd_delta: f64,
}

/// One parameterised rule covering the reversal and breakout variants
#[derive(Debug, Clone)]
pub struct SignalRule {
    pub rsi_period: usize,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    pub momentum_window: usize,
    pub momentum_threshold_pct: f64,
    pub volume_rule: VolumeRule,
    pub confirm_reversal_volume: bool,
    pub volume_spike_multiplier: f64,
    pub volume_average_window: usize,
    pub enable_breakout: bool,
    pub breakout_threshold_pct: f64,
}

impl From<&ScannerConfig> for SignalRule {
    fn from(config: &ScannerConfig) -> Self {
        Self {
            rsi_period: config.rsi_period,
            rsi_overbought: config.rsi_overbought,
            rsi_oversold: config.rsi_oversold,
            momentum_window: config.momentum_window,
            momentum_threshold_pct: config.momentum_threshold_pct,
            volume_rule: config.volume_rule,
            confirm_reversal_volume: config.confirm_reversal_volume,
            volume_spike_multiplier: config.volume_spike_multiplier,
            volume_average_window: config.volume_average_window,
            enable_breakout: config.enable_breakout,
            breakout_threshold_pct: config.breakout_threshold_pct,
        }
    }
}

impl Default for SignalRule {
    fn default() -> Self {
        Self::from(&ScannerConfig::default())
    }
}

impl SignalRule {
    fn volume_spike(&self, volumes: &[f64]) -> bool {
        indicators::volume_spike(volumes, self.volume_average_window, self.volume_spike_multiplier)
    }

    fn volume_confirms(&self, volumes: &[f64]) -> bool {
        match self.volume_rule {
            VolumeRule::Decreasing => indicators::volume_decreasing(volumes),
            VolumeRule::SpikeVsAverage => self.volume_spike(volumes),
        }
    }

    /// Evaluate the rule over candles ordered oldest first
    ///
    /// Short wins over long, long over breakout. No RSI or momentum means no
    /// signal.
    pub fn evaluate(&self, candles: &[Candle]) -> Option<Evaluation> {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();

        let rsi = indicators::rsi(&closes, self.rsi_period)?;
        let momentum = indicators::momentum_pct(candles, self.momentum_window)?;

        let reversal_volume_ok = !self.confirm_reversal_volume || self.volume_confirms(&volumes);

        let kind = if momentum > self.momentum_threshold_pct
            && rsi > self.rsi_overbought
            && reversal_volume_ok
        {
            SignalKind::Short
        } else if momentum < -self.momentum_threshold_pct
            && rsi < self.rsi_oversold
            && reversal_volume_ok
        {
            SignalKind::Long
        } else if self.enable_breakout
            && momentum.abs() > self.breakout_threshold_pct
            && self.volume_spike(&volumes)
        {
            SignalKind::Breakout
        } else {
            return None;
        };

        Some(Evaluation {
            kind,
            rsi,
            momentum_pct: momentum,
            cvd_delta: indicators::candle_cvd(candles),
        })
    }
}
