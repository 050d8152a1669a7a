//! Per-instrument aggregate fed by the stream ingestors

use super::snapshot::{
    HistorySnapshot, LiquidationRow, MomentumSnapshot, NewsSnapshot, RatioPair, RatiosSnapshot,
    Snapshot, TradeRow,
};
use super::types::{
    sentiment_label, DivergenceScore, LiquidationEvent, NewsItem, PositioningRatio, RatioKind,
    Side, SocialMessage, SocialSentiment, TradeEntry,
};
use crate::analytics::DivergenceScorer;
use crate::history::{HistoryBuffer, Sample, MINUTE_MS};
use std::collections::VecDeque;

/// Price history depth (one-minute samples)
pub const PRICE_HISTORY_CAPACITY: usize = 60;
/// Open interest history depth
pub const OI_HISTORY_CAPACITY: usize = 60;
/// CVD history depth (one-minute samples)
pub const CVD_HISTORY_CAPACITY: usize = 100;
/// Liquidation and trade tape depth
pub const RING_CAPACITY: usize = 50;
/// Social pulse depth
pub const SOCIAL_PULSE_CAPACITY: usize = 30;
/// Taker volume window length
pub const TAKER_WINDOW_MS: i64 = 5 * MINUTE_MS;

/// Aggregate state for one instrument
///
/// Every mutator applies one external fact. Derived fields are computed on
/// read, except the divergence score which is refreshed explicitly through
/// [`InstrumentState::refresh_divergence`] on the render cadence.
#[derive(Debug, Clone)]
pub struct InstrumentState {
    symbol: String,

    global_ratio: PositioningRatio,
    top_accounts_ratio: PositioningRatio,
    top_positions_ratio: PositioningRatio,

    mark_price: f64,
    index_price: f64,
    spot_price: f64,
    open_interest: f64,
    cumulative_volume_delta: f64,
    taker_buy_volume: f64,
    taker_sell_volume: f64,
    taker_window_start: Option<i64>,

    price_history: HistoryBuffer,
    oi_history: HistoryBuffer,
    cvd_history: HistoryBuffer,

    liquidations: VecDeque<LiquidationEvent>,
    trades: VecDeque<TradeEntry>,

    funding_rate: f64,
    social: SocialSentiment,
    asset_news: Vec<NewsItem>,
    divergence: DivergenceScore,
}

impl InstrumentState {
    /// Create an empty state for `symbol`
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            global_ratio: PositioningRatio::default(),
            top_accounts_ratio: PositioningRatio::default(),
            top_positions_ratio: PositioningRatio::default(),
            mark_price: 0.0,
            index_price: 0.0,
            spot_price: 0.0,
            open_interest: 0.0,
            cumulative_volume_delta: 0.0,
            taker_buy_volume: 0.0,
            taker_sell_volume: 0.0,
            taker_window_start: None,
            price_history: HistoryBuffer::new(PRICE_HISTORY_CAPACITY),
            oi_history: HistoryBuffer::new(OI_HISTORY_CAPACITY),
            cvd_history: HistoryBuffer::new(CVD_HISTORY_CAPACITY),
            liquidations: VecDeque::with_capacity(RING_CAPACITY),
            trades: VecDeque::with_capacity(RING_CAPACITY),
            funding_rate: 0.0,
            social: SocialSentiment::default(),
            asset_news: Vec::new(),
            divergence: DivergenceScore::default(),
        }
    }

    /// Apply one aggressor trade
    ///
    /// Notional `price * quantity` is added to CVD when the taker bought and
    /// subtracted when the taker sold.
    pub fn apply_trade(&mut self, price: f64, quantity: f64, taker_is_buyer: bool, timestamp_ms: i64) {
        self.roll_taker_window(timestamp_ms);

        let notional = price * quantity;
        let side = if taker_is_buyer {
            self.taker_buy_volume += notional;
            self.cumulative_volume_delta += notional;
            Side::Buy
        } else {
            self.taker_sell_volume += notional;
            self.cumulative_volume_delta -= notional;
            Side::Sell
        };

        push_capped(
            &mut self.trades,
            TradeEntry {
                price,
                quantity,
                side,
                timestamp_ms,
            },
            RING_CAPACITY,
        );
    }

    fn roll_taker_window(&mut self, timestamp_ms: i64) {
        match self.taker_window_start {
            Some(start) if timestamp_ms - start < TAKER_WINDOW_MS => {}
            _ => {
                self.taker_buy_volume = 0.0;
                self.taker_sell_volume = 0.0;
                self.taker_window_start = Some(timestamp_ms);
            }
        }
    }

    /// Overwrite mark price, index price and funding rate
    pub fn apply_mark_price(&mut self, price: f64, index_price: f64, funding_rate: f64) {
        self.mark_price = price;
        self.index_price = index_price;
        self.funding_rate = funding_rate;
    }

    /// Record a forced liquidation
    pub fn apply_liquidation(&mut self, event: LiquidationEvent) {
        push_capped(&mut self.liquidations, event, RING_CAPACITY);
    }

    /// Overwrite open interest and append it to the OI history
    pub fn apply_open_interest(&mut self, value: f64, timestamp_ms: i64) {
        self.open_interest = value;
        self.oi_history.push(Sample::new(timestamp_ms, value));
    }

    /// Overwrite one positioning ratio slot
    pub fn apply_positioning_ratio(
        &mut self,
        kind: RatioKind,
        long_ratio: f64,
        short_ratio: f64,
        timestamp_ms: i64,
    ) {
        let slot = match kind {
            RatioKind::GlobalAccounts => &mut self.global_ratio,
            RatioKind::TopAccounts => &mut self.top_accounts_ratio,
            RatioKind::TopPositions => &mut self.top_positions_ratio,
        };
        *slot = PositioningRatio {
            long_ratio,
            short_ratio,
            as_of: timestamp_ms,
        };
    }

    /// Overwrite the spot reference price
    pub fn apply_spot_price(&mut self, price: f64) {
        self.spot_price = price;
    }

    /// Minute-bucketed append to the price history
    pub fn append_price_sample(&mut self, timestamp_ms: i64, price: f64) {
        self.price_history
            .push_bucketed(Sample::new(timestamp_ms, price), MINUTE_MS);
    }

    /// Minute-bucketed append of the current CVD to the CVD history
    pub fn append_cvd_sample(&mut self, timestamp_ms: i64) {
        self.cvd_history
            .push_bucketed(Sample::new(timestamp_ms, self.cumulative_volume_delta), MINUTE_MS);
    }

    /// Overwrite the social metrics and relabel the sentiment
    pub fn apply_social_metrics(&mut self, galaxy_score: f64, alt_rank: i64, sentiment: f64) {
        self.social.galaxy_score = galaxy_score;
        self.social.alt_rank = alt_rank;
        self.social.sentiment = sentiment;
        self.social.sentiment_label = sentiment_label(sentiment).to_string();
    }

    /// Append a message to the social pulse
    pub fn push_social_message(&mut self, text: impl Into<String>, sentiment: impl Into<String>, timestamp_ms: i64) {
        self.social.pulse.push(SocialMessage {
            text: text.into(),
            sentiment: sentiment.into(),
            timestamp: timestamp_ms,
        });
        if self.social.pulse.len() > SOCIAL_PULSE_CAPACITY {
            let excess = self.social.pulse.len() - SOCIAL_PULSE_CAPACITY;
            self.social.pulse.drain(..excess);
        }
    }

    /// Replace the asset news list
    pub fn set_asset_news(&mut self, news: Vec<NewsItem>) {
        self.asset_news = news;
    }

    /// Mark minus spot, or 0 without a positive spot price
    pub fn basis(&self) -> f64 {
        if self.spot_price > 0.0 {
            self.mark_price - self.spot_price
        } else {
            0.0
        }
    }

    /// (mark - spot) / spot, or 0 without a positive spot price
    pub fn premium_index(&self) -> f64 {
        if self.spot_price > 0.0 {
            (self.mark_price - self.spot_price) / self.spot_price
        } else {
            0.0
        }
    }

    /// Recompute the divergence score
    ///
    /// Leaves the previous score untouched while history is too short.
    pub fn refresh_divergence(&mut self) {
        if let Some(score) = DivergenceScorer::score(self) {
            self.divergence = score;
        }
    }

    /// Zero every windowed and derived field and clear all history
    pub fn reset(&mut self) {
        let symbol = std::mem::take(&mut self.symbol);
        *self = Self::new(symbol);
    }

    /// Hard reset onto a different instrument
    pub fn switch_to(&mut self, symbol: impl Into<String>) {
        *self = Self::new(symbol);
    }

    /// Render the full state for transport
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            symbol: self.symbol.clone(),
            price: self.mark_price,
            index_price: self.index_price,
            spot_price: self.spot_price,
            funding_rate: self.funding_rate,
            basis: self.basis(),
            premium_index: self.premium_index(),
            ratios: RatiosSnapshot {
                global: RatioPair::from(&self.global_ratio),
                top_accounts: RatioPair::from(&self.top_accounts_ratio),
                top_positions: RatioPair::from(&self.top_positions_ratio),
            },
            momentum: MomentumSnapshot {
                cvd: self.cumulative_volume_delta,
                open_interest: self.open_interest,
                taker_buy: self.taker_buy_volume,
                taker_sell: self.taker_sell_volume,
            },
            history: HistorySnapshot {
                price: self.price_history.to_vec(),
                oi: self.oi_history.to_vec(),
                cvd: self.cvd_history.to_vec(),
            },
            liquidations: self.liquidations.iter().map(LiquidationRow::from).collect(),
            trades: self.trades.iter().map(TradeRow::from).collect(),
            social: self.social.clone(),
            news: NewsSnapshot {
                global: Vec::new(),
                asset: self.asset_news.clone(),
            },
            scanner_signals: Vec::new(),
            scanner_status: String::new(),
            divergence: self.divergence.clone(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn mark_price(&self) -> f64 {
        self.mark_price
    }

    pub fn index_price(&self) -> f64 {
        self.index_price
    }

    pub fn spot_price(&self) -> f64 {
        self.spot_price
    }

    pub fn funding_rate(&self) -> f64 {
        self.funding_rate
    }

    pub fn open_interest(&self) -> f64 {
        self.open_interest
    }

    pub fn cumulative_volume_delta(&self) -> f64 {
        self.cumulative_volume_delta
    }

    pub fn taker_buy_volume(&self) -> f64 {
        self.taker_buy_volume
    }

    pub fn taker_sell_volume(&self) -> f64 {
        self.taker_sell_volume
    }

    pub fn ratio(&self, kind: RatioKind) -> &PositioningRatio {
        match kind {
            RatioKind::GlobalAccounts => &self.global_ratio,
            RatioKind::TopAccounts => &self.top_accounts_ratio,
            RatioKind::TopPositions => &self.top_positions_ratio,
        }
    }

    pub fn price_history(&self) -> &HistoryBuffer {
        &self.price_history
    }

    pub fn oi_history(&self) -> &HistoryBuffer {
        &self.oi_history
    }

    pub fn cvd_history(&self) -> &HistoryBuffer {
        &self.cvd_history
    }

    pub fn liquidations(&self) -> &VecDeque<LiquidationEvent> {
        &self.liquidations
    }

    pub fn trades(&self) -> &VecDeque<TradeEntry> {
        &self.trades
    }

    pub fn social(&self) -> &SocialSentiment {
        &self.social
    }

    pub fn asset_news(&self) -> &[NewsItem] {
        &self.asset_news
    }

    pub fn divergence(&self) -> &DivergenceScore {
        &self.divergence
    }
}

fn push_capped<T>(ring: &mut VecDeque<T>, item: T, capacity: usize) {
    ring.push_back(item);
    while ring.len() > capacity {
        ring.pop_front();
    }
}
