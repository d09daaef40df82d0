//! Indicator pipeline: True Range/ATR, Supertrend, and RSI.
//!
//! Every indicator is a pure function of the bar window. Undefined values
//! (warmup, void bars, 0/0 ratios) are carried as `None` and flow through
//! every later stage; nothing here returns an error.
//!
//! [`compute_rows`] assembles one [`IndicatorRow`] per bar, index-aligned with
//! the input window. Rows are recomputed from scratch for each window.

pub mod range;
pub mod rsi;
pub mod sma;
pub mod supertrend;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Bar;

pub use range::{average_true_range, true_range};
pub use rsi::{momentum, relative_strength, rsi_from_rs, MomentumRow};
pub use sma::rolling_mean;
pub use supertrend::{raw_bands, trend_states, Bands, TrendState};

#[derive(Debug, Error, PartialEq)]
pub enum ParamError {
    #[error("indicator period must be >= 2, got {0}")]
    PeriodTooShort(usize),

    #[error("supertrend multiplier must be a positive number, got {0}")]
    InvalidMultiplier(f64),
}

/// Shared ATR/RSI window length and the Supertrend band multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndicatorParams {
    period: usize,
    multiplier: f64,
}

impl IndicatorParams {
    pub fn new(period: usize, multiplier: f64) -> Result<Self, ParamError> {
        if period < 2 {
            return Err(ParamError::PeriodTooShort(period));
        }
        if !(multiplier > 0.0 && multiplier.is_finite()) {
            return Err(ParamError::InvalidMultiplier(multiplier));
        }
        Ok(Self { period, multiplier })
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Index of the first row whose trend and momentum fields can be defined.
    pub fn first_decision_index(&self) -> usize {
        self.period
    }
}

/// Every derived field for one bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub previous_close: Option<f64>,
    pub true_range: Option<f64>,
    pub atr: Option<f64>,
    pub upper_band: Option<f64>,
    pub lower_band: Option<f64>,
    pub in_uptrend: bool,
    #[serde(flatten)]
    pub momentum: MomentumRow,
}

impl IndicatorRow {
    pub fn rsi(&self) -> Option<f64> {
        self.momentum.rsi
    }

    /// True when both the trend (ATR) and momentum (RSI) inputs are defined.
    pub fn is_defined(&self) -> bool {
        self.atr.is_some() && self.momentum.rsi.is_some()
    }
}

/// Run the full pipeline over a bar window.
pub fn compute_rows(bars: &[Bar], params: &IndicatorParams) -> Vec<IndicatorRow> {
    let tr = true_range(bars);
    let atr = average_true_range(&tr, params.period);
    let raw = raw_bands(bars, &atr, params.multiplier);
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let trend = trend_states(&closes, &raw);
    let momentum = momentum(bars, params.period);

    bars.iter()
        .enumerate()
        .map(|(i, bar)| IndicatorRow {
            timestamp: bar.timestamp,
            close: bar.close,
            previous_close: i.checked_sub(1).map(|p| bars[p].close),
            true_range: tr[i],
            atr: atr[i],
            upper_band: trend[i].upper_band,
            lower_band: trend[i].lower_band,
            in_uptrend: trend[i].in_uptrend,
            momentum: momentum[i],
        })
        .collect()
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000,
/// one bar per hour.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let data: Vec<(f64, f64, f64, f64)> = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            (open, open.max(close) + 1.0, open.min(close) - 1.0, close)
        })
        .collect();
    make_ohlc_bars(&data)
}

/// Hourly bars from explicit (open, high, low, close) tuples.
#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    use chrono::TimeZone;
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Bar {
            timestamp: base + chrono::Duration::hours(i as i64),
            open,
            high,
            low,
            close,
            volume: 1000.0,
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
