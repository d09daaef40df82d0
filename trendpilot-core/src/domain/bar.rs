//! Bar: the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV bar for a trading pair over one timeframe interval.
///
/// Volume is denominated in the base currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Returns true if any OHLC field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.close > 0.0
            && self.volume >= 0.0
    }

    /// Midpoint of the bar's range, the centre line of the Supertrend bands.
    pub fn midprice(&self) -> f64 {
        (self.high + self.low) / 2.0
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum BarError {
    #[error("bar {index} at {timestamp} is not after the previous bar")]
    NotChronological {
        index: usize,
        timestamp: DateTime<Utc>,
    },
}

/// Chronologically ordered window of bars, oldest first.
///
/// Indicator rows are aligned with this ordering by index.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Wrap a bar vector, rejecting duplicate or out-of-order timestamps.
    pub fn new(bars: Vec<Bar>) -> Result<Self, BarError> {
        if let Some(index) = bars
            .windows(2)
            .position(|pair| pair[1].timestamp <= pair[0].timestamp)
        {
            return Err(BarError::NotChronological {
                index: index + 1,
                timestamp: bars[index + 1].timestamp,
            });
        }
        Ok(Self { bars })
    }

    pub fn as_slice(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Keep only the most recent `limit` bars.
    pub fn tail(mut self, limit: usize) -> Self {
        let excess = self.bars.len().saturating_sub(limit);
        self.bars.drain(..excess);
        self
    }

    pub fn into_inner(self) -> Vec<Bar> {
        self.bars
    }
}
