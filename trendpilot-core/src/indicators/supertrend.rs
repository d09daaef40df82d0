//! Supertrend: ATR-scaled bands around the bar midprice plus a trend flag.
//!
//! Inherently sequential: each bar's trend and final bands depend on the
//! previous bar's. The recurrence is expressed as a pure transition
//! [`TrendState::step`] and folded over the series by [`trend_states`].
//!
//! Comparisons against an undefined band are false, so during the ATR warmup
//! the trend holds its seed value.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;

/// Raw bands for one bar: midprice ± multiplier·ATR.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bands {
    pub upper: Option<f64>,
    pub lower: Option<f64>,
}

/// Trend flag and final (ratcheted) bands for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendState {
    pub in_uptrend: bool,
    pub upper_band: Option<f64>,
    pub lower_band: Option<f64>,
}

impl TrendState {
    /// State of the first bar: uptrend, bands as computed.
    pub fn seed(raw: Bands) -> Self {
        Self {
            in_uptrend: true,
            upper_band: raw.upper,
            lower_band: raw.lower,
        }
    }

    /// Advance one bar.
    ///
    /// A close above the previous upper band starts an uptrend, a close below
    /// the previous lower band starts a downtrend; both keep the raw bands.
    /// Otherwise the trend carries over and:
    /// - in an uptrend the lower band never drops below the previous one;
    /// - the upper band is replaced by the previous one unless the bar is in
    ///   an uptrend and its raw upper band rose.
    pub fn step(&self, raw: Bands, close: f64) -> Self {
        if exceeds(Some(close), self.upper_band) {
            return Self {
                in_uptrend: true,
                upper_band: raw.upper,
                lower_band: raw.lower,
            };
        }
        if exceeds(self.lower_band, Some(close)) {
            return Self {
                in_uptrend: false,
                upper_band: raw.upper,
                lower_band: raw.lower,
            };
        }

        let in_uptrend = self.in_uptrend;
        let mut lower_band = raw.lower;
        let mut upper_band = raw.upper;

        if in_uptrend && exceeds(self.lower_band, lower_band) {
            lower_band = self.lower_band;
        }
        // Literal rule: in a downtrend the upper band is always carried over.
        if !(in_uptrend && exceeds(upper_band, self.upper_band)) {
            upper_band = self.upper_band;
        }

        Self {
            in_uptrend,
            upper_band,
            lower_band,
        }
    }
}

/// `a > b`, false if either side is undefined or NaN.
fn exceeds(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a > b)
}

/// Raw bands per bar. Undefined wherever ATR is undefined.
pub fn raw_bands(bars: &[Bar], atr: &[Option<f64>], multiplier: f64) -> Vec<Bands> {
    bars.iter()
        .zip(atr)
        .map(|(bar, atr)| {
            let mid = bar.midprice();
            let offset = atr.map(|a| multiplier * a);
            Bands {
                upper: offset.map(|o| mid + o).filter(|v| !v.is_nan()),
                lower: offset.map(|o| mid - o).filter(|v| !v.is_nan()),
            }
        })
        .collect()
}

/// Fold the transition over the series. `closes` and `raw` are index-aligned;
/// the result has the length of the shorter one.
pub fn trend_states(closes: &[f64], raw: &[Bands]) -> Vec<TrendState> {
    let Some(&first) = raw.first() else {
        return Vec::new();
    };
    if closes.is_empty() {
        return Vec::new();
    }

    let seed = TrendState::seed(first);
    let rest = raw[1..]
        .iter()
        .zip(&closes[1..])
        .scan(seed, |prev, (&bands, &close)| {
            *prev = prev.step(bands, close);
            Some(*prev)
        });

    std::iter::once(seed).chain(rest).collect()
}
