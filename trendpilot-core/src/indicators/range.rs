//! True Range and Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! ATR is the simple moving average of TR over `period` bars.
//! The first bar has no previous close, so its TR is just high-low and ATR
//! first becomes defined at index period-1.

use crate::domain::Bar;
use crate::indicators::sma::rolling_mean;

/// Compute the True Range series from bars.
/// TR[0] = high[0] - low[0] (no previous close).
/// TR[t] = max(high[t]-low[t], |high[t]-close[t-1]|, |low[t]-close[t-1]|).
/// A void bar, or a void previous close, leaves TR undefined.
pub fn true_range(bars: &[Bar]) -> Vec<Option<f64>> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            if bar.high.is_nan() || bar.low.is_nan() {
                return None;
            }
            let spread = bar.high - bar.low;
            match i.checked_sub(1).map(|p| bars[p].close) {
                None => Some(spread),
                Some(pc) if pc.is_nan() => None,
                Some(pc) => Some(spread.max((bar.high - pc).abs()).max((bar.low - pc).abs())),
            }
        })
        .collect()
}

/// Simple moving average of the True Range series.
pub fn average_true_range(true_range: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    rolling_mean(true_range, period)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc_bars, DEFAULT_EPSILON};

    #[test]
    fn true_range_basic() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),  // TR = 105-95 = 10
            (102.0, 108.0, 100.0, 106.0), // TR = max(8, |108-102|, |100-102|) = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = max(9, |107-106|, |98-106|) = 9
        ]);
        let tr = true_range(&bars);
        assert_approx(tr[0].unwrap(), 10.0, DEFAULT_EPSILON);
        assert_approx(tr[1].unwrap(), 8.0, DEFAULT_EPSILON);
        assert_approx(tr[2].unwrap(), 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let bars = make_ohlc_bars(&[
            (98.0, 102.0, 97.0, 100.0),
            (110.0, 115.0, 108.0, 112.0), // TR = max(7, |115-100|, |108-100|) = 15
        ]);
        let tr = true_range(&bars);
        assert_approx(tr[1].unwrap(), 15.0, DEFAULT_EPSILON);
    }

    #[test]
    fn true_range_gap_down() {
        let bars = make_ohlc_bars(&[
            (98.0, 102.0, 97.0, 100.0),
            (90.0, 92.0, 88.0, 91.0), // TR = max(4, |92-100|, |88-100|) = 12
        ]);
        let tr = true_range(&bars);
        assert_approx(tr[1].unwrap(), 12.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_period_3() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),  // TR = 10
            (102.0, 108.0, 100.0, 106.0), // TR = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = 9
            (99.0, 103.0, 97.0, 101.0),   // TR = 6
            (101.0, 106.0, 100.0, 105.0), // TR = 6
        ]);
        let atr = average_true_range(&true_range(&bars), 3);

        assert_eq!(atr[0], None);
        assert_eq!(atr[1], None);
        assert_approx(atr[2].unwrap(), 27.0 / 3.0, DEFAULT_EPSILON);
        assert_approx(atr[3].unwrap(), 23.0 / 3.0, DEFAULT_EPSILON);
        assert_approx(atr[4].unwrap(), 21.0 / 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn void_bar_leaves_its_windows_undefined() {
        let mut bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0),
            (106.0, 107.0, 98.0, 99.0),
            (99.0, 103.0, 97.0, 101.0),
        ]);
        bars[1].high = f64::NAN;
        let atr = average_true_range(&true_range(&bars), 2);
        assert_eq!(atr[1], None);
        assert_eq!(atr[2], None);
        assert!(atr[3].is_some());
    }
}
