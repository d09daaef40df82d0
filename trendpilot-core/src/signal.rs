//! Signal detection: turn the two most recent indicator rows into a trade action.
//!
//! A decision is only read once the latest row has both ATR and RSI defined
//! and sits at index >= period. Undefined inputs become [`TradeAction::Hold`],
//! never an error.
//!
//! Trigger: the trend flag changed between the two rows, or RSI is outside the
//! oversold/overbought band. Once triggered, the buy check runs first:
//! uptrend or overbought buys, so an overbought bar in a downtrend still buys.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::OrderSide;
use crate::indicators::{IndicatorParams, IndicatorRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

impl TradeAction {
    pub fn side(&self) -> Option<OrderSide> {
        match self {
            TradeAction::Buy => Some(OrderSide::Buy),
            TradeAction::Sell => Some(OrderSide::Sell),
            TradeAction::Hold => None,
        }
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => f.write_str("buy"),
            TradeAction::Sell => f.write_str("sell"),
            TradeAction::Hold => f.write_str("hold"),
        }
    }
}

/// RSI levels that trigger a decision on their own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalThresholds {
    pub overbought: f64,
    pub oversold: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            overbought: 70.0,
            oversold: 30.0,
        }
    }
}

/// Why the detector produced its action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalReason {
    /// The trend flag differs between the previous and the latest row.
    TrendFlip,
    /// RSI above the overbought level.
    Overbought,
    /// RSI below the oversold level.
    Oversold,
    /// Fewer rows than the warmup needs.
    InsufficientWindow,
    /// Latest row has an undefined ATR or RSI.
    Undefined,
    /// Defined inputs, nothing triggered.
    NoTrigger,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalDecision {
    pub action: TradeAction,
    pub reason: SignalReason,
    /// Row the decision was read from, if any.
    pub index: Option<usize>,
}

impl SignalDecision {
    fn hold(reason: SignalReason, index: Option<usize>) -> Self {
        Self {
            action: TradeAction::Hold,
            reason,
            index,
        }
    }
}

/// Decide from the last two rows of a freshly computed window.
pub fn detect(
    rows: &[IndicatorRow],
    params: &IndicatorParams,
    thresholds: &SignalThresholds,
) -> SignalDecision {
    let n = rows.len();
    if n < 2 || n - 1 < params.first_decision_index() {
        return SignalDecision::hold(SignalReason::InsufficientWindow, None);
    }

    let last_index = n - 1;
    let last = &rows[last_index];
    let previous = &rows[last_index - 1];

    let Some(rsi) = last.rsi().filter(|_| last.is_defined()) else {
        return SignalDecision::hold(SignalReason::Undefined, Some(last_index));
    };

    let flipped = last.in_uptrend != previous.in_uptrend;
    let overbought = rsi > thresholds.overbought;
    let oversold = rsi < thresholds.oversold;

    if !(flipped || overbought || oversold) {
        return SignalDecision::hold(SignalReason::NoTrigger, Some(last_index));
    }

    let reason = if flipped {
        SignalReason::TrendFlip
    } else if overbought {
        SignalReason::Overbought
    } else {
        SignalReason::Oversold
    };

    // First match wins: the buy check precedes the sell check.
    let action = if last.in_uptrend || overbought {
        TradeAction::Buy
    } else {
        TradeAction::Sell
    };

    SignalDecision {
        action,
        reason,
        index: Some(last_index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::MomentumRow;
    use chrono::{TimeZone, Utc};

    fn row(in_uptrend: bool, rsi: Option<f64>) -> IndicatorRow {
        IndicatorRow {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            close: 100.0,
            previous_close: Some(99.0),
            true_range: Some(2.0),
            atr: Some(2.0),
            upper_band: Some(106.0),
            lower_band: Some(94.0),
            in_uptrend,
            momentum: MomentumRow {
                rsi,
                ..MomentumRow::default()
            },
        }
    }

    /// Window of `len` rows ending with (previous, last).
    fn window(len: usize, previous: IndicatorRow, last: IndicatorRow) -> Vec<IndicatorRow> {
        let mut rows = vec![previous.clone(); len - 1];
        rows.push(last);
        rows
    }

    fn params() -> IndicatorParams {
        IndicatorParams::new(3, 2.0).unwrap()
    }

    fn decide(rows: &[IndicatorRow]) -> SignalDecision {
        detect(rows, &params(), &SignalThresholds::default())
    }

    #[test]
    fn flip_to_uptrend_buys() {
        let rows = window(5, row(false, Some(50.0)), row(true, Some(55.0)));
        let d = decide(&rows);
        assert_eq!(d.action, TradeAction::Buy);
        assert_eq!(d.reason, SignalReason::TrendFlip);
        assert_eq!(d.index, Some(4));
    }

    #[test]
    fn flip_to_downtrend_sells() {
        let rows = window(5, row(true, Some(50.0)), row(false, Some(45.0)));
        let d = decide(&rows);
        assert_eq!(d.action, TradeAction::Sell);
        assert_eq!(d.reason, SignalReason::TrendFlip);
    }

    #[test]
    fn overbought_in_downtrend_still_buys() {
        let rows = window(5, row(false, Some(60.0)), row(false, Some(75.0)));
        let d = decide(&rows);
        assert_eq!(d.action, TradeAction::Buy);
        assert_eq!(d.reason, SignalReason::Overbought);
    }

    #[test]
    fn oversold_in_uptrend_buys() {
        let rows = window(5, row(true, Some(40.0)), row(true, Some(25.0)));
        let d = decide(&rows);
        assert_eq!(d.action, TradeAction::Buy);
        assert_eq!(d.reason, SignalReason::Oversold);
    }

    #[test]
    fn oversold_in_downtrend_sells() {
        let rows = window(5, row(false, Some(40.0)), row(false, Some(25.0)));
        assert_eq!(decide(&rows).action, TradeAction::Sell);
    }

    #[test]
    fn steady_trend_in_band_holds() {
        let rows = window(5, row(true, Some(50.0)), row(true, Some(55.0)));
        let d = decide(&rows);
        assert_eq!(d.action, TradeAction::Hold);
        assert_eq!(d.reason, SignalReason::NoTrigger);
    }

    #[test]
    fn thresholds_are_exclusive() {
        let rows = window(5, row(true, Some(50.0)), row(true, Some(70.0)));
        assert_eq!(decide(&rows).action, TradeAction::Hold);
        let rows = window(5, row(false, Some(50.0)), row(false, Some(30.0)));
        assert_eq!(decide(&rows).action, TradeAction::Hold);
    }

    #[test]
    fn short_window_holds() {
        let rows = window(3, row(false, Some(50.0)), row(true, Some(90.0)));
        let d = decide(&rows);
        assert_eq!(d.action, TradeAction::Hold);
        assert_eq!(d.reason, SignalReason::InsufficientWindow);
        assert_eq!(decide(&[]).reason, SignalReason::InsufficientWindow);
    }

    #[test]
    fn undefined_rsi_holds_even_on_flip() {
        let rows = window(5, row(false, Some(50.0)), row(true, None));
        let d = decide(&rows);
        assert_eq!(d.action, TradeAction::Hold);
        assert_eq!(d.reason, SignalReason::Undefined);
    }

    #[test]
    fn undefined_atr_holds() {
        let mut last = row(true, Some(90.0));
        last.atr = None;
        let rows = window(5, row(false, Some(50.0)), last);
        assert_eq!(decide(&rows).reason, SignalReason::Undefined);
    }

    #[test]
    fn custom_thresholds() {
        let rows = window(5, row(false, Some(50.0)), row(false, Some(62.0)));
        let tight = SignalThresholds {
            overbought: 60.0,
            oversold: 40.0,
        };
        assert_eq!(detect(&rows, &params(), &tight).action, TradeAction::Buy);
    }

    #[test]
    fn action_maps_to_side() {
        assert_eq!(TradeAction::Buy.side(), Some(OrderSide::Buy));
        assert_eq!(TradeAction::Sell.side(), Some(OrderSide::Sell));
        assert_eq!(TradeAction::Hold.side(), None);
    }
}
