//! Relative Strength Index (RSI).
//!
//! Uses simple moving averages of gains and losses.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Averages are defined from index `period` (the first bar has no change).
//! Edge cases: avg_loss == 0 < avg_gain → RS infinite, RSI = 100;
//! avg_loss == avg_gain == 0 → RS and RSI undefined.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::indicators::sma::rolling_mean;

/// Momentum fields for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MomentumRow {
    pub change: Option<f64>,
    pub gain: Option<f64>,
    pub loss: Option<f64>,
    pub avg_gain: Option<f64>,
    pub avg_loss: Option<f64>,
    /// `f64::INFINITY` when there were gains and no losses.
    pub relative_strength: Option<f64>,
    pub rsi: Option<f64>,
}

pub fn momentum(bars: &[Bar], period: usize) -> Vec<MomentumRow> {
    let changes: Vec<Option<f64>> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let prev = bars[i.checked_sub(1)?].close;
            let change = bar.close - prev;
            (!change.is_nan()).then_some(change)
        })
        .collect();

    let gains: Vec<Option<f64>> = changes.iter().map(|c| c.map(|c| c.max(0.0))).collect();
    let losses: Vec<Option<f64>> = changes.iter().map(|c| c.map(|c| (-c).max(0.0))).collect();
    let avg_gains = rolling_mean(&gains, period);
    let avg_losses = rolling_mean(&losses, period);

    (0..bars.len())
        .map(|i| {
            let relative_strength = match (avg_gains[i], avg_losses[i]) {
                (Some(g), Some(l)) => relative_strength(g, l),
                _ => None,
            };
            MomentumRow {
                change: changes[i],
                gain: gains[i],
                loss: losses[i],
                avg_gain: avg_gains[i],
                avg_loss: avg_losses[i],
                relative_strength,
                rsi: relative_strength.map(rsi_from_rs),
            }
        })
        .collect()
}

/// `avg_gain / avg_loss`, infinite when only gains occurred, undefined when
/// nothing moved.
pub fn relative_strength(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if avg_loss == 0.0 {
        if avg_gain > 0.0 {
            Some(f64::INFINITY)
        } else {
            None
        }
    } else {
        Some(avg_gain / avg_loss)
    }
}

pub fn rsi_from_rs(rs: f64) -> f64 {
    if rs.is_infinite() {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + rs)
    }
}
