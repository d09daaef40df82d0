//! Candle timeframe labels (`1m`, `1h`, `1d`, ...).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Timeframe {
    Minute1,
    Minute5,
    Minute15,
    Minute30,
    Hour1,
    Hour4,
    Day1,
    Week1,
    Month1,
    Year1,
}

#[derive(Debug, Error, PartialEq)]
#[error("unknown timeframe '{0}' (expected one of 1m, 5m, 15m, 30m, 1h, 4h, 1d, 1w, 1M, 1y)")]
pub struct TimeframeError(pub String);

impl Timeframe {
    pub const ALL: [Timeframe; 10] = [
        Timeframe::Minute1,
        Timeframe::Minute5,
        Timeframe::Minute15,
        Timeframe::Minute30,
        Timeframe::Hour1,
        Timeframe::Hour4,
        Timeframe::Day1,
        Timeframe::Week1,
        Timeframe::Month1,
        Timeframe::Year1,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::Minute1 => "1m",
            Timeframe::Minute5 => "5m",
            Timeframe::Minute15 => "15m",
            Timeframe::Minute30 => "30m",
            Timeframe::Hour1 => "1h",
            Timeframe::Hour4 => "4h",
            Timeframe::Day1 => "1d",
            Timeframe::Week1 => "1w",
            Timeframe::Month1 => "1M",
            Timeframe::Year1 => "1y",
        }
    }

    /// Nominal bar length. Months and years use 30 and 365 days.
    pub fn duration(&self) -> Duration {
        const MINUTE: u64 = 60;
        const HOUR: u64 = 60 * MINUTE;
        const DAY: u64 = 24 * HOUR;
        let secs = match self {
            Timeframe::Minute1 => MINUTE,
            Timeframe::Minute5 => 5 * MINUTE,
            Timeframe::Minute15 => 15 * MINUTE,
            Timeframe::Minute30 => 30 * MINUTE,
            Timeframe::Hour1 => HOUR,
            Timeframe::Hour4 => 4 * HOUR,
            Timeframe::Day1 => DAY,
            Timeframe::Week1 => 7 * DAY,
            Timeframe::Month1 => 30 * DAY,
            Timeframe::Year1 => 365 * DAY,
        };
        Duration::from_secs(secs)
    }
}

impl FromStr for Timeframe {
    type Err = TimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Timeframe::ALL
            .into_iter()
            .find(|tf| tf.label() == trimmed)
            .ok_or_else(|| TimeframeError(s.to_string()))
    }
}

impl TryFrom<String> for Timeframe {
    type Error = TimeframeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Timeframe> for String {
    fn from(tf: Timeframe) -> Self {
        tf.label().to_string()
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
