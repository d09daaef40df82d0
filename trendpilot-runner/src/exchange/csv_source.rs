//! Bar replay from a CSV file.
//!
//! Expected header: `timestamp,open,high,low,close,volume`. Timestamps are
//! RFC 3339 strings or epoch milliseconds. The file is re-read on every
//! fetch, so a file that is appended to between cycles is picked up.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use trendpilot_core::domain::{Bar, BarSeries, Timeframe, TradingPair};
use trendpilot_core::{DataError, MarketDataSource};

#[derive(Debug, Deserialize)]
struct CsvBar {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

pub struct CsvMarketData {
    path: PathBuf,
    name: String,
}

impl CsvMarketData {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = format!("csv:{}", path.display());
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every bar in the file, validated as a chronological series of sane bars.
    pub fn load(&self) -> Result<BarSeries, DataError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| DataError::Io(format!("{}: {e}", self.path.display())))?;

        let bars = reader
            .deserialize::<CsvBar>()
            .enumerate()
            .map(|(i, record)| {
                let record = record.map_err(|e| {
                    DataError::Io(format!("{} row {}: {e}", self.path.display(), i + 1))
                })?;
                let bar = Bar {
                    timestamp: parse_timestamp(&record.timestamp)?,
                    open: record.open,
                    high: record.high,
                    low: record.low,
                    close: record.close,
                    volume: record.volume,
                };
                if !bar.is_sane() {
                    let problem = if bar.is_void() { "void" } else { "inconsistent" };
                    return Err(DataError::Io(format!(
                        "{} row {}: {problem} OHLCV values",
                        self.path.display(),
                        i + 1
                    )));
                }
                Ok(bar)
            })
            .collect::<Result<Vec<_>, DataError>>()?;

        BarSeries::new(bars).map_err(|e| DataError::Io(format!("{}: {e}", self.path.display())))
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, DataError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    value
        .parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| DataError::Io(format!("unrecognised timestamp '{value}'")))
}

impl MarketDataSource for CsvMarketData {
    fn name(&self) -> &str {
        &self.name
    }

    /// The file holds one pair at one timeframe; both arguments are informational.
    fn fetch_bars(
        &self,
        pair: &TradingPair,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<BarSeries, DataError> {
        let series = self.load()?;
        if series.is_empty() {
            return Err(DataError::NoData {
                pair: pair.to_string(),
            });
        }
        debug!(%pair, %timeframe, available = series.len(), limit, "replaying csv bars");
        Ok(series.tail(limit))
    }

    fn fetch_latest_price(&self, pair: &TradingPair) -> Result<f64, DataError> {
        self.load()?
            .last()
            .map(|bar| bar.close)
            .ok_or_else(|| DataError::NoData {
                pair: pair.to_string(),
            })
    }
}
