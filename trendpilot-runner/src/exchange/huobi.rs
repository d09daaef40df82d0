//! Huobi public REST market data.
//!
//! Bars come from `/market/history/kline`, which answers newest first and
//! includes the bar still forming; both are normalised away here. Order
//! limits come from `/v1/common/symbols`, which publishes precisions as
//! decimal-place counts. Requests retry with exponential backoff behind the
//! shared circuit breaker.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use trendpilot_core::domain::{
    step_from_decimal_places, Bar, BarSeries, MarketConstraints, Timeframe, TradingPair,
};
use trendpilot_core::{DataError, MarketDataSource};

use super::circuit_breaker::CircuitBreaker;
use crate::config::ExchangeConfig;

/// Largest `size` the kline endpoint accepts.
const MAX_KLINES: usize = 2000;

/// Response wrapper shared by every Huobi endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct Envelope<T> {
    pub(super) status: String,
    pub(super) data: Option<T>,
    #[serde(rename = "err-code")]
    err_code: Option<String>,
    #[serde(rename = "err-msg")]
    err_msg: Option<String>,
}

impl<T> Envelope<T> {
    fn into_data(self, pair: &TradingPair) -> Result<T, DataError> {
        if self.status == "ok" {
            return self
                .data
                .ok_or_else(|| DataError::ResponseFormatChanged("status ok without data".into()));
        }
        let unknown_symbol = self.err_code.as_deref() == Some("invalid-parameter")
            && self.err_msg.as_deref().is_some_and(|m| m.contains("symbol"));
        if unknown_symbol {
            return Err(DataError::UnknownPair {
                pair: pair.to_string(),
            });
        }
        Err(DataError::Rejected(self.error_text()))
    }

    /// `code: message` of a failed response.
    pub(super) fn error_text(&self) -> String {
        format!(
            "{}: {}",
            self.err_code.as_deref().unwrap_or_default(),
            self.err_msg.as_deref().unwrap_or_default()
        )
    }
}

#[derive(Debug, Deserialize)]
struct Kline {
    /// Bar open time, epoch seconds.
    id: i64,
    open: f64,
    close: f64,
    low: f64,
    high: f64,
    /// Traded volume in the base currency.
    #[serde(default)]
    amount: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SymbolInfo {
    base_currency: String,
    quote_currency: String,
    price_precision: u32,
    amount_precision: u32,
    min_order_amt: Option<f64>,
    max_order_amt: Option<f64>,
    limit_order_min_order_amt: Option<f64>,
    limit_order_max_order_amt: Option<f64>,
}

pub struct HuobiMarketData {
    client: reqwest::blocking::Client,
    base_url: String,
    circuit_breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
}

impl HuobiMarketData {
    pub fn new(config: &ExchangeConfig) -> Result<Self, DataError> {
        let breaker = CircuitBreaker::new(Duration::from_secs(config.breaker_cooldown_mins * 60));
        Self::with_breaker(config, Arc::new(breaker))
    }

    pub fn with_breaker(
        config: &ExchangeConfig,
        circuit_breaker: Arc<CircuitBreaker>,
    ) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("trendpilot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            circuit_breaker,
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(500),
        })
    }

    /// Order limits and rounding steps for `pair`.
    pub fn market_constraints(&self, pair: &TradingPair) -> Result<MarketConstraints, DataError> {
        let symbols: Vec<SymbolInfo> = self.get("/v1/common/symbols", &[])?.into_data(pair)?;
        let info = symbols
            .iter()
            .find(|s| {
                s.base_currency.eq_ignore_ascii_case(pair.base())
                    && s.quote_currency.eq_ignore_ascii_case(pair.quote())
            })
            .ok_or_else(|| DataError::UnknownPair {
                pair: pair.to_string(),
            })?;
        constraints_from(info)
    }

    fn klines(
        &self,
        pair: &TradingPair,
        timeframe: Timeframe,
        size: usize,
    ) -> Result<Vec<Kline>, DataError> {
        let query = [
            ("symbol", market_symbol(pair)),
            ("period", kline_period(timeframe).to_string()),
            ("size", size.clamp(1, MAX_KLINES).to_string()),
        ];
        self.get("/market/history/kline", &query)?.into_data(pair)
    }

    /// GET with retry and circuit breaker logic.
    fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Envelope<T>, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerOpen);
        }

        let url = format!("{}{path}", self.base_url);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = backoff_delay(self.base_delay, attempt);
                warn!(path, attempt, delay_ms = delay.as_millis() as u64, "retrying request");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerOpen);
            }

            let resp = match self.client.get(&url).query(query).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    self.circuit_breaker.record_failure();
                    last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(DataError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();
            if status == reqwest::StatusCode::FORBIDDEN {
                self.circuit_breaker.trip();
                return Err(DataError::CircuitBreakerOpen);
            }
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.circuit_breaker.record_failure();
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                last_error = Some(DataError::RateLimited {
                    retry_after_secs: retry_after,
                });
                continue;
            }
            if !status.is_success() {
                self.circuit_breaker.record_failure();
                last_error = Some(DataError::Other(format!("HTTP {status} for {path}")));
                continue;
            }

            let envelope: Envelope<T> = resp.json().map_err(|e| {
                DataError::ResponseFormatChanged(format!("failed to parse {path} response: {e}"))
            })?;
            self.circuit_breaker.record_success();
            debug!(path, status = %envelope.status, "response received");
            return Ok(envelope);
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

impl MarketDataSource for HuobiMarketData {
    fn name(&self) -> &str {
        "huobi"
    }

    fn fetch_bars(
        &self,
        pair: &TradingPair,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<BarSeries, DataError> {
        // One extra for the bar still forming, which is dropped.
        let klines = self.klines(pair, timeframe, limit + 1)?;
        completed_bars(pair, klines, limit)
    }

    fn fetch_latest_price(&self, pair: &TradingPair) -> Result<f64, DataError> {
        let klines = self.klines(pair, Timeframe::Minute1, 2)?;
        last_completed_close(pair, &klines)
    }
}

/// Delay before retry number `attempt` (1-based): `base`, `2 * base`, `4 * base`, ...
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
}

/// Close of the newest completed bar in a newest-first kline list.
fn last_completed_close(pair: &TradingPair, klines: &[Kline]) -> Result<f64, DataError> {
    klines
        .get(1)
        .map(|k| k.close)
        .ok_or_else(|| DataError::NoData {
            pair: pair.to_string(),
        })
}

/// `BTC/USDT` → `btcusdt`.
pub(super) fn market_symbol(pair: &TradingPair) -> String {
    format!("{}{}", pair.base(), pair.quote()).to_ascii_lowercase()
}

fn kline_period(timeframe: Timeframe) -> &'static str {
    match timeframe {
        Timeframe::Minute1 => "1min",
        Timeframe::Minute5 => "5min",
        Timeframe::Minute15 => "15min",
        Timeframe::Minute30 => "30min",
        Timeframe::Hour1 => "60min",
        Timeframe::Hour4 => "4hour",
        Timeframe::Day1 => "1day",
        Timeframe::Week1 => "1week",
        Timeframe::Month1 => "1mon",
        Timeframe::Year1 => "1year",
    }
}

/// Chronological bars without the in-progress newest one, at most `limit`.
fn completed_bars(
    pair: &TradingPair,
    klines: Vec<Kline>,
    limit: usize,
) -> Result<BarSeries, DataError> {
    let mut bars = klines
        .into_iter()
        .rev()
        .map(|k| {
            let timestamp = chrono::DateTime::from_timestamp(k.id, 0).ok_or_else(|| {
                DataError::ResponseFormatChanged(format!("invalid kline timestamp: {}", k.id))
            })?;
            Ok(Bar {
                timestamp,
                open: k.open,
                high: k.high,
                low: k.low,
                close: k.close,
                volume: k.amount,
            })
        })
        .collect::<Result<Vec<_>, DataError>>()?;
    bars.pop();

    if bars.is_empty() {
        return Err(DataError::NoData {
            pair: pair.to_string(),
        });
    }
    let series =
        BarSeries::new(bars).map_err(|e| DataError::ResponseFormatChanged(e.to_string()))?;
    Ok(series.tail(limit))
}

fn constraints_from(info: &SymbolInfo) -> Result<MarketConstraints, DataError> {
    let missing = |field: &str| {
        DataError::ResponseFormatChanged(format!(
            "symbol {}{} has no {field}",
            info.base_currency, info.quote_currency
        ))
    };
    let min_amount = info
        .limit_order_min_order_amt
        .or(info.min_order_amt)
        .ok_or_else(|| missing("minimum order amount"))?;
    let max_amount = info
        .limit_order_max_order_amt
        .or(info.max_order_amt)
        .ok_or_else(|| missing("maximum order amount"))?;

    Ok(MarketConstraints {
        min_amount,
        max_amount,
        price_precision: step_from_decimal_places(info.price_precision),
        amount_precision: step_from_decimal_places(info.amount_precision),
    })
}
