//! Collaborator contracts for market data, account state, and order submission.
//!
//! The decision cycle depends only on these traits; concrete exchange clients,
//! file replays, and paper accounts live in the runner crate and are injected
//! per cycle. Calls are synchronous and treated as atomic: a result or a failure.

use thiserror::Error;

use crate::domain::{
    Balances, BarSeries, MarketConstraints, OrderRecord, OrderRequest, Timeframe, TradingPair,
};

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("hard stop: provider requests blocked (circuit breaker open)")]
    CircuitBreakerOpen,

    #[error("provider rejected the request: {0}")]
    Rejected(String),

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("unknown trading pair: {pair}")]
    UnknownPair { pair: String },

    #[error("no bars available for {pair}")]
    NoData { pair: String },

    #[error("data file error: {0}")]
    Io(String),

    #[error("data error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("order rejected: {0}")]
    Rejected(String),

    #[error("order endpoint unreachable: {0}")]
    Unreachable(String),
}

/// Bars and prices for a trading pair.
pub trait MarketDataSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Up to `limit` completed bars, oldest first. The bar still forming at
    /// fetch time is excluded.
    fn fetch_bars(
        &self,
        pair: &TradingPair,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<BarSeries, DataError>;

    /// Close of the most recent completed one-minute bar.
    fn fetch_latest_price(&self, pair: &TradingPair) -> Result<f64, DataError>;
}

/// Free balances and per-pair order limits.
pub trait AccountSource: Send + Sync {
    fn fetch_free_balances(&self) -> Result<Balances, DataError>;

    fn fetch_market_constraints(&self, pair: &TradingPair) -> Result<MarketConstraints, DataError>;
}

/// Where planned orders are sent.
pub trait OrderSink: Send + Sync {
    fn submit_order(&self, order: &OrderRequest) -> Result<OrderRecord, SubmissionError>;
}
