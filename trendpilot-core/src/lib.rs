//! trendpilot core: indicators, signal detection, and order planning.
//!
//! This crate contains the decision logic of the bot and no I/O:
//! - Domain types (bars, trading pairs, balances, market constraints, orders)
//! - Indicator pipeline: True Range / ATR, Supertrend bands and trend flag, RSI
//! - Signal detector turning the latest indicator rows into buy / sell / hold
//! - Order planner sizing and validating an order against exchange limits
//! - Collaborator traits for market data, account state, and order submission

pub mod domain;
pub mod indicators;
pub mod planner;
pub mod ports;
pub mod signal;

pub use indicators::{compute_rows, IndicatorParams, IndicatorRow, ParamError};
pub use planner::{plan_order, ConstraintViolation, OrderPlan, PlanError, PlanRequest, PlanVerdict};
pub use ports::{AccountSource, DataError, MarketDataSource, OrderSink, SubmissionError};
pub use signal::{detect, SignalDecision, SignalReason, SignalThresholds, TradeAction};
