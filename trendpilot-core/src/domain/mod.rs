//! Domain types for trendpilot

pub mod bar;
pub mod market;
pub mod order;
pub mod timeframe;

pub use bar::{Bar, BarError, BarSeries};
pub use market::{
    round_cost_down, round_down, step_from_decimal_places, Balances, MarketConstraints, PairError,
    RoundingError, TradingPair,
};
pub use order::{OrderRecord, OrderRequest, OrderSide, OrderType};
pub use timeframe::{Timeframe, TimeframeError};
