//! Concrete collaborators: Huobi market data and spot account, CSV replay, paper fills.

pub mod circuit_breaker;
pub mod csv_source;
pub mod huobi;
pub mod huobi_account;
pub mod paper;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use csv_source::CsvMarketData;
pub use huobi::HuobiMarketData;
pub use huobi_account::HuobiAccount;
pub use paper::PaperAccount;
