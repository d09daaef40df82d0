//! trendpilot runner: configuration, decision cycle, scheduling, collaborators.
//!
//! This crate builds on `trendpilot-core` to provide:
//! - TOML configuration with defaults, validation, and fingerprinting
//! - The decision cycle wiring core logic to injected collaborators
//! - A fixed-interval scheduler that survives cycle failures
//! - Logging initialisation (`tracing-subscriber`)
//! - Huobi market data and signed spot trading, CSV bar replay, and a paper account
//! - Ctrl-C handling that stops the scheduler between cycles

pub mod config;
pub mod cycle;
pub mod exchange;
pub mod logging;
pub mod scheduler;
pub mod shutdown;

pub use config::{
    BotConfig, ConfigError, Credentials, CycleContext, ExchangeConfig, PaperConfig, Secret,
};
pub use cycle::{run_cycle, Collaborators, CycleError, CycleOutcome};
pub use exchange::{CircuitBreaker, CsvMarketData, HuobiAccount, HuobiMarketData, PaperAccount};
pub use logging::LoggingError;
pub use scheduler::{Scheduler, SchedulerSummary};
pub use shutdown::stop_on_interrupt;
