//! Serializable bot configuration.
//!
//! Loaded from TOML; every field has a default so a file only needs what it
//! changes. The trading pair and quote amount usually arrive from the command
//! line and are merged in with [`BotConfig::with_overrides`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use trendpilot_core::domain::{Balances, MarketConstraints, Timeframe, TradingPair};
use trendpilot_core::{IndicatorParams, ParamError, SignalThresholds};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Indicator(#[from] ParamError),

    #[error("no trading pair configured")]
    MissingPair,

    #[error("no quote amount configured")]
    MissingQuoteAmount,

    #[error("live trading needs {0} (set it in [exchange] or the environment)")]
    MissingCredential(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Upper bound on request retries; backoff doubles per attempt.
pub const MAX_RETRIES: u32 = 10;

/// Full bot configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BotConfig {
    /// Pair to trade, e.g. `BTC/USDT`.
    pub pair: Option<TradingPair>,

    /// Quote currency spent per buy.
    pub quote_amount: Option<f64>,

    /// Decision timeframe.
    pub timeframe: Timeframe,

    /// ATR/RSI window length.
    pub period: usize,

    /// Supertrend band multiplier.
    pub multiplier: f64,

    /// Bars fetched per cycle.
    pub window: usize,

    /// Seconds between cycle starts.
    pub poll_interval_secs: u64,

    pub thresholds: SignalThresholds,

    pub exchange: ExchangeConfig,

    pub paper: PaperConfig,

    /// Append log output to this file instead of stdout.
    pub log_file: Option<PathBuf>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            pair: None,
            quote_amount: None,
            timeframe: Timeframe::Hour1,
            period: 15,
            multiplier: 5.0,
            window: 25,
            poll_interval_secs: 60,
            thresholds: SignalThresholds::default(),
            exchange: ExchangeConfig::default(),
            paper: PaperConfig::default(),
            log_file: None,
        }
    }
}

/// Exchange endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ExchangeConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// Minutes requests stay blocked after the endpoint bans or throttles us.
    pub breaker_cooldown_mins: u64,
    /// Falls back to `HUOBI_API_KEY`.
    #[serde(skip_serializing)]
    pub api_key: Option<Secret>,
    /// Falls back to `HUOBI_SECRET_KEY`.
    #[serde(skip_serializing)]
    pub secret_key: Option<Secret>,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.huobi.pro".into(),
            timeout_secs: 30,
            max_retries: 3,
            breaker_cooldown_mins: 10,
            api_key: None,
            secret_key: None,
        }
    }
}

pub const API_KEY_VAR: &str = "HUOBI_API_KEY";
pub const SECRET_KEY_VAR: &str = "HUOBI_SECRET_KEY";

impl ExchangeConfig {
    /// API credentials from the file, else from the environment.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        self.credentials_with(|name| std::env::var(name).ok())
    }

    fn credentials_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Credentials, ConfigError> {
        let resolve = |configured: &Option<Secret>, var: &'static str| {
            configured
                .clone()
                .or_else(|| env(var).map(Secret::new))
                .filter(|secret| !secret.expose().trim().is_empty())
                .ok_or(ConfigError::MissingCredential(var))
        };
        Ok(Credentials {
            api_key: resolve(&self.api_key, API_KEY_VAR)?,
            secret_key: resolve(&self.secret_key, SECRET_KEY_VAR)?,
        })
    }
}

/// A string kept out of `Debug` output and serialized config.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Key pair for signed exchange requests.
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub api_key: Secret,
    pub secret_key: Secret,
}

/// In-memory account used for order fills.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PaperConfig {
    /// Starting free balances by currency code.
    pub balances: Balances,

    /// Fraction of each fill charged as a fee.
    pub fee_rate: f64,

    /// Fixed order limits. When absent they are looked up on the exchange.
    pub constraints: Option<MarketConstraints>,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            balances: Balances::new(),
            fee_rate: 0.002,
            constraints: None,
        }
    }
}

/// Everything one decision cycle reads, already validated.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleContext {
    pub pair: TradingPair,
    pub timeframe: Timeframe,
    pub window: usize,
    pub params: IndicatorParams,
    pub thresholds: SignalThresholds,
    pub quote_amount: f64,
    /// Short config hash tagged onto every cycle's log events.
    pub fingerprint: String,
}

impl BotConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: BotConfig = toml::from_str(content)?;
        // Currency keys are case-insensitive.
        config.paper.balances = config
            .paper
            .balances
            .iter()
            .map(|(currency, amount)| (currency.to_string(), amount))
            .collect();
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Command-line values win over the file.
    pub fn with_overrides(mut self, pair: Option<TradingPair>, quote_amount: Option<f64>) -> Self {
        if pair.is_some() {
            self.pair = pair;
        }
        if quote_amount.is_some() {
            self.quote_amount = quote_amount;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        IndicatorParams::new(self.period, self.multiplier)?;
        if self.window <= self.period {
            return Err(ConfigError::Invalid(format!(
                "window ({}) must be larger than period ({})",
                self.window, self.period
            )));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid("poll_interval_secs must be > 0".into()));
        }
        if self.pair.is_none() {
            return Err(ConfigError::MissingPair);
        }
        match self.quote_amount {
            None => return Err(ConfigError::MissingQuoteAmount),
            Some(q) if !(q > 0.0 && q.is_finite()) => {
                return Err(ConfigError::Invalid(format!(
                    "quote_amount must be positive, got {q}"
                )));
            }
            Some(_) => {}
        }
        let t = self.thresholds;
        if !(0.0..=100.0).contains(&t.oversold)
            || !(0.0..=100.0).contains(&t.overbought)
            || t.oversold >= t.overbought
        {
            return Err(ConfigError::Invalid(format!(
                "thresholds must satisfy 0 <= oversold < overbought <= 100, got {}/{}",
                t.oversold, t.overbought
            )));
        }
        if self.exchange.max_retries > MAX_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "exchange max_retries must be at most {MAX_RETRIES}, got {}",
                self.exchange.max_retries
            )));
        }
        if !(0.0..1.0).contains(&self.paper.fee_rate) {
            return Err(ConfigError::Invalid(format!(
                "paper fee_rate must be in [0, 1), got {}",
                self.paper.fee_rate
            )));
        }
        Ok(())
    }

    /// Deterministic hash of the configuration.
    ///
    /// Two configs with identical settings share a fingerprint, which ties
    /// log lines back to the exact settings that produced them.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn cycle_context(&self) -> Result<CycleContext, ConfigError> {
        self.validate()?;
        let pair = self.pair.clone().ok_or(ConfigError::MissingPair)?;
        let quote_amount = self.quote_amount.ok_or(ConfigError::MissingQuoteAmount)?;
        let mut fingerprint = self.fingerprint();
        fingerprint.truncate(12);
        Ok(CycleContext {
            pair,
            timeframe: self.timeframe,
            window: self.window,
            params: IndicatorParams::new(self.period, self.multiplier)?,
            thresholds: self.thresholds,
            quote_amount,
            fingerprint,
        })
    }
}
