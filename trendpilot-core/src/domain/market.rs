//! Trading pair, free balances, and exchange order constraints.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A `BASE/QUOTE` trading pair, e.g. `BTC/USDT`.
///
/// Both legs are stored upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TradingPair {
    base: String,
    quote: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum PairError {
    #[error("trading pair '{0}' must look like BASE/QUOTE")]
    Malformed(String),
}

impl TradingPair {
    pub fn new(base: &str, quote: &str) -> Result<Self, PairError> {
        let base = base.trim();
        let quote = quote.trim();
        let valid = |leg: &str| !leg.is_empty() && leg.chars().all(|c| c.is_ascii_alphanumeric());
        if !valid(base) || !valid(quote) {
            return Err(PairError::Malformed(format!("{base}/{quote}")));
        }
        Ok(Self {
            base: base.to_ascii_uppercase(),
            quote: quote.to_ascii_uppercase(),
        })
    }

    /// The asset bought or sold.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// The currency the base asset is priced and paid in.
    pub fn quote(&self) -> &str {
        &self.quote
    }
}

impl FromStr for TradingPair {
    type Err = PairError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((base, quote)) => Self::new(base, quote),
            None => Err(PairError::Malformed(s.to_string())),
        }
    }
}

impl TryFrom<String> for TradingPair {
    type Error = PairError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TradingPair> for String {
    fn from(pair: TradingPair) -> Self {
        pair.to_string()
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Free (not locked in open orders) balances keyed by upper-cased currency code.
///
/// Deserialization keeps keys as written; build through [`Balances::set`] or
/// `collect()` to normalise them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balances {
    free: BTreeMap<String, f64>,
}

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, currency: &str, amount: f64) -> Self {
        self.set(currency, amount);
        self
    }

    pub fn set(&mut self, currency: &str, amount: f64) {
        self.free.insert(currency.to_ascii_uppercase(), amount);
    }

    /// Free amount of `currency`; a currency the account has never held reads as zero.
    pub fn free(&self, currency: &str) -> f64 {
        self.free
            .get(&currency.to_ascii_uppercase())
            .copied()
            .unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.free.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, f64)> for Balances {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut balances = Balances::new();
        for (currency, amount) in iter {
            balances.set(&currency, amount);
        }
        balances
    }
}

/// Exchange-imposed limits for orders on one trading pair.
///
/// Precisions are rounding granularities (e.g. `0.01`), not decimal-place counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketConstraints {
    pub min_amount: f64,
    pub max_amount: f64,
    pub price_precision: f64,
    pub amount_precision: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum RoundingError {
    #[error("cannot round non-finite value {0}")]
    NonFinite(f64),

    #[error("rounding step must be positive, got {0}")]
    InvalidStep(f64),

    #[error("value {value} is out of decimal range for step {step}")]
    OutOfRange { value: f64, step: f64 },
}

impl MarketConstraints {
    pub fn round_price_down(&self, price: f64) -> Result<f64, RoundingError> {
        round_down(price, self.price_precision)
    }

    pub fn round_amount_down(&self, amount: f64) -> Result<f64, RoundingError> {
        round_down(amount, self.amount_precision)
    }

    /// Exclusive bounds check against the exchange's min/max order amount.
    pub fn amount_in_bounds(&self, amount: f64) -> bool {
        self.min_amount < amount && amount < self.max_amount
    }
}

/// Convert precision expressed as decimal places (as exchanges often publish it)
/// into a granularity: `2` becomes `0.01`.
pub fn step_from_decimal_places(places: u32) -> f64 {
    decimal_to_f64(Decimal::new(1, places.min(28))).unwrap_or(0.0)
}

/// Round `value` toward negative infinity to a multiple of `step`.
///
/// Works in exact decimal arithmetic on the shortest decimal representation of
/// each float, so `123.456` with step `0.01` gives exactly `123.45`.
pub fn round_down(value: f64, step: f64) -> Result<f64, RoundingError> {
    let value_dec = to_decimal(value)?;
    let step_dec = to_decimal(step)?;
    if step_dec <= Decimal::ZERO {
        return Err(RoundingError::InvalidStep(step));
    }

    floor_to_step(value_dec, step_dec)
        .and_then(decimal_to_f64)
        .ok_or(RoundingError::OutOfRange { value, step })
}

/// `amount * price` computed exactly, then rounded down to a multiple of `step`.
///
/// Exchanges that size market buys by quote spend take this instead of an amount.
pub fn round_cost_down(amount: f64, price: f64, step: f64) -> Result<f64, RoundingError> {
    let step_dec = to_decimal(step)?;
    if step_dec <= Decimal::ZERO {
        return Err(RoundingError::InvalidStep(step));
    }
    let out_of_range = RoundingError::OutOfRange {
        value: amount * price,
        step,
    };
    to_decimal(amount)?
        .checked_mul(to_decimal(price)?)
        .and_then(|cost| floor_to_step(cost, step_dec))
        .and_then(decimal_to_f64)
        .ok_or(out_of_range)
}

fn floor_to_step(value: Decimal, step: Decimal) -> Option<Decimal> {
    value.checked_div(step)?.floor().checked_mul(step)
}

// Parsing the decimal string yields the nearest f64, which `Decimal::to_f64` does not promise.
fn decimal_to_f64(value: Decimal) -> Option<f64> {
    value.to_string().parse().ok()
}

fn to_decimal(value: f64) -> Result<Decimal, RoundingError> {
    if !value.is_finite() {
        return Err(RoundingError::NonFinite(value));
    }
    Decimal::from_str(&value.to_string()).map_err(|_| RoundingError::OutOfRange {
        value,
        step: f64::NAN,
    })
}
