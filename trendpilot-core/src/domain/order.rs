//! Order requests sent to an exchange and the records it returns.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::market::TradingPair;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

/// Only market orders are placed; the price travels along as a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
}

/// A concrete order ready for an order sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub pair: TradingPair,
    pub order_type: OrderType,
    pub side: OrderSide,
    /// Base-currency amount, already rounded to the exchange step.
    pub amount: f64,
    /// Quote-currency reference price, already rounded to the exchange tick.
    pub price: f64,
}

/// Acknowledgement from an order sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: String,
    /// Exchange response as received, kept for the log.
    pub raw: serde_json::Value,
}
