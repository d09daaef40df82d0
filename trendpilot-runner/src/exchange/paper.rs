//! In-memory paper account.
//!
//! Serves free balances and fixed order limits, and fills market orders
//! immediately at the request's reference price, charging a proportional fee
//! in the currency received.

use serde_json::json;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::info;

use trendpilot_core::domain::{
    Balances, MarketConstraints, OrderRecord, OrderRequest, OrderSide, TradingPair,
};
use trendpilot_core::{AccountSource, DataError, OrderSink, SubmissionError};

#[derive(Debug)]
struct Ledger {
    balances: Balances,
    fills: u64,
}

#[derive(Debug)]
pub struct PaperAccount {
    ledger: Mutex<Ledger>,
    constraints: MarketConstraints,
    fee_rate: f64,
}

impl PaperAccount {
    pub fn new(balances: Balances, constraints: MarketConstraints) -> Self {
        Self {
            ledger: Mutex::new(Ledger { balances, fills: 0 }),
            constraints,
            fee_rate: 0.0,
        }
    }

    pub fn with_fee_rate(mut self, fee_rate: f64) -> Self {
        self.fee_rate = fee_rate;
        self
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn balances(&self) -> Balances {
        self.ledger().balances.clone()
    }

    pub fn fills(&self) -> u64 {
        self.ledger().fills
    }
}

impl AccountSource for PaperAccount {
    fn fetch_free_balances(&self) -> Result<Balances, DataError> {
        Ok(self.balances())
    }

    fn fetch_market_constraints(&self, _pair: &TradingPair) -> Result<MarketConstraints, DataError> {
        Ok(self.constraints)
    }
}

impl OrderSink for PaperAccount {
    fn submit_order(&self, order: &OrderRequest) -> Result<OrderRecord, SubmissionError> {
        if !(order.amount > 0.0 && order.amount.is_finite()) {
            return Err(SubmissionError::Rejected(format!(
                "amount must be positive, got {}",
                order.amount
            )));
        }
        if !(order.price > 0.0 && order.price.is_finite()) {
            return Err(SubmissionError::Rejected(format!(
                "price must be positive, got {}",
                order.price
            )));
        }

        let base = order.pair.base();
        let quote = order.pair.quote();
        let cost = order.amount * order.price;
        let mut ledger = self.ledger();
        let base_free = ledger.balances.free(base);
        let quote_free = ledger.balances.free(quote);

        let (fee, fee_currency) = match order.side {
            OrderSide::Buy => {
                if cost > quote_free {
                    return Err(SubmissionError::Rejected(format!(
                        "insufficient {quote}: need {cost}, have {quote_free}"
                    )));
                }
                let fee = order.amount * self.fee_rate;
                ledger.balances.set(quote, quote_free - cost);
                ledger.balances.set(base, base_free + order.amount - fee);
                (fee, base)
            }
            OrderSide::Sell => {
                if order.amount > base_free {
                    return Err(SubmissionError::Rejected(format!(
                        "insufficient {base}: need {}, have {base_free}",
                        order.amount
                    )));
                }
                let fee = cost * self.fee_rate;
                ledger.balances.set(base, base_free - order.amount);
                ledger.balances.set(quote, quote_free + cost - fee);
                (fee, quote)
            }
        };

        let sequence = ledger.fills;
        ledger.fills += 1;
        drop(ledger);

        let id = order_id(order, sequence);
        info!(order_id = %id, side = %order.side, amount = order.amount, price = order.price, "paper fill");
        let raw = json!({
            "id": id,
            "symbol": order.pair.to_string(),
            "type": "market",
            "side": order.side,
            "amount": order.amount,
            "price": order.price,
            "cost": cost,
            "filled": order.amount,
            "status": "closed",
            "fee": { "currency": fee_currency, "cost": fee },
        });
        Ok(OrderRecord { id, raw })
    }
}

/// Content hash of the order plus its fill sequence number.
fn order_id(order: &OrderRequest, sequence: u64) -> String {
    let key = format!(
        "{}|{}|{}|{}|{}",
        order.pair, order.side, order.amount, order.price, sequence
    );
    let mut id = blake3::hash(key.as_bytes()).to_hex().to_string();
    id.truncate(16);
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use trendpilot_core::domain::OrderType;

    fn constraints() -> MarketConstraints {
        MarketConstraints {
            min_amount: 0.001,
            max_amount: 100.0,
            price_precision: 0.01,
            amount_precision: 0.0001,
        }
    }

    fn order(side: OrderSide, amount: f64, price: f64) -> OrderRequest {
        OrderRequest {
            pair: "ETH/USDT".parse().unwrap(),
            order_type: OrderType::Market,
            side,
            amount,
            price,
        }
    }

    #[test]
    fn buy_moves_quote_into_base() {
        let account = PaperAccount::new(Balances::new().with("USDT", 100.0), constraints());
        let record = account.submit_order(&order(OrderSide::Buy, 0.5, 100.0)).unwrap();
        let balances = account.balances();
        assert_eq!(balances.free("USDT"), 50.0);
        assert_eq!(balances.free("ETH"), 0.5);
        assert_eq!(record.id.len(), 16);
        assert_eq!(record.raw["side"], "buy");
        assert_eq!(record.raw["status"], "closed");
    }

    #[test]
    fn sell_charges_fee_in_quote() {
        let account =
            PaperAccount::new(Balances::new().with("ETH", 2.0), constraints()).with_fee_rate(0.01);
        account.submit_order(&order(OrderSide::Sell, 2.0, 50.0)).unwrap();
        let balances = account.balances();
        assert_eq!(balances.free("ETH"), 0.0);
        assert_eq!(balances.free("USDT"), 99.0);
    }

    #[test]
    fn overspending_is_rejected_without_side_effects() {
        let account = PaperAccount::new(Balances::new().with("USDT", 10.0), constraints());
        let result = account.submit_order(&order(OrderSide::Buy, 1.0, 20.0));
        assert!(matches!(result, Err(SubmissionError::Rejected(_))));
        assert_eq!(account.balances().free("USDT"), 10.0);
        assert_eq!(account.fills(), 0);
    }

    #[test]
    fn repeated_identical_orders_get_distinct_ids() {
        let account = PaperAccount::new(Balances::new().with("USDT", 100.0), constraints());
        let a = account.submit_order(&order(OrderSide::Buy, 0.1, 10.0)).unwrap();
        let b = account.submit_order(&order(OrderSide::Buy, 0.1, 10.0)).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(account.fills(), 2);
    }

    #[test]
    fn serves_static_constraints() {
        let account = PaperAccount::new(Balances::new(), constraints());
        let pair = "BTC/USDT".parse().unwrap();
        assert_eq!(account.fetch_market_constraints(&pair).unwrap(), constraints());
    }
}
