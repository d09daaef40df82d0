//! Order planning: size a trade action into an exchange-compliant order.
//!
//! Planning is a pure function of its inputs. Price and amount are always
//! rounded down to the exchange granularity so an order never spends more
//! than requested or breaks the step size.
//!
//! Buys spend a fixed quote amount; sells liquidate the whole free base
//! balance. A plan that breaks a constraint is still returned, with its
//! violations listed, and [`OrderPlan::verdict`] applies the failure policy:
//! an invalid buy aborts the cycle, an invalid sell is skipped.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{
    Balances, MarketConstraints, OrderRequest, OrderSide, OrderType, RoundingError, TradingPair,
};
use crate::signal::TradeAction;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("hold decisions do not produce orders")]
    NothingToPlan,

    #[error("reference price must be positive and finite, got {0}")]
    InvalidPrice(f64),

    #[error("quote amount must be positive and finite, got {0}")]
    InvalidQuoteAmount(f64),

    #[error("rounding failed: {0}")]
    Rounding(#[from] RoundingError),
}

/// A single broken order requirement.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintViolation {
    #[error("quote balance {available} is below the trade size {required}")]
    InsufficientQuote { required: f64, available: f64 },

    #[error("no free base balance to sell (have {available})")]
    NoBaseBalance { available: f64 },

    #[error("amount {amount} is not above the exchange minimum {min}")]
    AmountBelowMinimum { amount: f64, min: f64 },

    #[error("amount {amount} is not below the exchange maximum {max}")]
    AmountAboveMaximum { amount: f64, max: f64 },
}

/// Everything the planner reads for one decision.
#[derive(Debug, Clone, Copy)]
pub struct PlanRequest<'a> {
    pub pair: &'a TradingPair,
    pub action: TradeAction,
    /// Quote currency to spend on a buy.
    pub quote_amount: f64,
    pub balances: &'a Balances,
    /// Close of the most recent short-timeframe bar.
    pub latest_price: f64,
    pub constraints: &'a MarketConstraints,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPlan {
    pub pair: TradingPair,
    pub side: OrderSide,
    /// Base-currency amount, rounded down to the amount precision.
    pub amount: f64,
    /// Quote-currency price, rounded down to the price precision.
    pub price: f64,
    pub satisfies_constraints: bool,
    pub violations: Vec<ConstraintViolation>,
}

/// What the cycle should do with a plan.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanVerdict {
    Submit(OrderRequest),
    /// Fatal for the cycle.
    Abort(Vec<ConstraintViolation>),
    /// Recoverable; the position is left unchanged until the next cycle.
    Skip(Vec<ConstraintViolation>),
}

impl OrderPlan {
    pub fn to_request(&self) -> OrderRequest {
        OrderRequest {
            pair: self.pair.clone(),
            order_type: OrderType::Market,
            side: self.side,
            amount: self.amount,
            price: self.price,
        }
    }

    pub fn verdict(&self) -> PlanVerdict {
        if self.satisfies_constraints {
            return PlanVerdict::Submit(self.to_request());
        }
        match self.side {
            OrderSide::Buy => PlanVerdict::Abort(self.violations.clone()),
            OrderSide::Sell => PlanVerdict::Skip(self.violations.clone()),
        }
    }
}

pub fn plan_order(request: &PlanRequest<'_>) -> Result<OrderPlan, PlanError> {
    let side = request.action.side().ok_or(PlanError::NothingToPlan)?;
    let reference = request.latest_price;
    if !(reference > 0.0 && reference.is_finite()) {
        return Err(PlanError::InvalidPrice(reference));
    }

    let constraints = request.constraints;
    let price = constraints.round_price_down(reference)?;
    let mut violations = Vec::new();

    let amount = match side {
        OrderSide::Buy => {
            let quote_amount = request.quote_amount;
            if !(quote_amount > 0.0 && quote_amount.is_finite()) {
                return Err(PlanError::InvalidQuoteAmount(quote_amount));
            }
            let available = request.balances.free(request.pair.quote());
            if available < quote_amount {
                violations.push(ConstraintViolation::InsufficientQuote {
                    required: quote_amount,
                    available,
                });
            }
            constraints.round_amount_down(quote_amount / reference)?
        }
        OrderSide::Sell => {
            let available = request.balances.free(request.pair.base());
            if available <= 0.0 {
                violations.push(ConstraintViolation::NoBaseBalance { available });
            }
            constraints.round_amount_down(available.max(0.0))?
        }
    };

    if !constraints.amount_in_bounds(amount) {
        violations.push(if amount <= constraints.min_amount {
            ConstraintViolation::AmountBelowMinimum {
                amount,
                min: constraints.min_amount,
            }
        } else {
            ConstraintViolation::AmountAboveMaximum {
                amount,
                max: constraints.max_amount,
            }
        });
    }

    Ok(OrderPlan {
        pair: request.pair.clone(),
        side,
        amount,
        price,
        satisfies_constraints: violations.is_empty(),
        violations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> TradingPair {
        "BTC/USDT".parse().unwrap()
    }

    fn constraints() -> MarketConstraints {
        MarketConstraints {
            min_amount: 0.01,
            max_amount: 100.0,
            price_precision: 0.01,
            amount_precision: 0.0001,
        }
    }

    fn plan(action: TradeAction, quote_amount: f64, balances: &Balances, price: f64) -> OrderPlan {
        let pair = pair();
        let constraints = constraints();
        plan_order(&PlanRequest {
            pair: &pair,
            action,
            quote_amount,
            balances,
            latest_price: price,
            constraints: &constraints,
        })
        .unwrap()
    }

    #[test]
    fn buy_sizes_from_quote_amount() {
        let balances = Balances::new().with("USDT", 100.0);
        let p = plan(TradeAction::Buy, 10.0, &balances, 123.456);
        assert_eq!(p.side, OrderSide::Buy);
        assert_eq!(p.price, 123.45);
        // 10 / 123.456 = 0.081000...
        assert_eq!(p.amount, 0.081);
        assert!(p.satisfies_constraints);
        assert_eq!(p.verdict(), PlanVerdict::Submit(p.to_request()));
    }

    #[test]
    fn buy_without_enough_quote_aborts() {
        let balances = Balances::new().with("USDT", 5.0);
        let p = plan(TradeAction::Buy, 10.0, &balances, 2.0);
        assert!(!p.satisfies_constraints);
        assert_eq!(
            p.violations,
            vec![ConstraintViolation::InsufficientQuote {
                required: 10.0,
                available: 5.0
            }]
        );
        assert!(matches!(p.verdict(), PlanVerdict::Abort(_)));
    }

    #[test]
    fn buy_below_minimum_aborts() {
        let balances = Balances::new().with("USDT", 100.0);
        let p = plan(TradeAction::Buy, 1.0, &balances, 1000.0);
        assert_eq!(p.amount, 0.001);
        assert!(matches!(
            p.violations.as_slice(),
            [ConstraintViolation::AmountBelowMinimum { .. }]
        ));
        assert!(matches!(p.verdict(), PlanVerdict::Abort(_)));
    }

    #[test]
    fn amount_equal_to_minimum_is_out_of_bounds() {
        let balances = Balances::new().with("USDT", 100.0);
        let p = plan(TradeAction::Buy, 1.0, &balances, 100.0);
        assert_eq!(p.amount, 0.01);
        assert!(!constraints().amount_in_bounds(p.amount));
        assert_eq!(
            p.violations,
            vec![ConstraintViolation::AmountBelowMinimum {
                amount: 0.01,
                min: 0.01
            }]
        );
    }

    #[test]
    fn buy_above_maximum_aborts() {
        let balances = Balances::new().with("USDT", 10_000.0);
        let p = plan(TradeAction::Buy, 5_000.0, &balances, 10.0);
        assert!(matches!(
            p.violations.as_slice(),
            [ConstraintViolation::AmountAboveMaximum { .. }]
        ));
    }

    #[test]
    fn sell_liquidates_rounded_base_balance() {
        let balances = Balances::new().with("BTC", 0.123456).with("USDT", 0.0);
        let p = plan(TradeAction::Sell, 10.0, &balances, 200.009);
        assert_eq!(p.side, OrderSide::Sell);
        assert_eq!(p.amount, 0.1234);
        assert_eq!(p.price, 200.0);
        assert!(p.satisfies_constraints);
    }

    #[test]
    fn dust_sell_is_skipped() {
        let balances = Balances::new().with("BTC", 0.0001);
        let p = plan(TradeAction::Sell, 10.0, &balances, 100.0);
        assert!(!p.satisfies_constraints);
        assert!(matches!(p.verdict(), PlanVerdict::Skip(_)));
    }

    #[test]
    fn empty_sell_is_skipped() {
        let p = plan(TradeAction::Sell, 10.0, &Balances::new(), 100.0);
        assert!(p
            .violations
            .contains(&ConstraintViolation::NoBaseBalance { available: 0.0 }));
        assert!(matches!(p.verdict(), PlanVerdict::Skip(_)));
    }

    #[test]
    fn hold_is_not_planned() {
        let pair = pair();
        let c = constraints();
        let balances = Balances::new();
        let result = plan_order(&PlanRequest {
            pair: &pair,
            action: TradeAction::Hold,
            quote_amount: 10.0,
            balances: &balances,
            latest_price: 100.0,
            constraints: &c,
        });
        assert!(matches!(result, Err(PlanError::NothingToPlan)));
    }

    #[test]
    fn non_positive_price_is_rejected() {
        let pair = pair();
        let c = constraints();
        let balances = Balances::new().with("USDT", 100.0);
        let result = plan_order(&PlanRequest {
            pair: &pair,
            action: TradeAction::Buy,
            quote_amount: 10.0,
            balances: &balances,
            latest_price: 0.0,
            constraints: &c,
        });
        assert!(matches!(result, Err(PlanError::InvalidPrice(_))));
    }

    #[test]
    fn planning_is_repeatable() {
        let balances = Balances::new().with("USDT", 100.0).with("BTC", 1.5);
        for action in [TradeAction::Buy, TradeAction::Sell] {
            let first = plan(action, 10.0, &balances, 321.987);
            let second = plan(action, 10.0, &balances, 321.987);
            assert_eq!(first, second);
        }
    }
}
