//! One decision cycle: fetch → indicators → signal → plan → submit.
//!
//! A cycle owns nothing across invocations. Indicator rows are recomputed
//! from the freshly fetched window every time, and balances and constraints
//! are read only when the detector asks for a trade.
//!
//! Failures at the I/O boundary end the cycle with a [`CycleError`]; they
//! never reach the scheduler as panics. An unplaceable sell is not an error:
//! the cycle logs it and reports [`CycleOutcome::SellSkipped`].

use thiserror::Error;
use tracing::{debug, error, info, info_span, warn};

use trendpilot_core::domain::OrderRecord;
use trendpilot_core::planner::ConstraintViolation;
use trendpilot_core::{
    compute_rows, detect, plan_order, AccountSource, DataError, MarketDataSource, OrderPlan,
    OrderSink, PlanError, PlanRequest, PlanVerdict, SignalDecision, SubmissionError, TradeAction,
};

use crate::config::CycleContext;

/// Number of trailing indicator rows written to the log each cycle.
const LOGGED_ROWS: usize = 3;

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("market data unavailable: {0}")]
    DataUnavailable(#[from] DataError),

    #[error("buy order violates exchange constraints: {}", describe(.violations))]
    ConstraintViolation {
        plan: Box<OrderPlan>,
        violations: Vec<ConstraintViolation>,
    },

    #[error("order submission failed: {0}")]
    SubmissionFailure(#[from] SubmissionError),

    #[error("order planning failed: {0}")]
    Planning(#[from] PlanError),
}

fn describe(violations: &[ConstraintViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// How a cycle that did not fail ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// No trigger, or not enough defined data to decide.
    Held(SignalDecision),
    Submitted {
        decision: SignalDecision,
        plan: OrderPlan,
        record: OrderRecord,
    },
    /// Sell plan broke a constraint; the position is left as is.
    SellSkipped {
        decision: SignalDecision,
        plan: OrderPlan,
    },
}

impl CycleOutcome {
    pub fn action(&self) -> TradeAction {
        match self {
            CycleOutcome::Held(decision) => decision.action,
            CycleOutcome::Submitted { decision, .. } | CycleOutcome::SellSkipped { decision, .. } => {
                decision.action
            }
        }
    }
}

/// The collaborators a cycle talks to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub market: &'a dyn MarketDataSource,
    pub account: &'a dyn AccountSource,
    pub orders: &'a dyn OrderSink,
}

pub fn run_cycle(
    ctx: &CycleContext,
    deps: &Collaborators<'_>,
) -> Result<CycleOutcome, CycleError> {
    let span = info_span!("cycle", pair = %ctx.pair, timeframe = %ctx.timeframe);
    let _guard = span.enter();
    info!(
        source = deps.market.name(),
        window = ctx.window,
        config = %ctx.fingerprint,
        "cycle started"
    );

    let series = deps
        .market
        .fetch_bars(&ctx.pair, ctx.timeframe, ctx.window)
        .map_err(|e| {
            error!(error = %e, "bar fetch failed");
            e
        })?;
    debug!(bars = series.len(), "window fetched");

    let rows = compute_rows(series.as_slice(), &ctx.params);
    for row in &rows[rows.len().saturating_sub(LOGGED_ROWS)..] {
        info!(
            timestamp = %row.timestamp,
            close = row.close,
            in_uptrend = row.in_uptrend,
            rsi = ?row.rsi(),
            "indicator row"
        );
    }

    let decision = detect(&rows, &ctx.params, &ctx.thresholds);
    info!(action = %decision.action, reason = ?decision.reason, "signal");
    if decision.action == TradeAction::Hold {
        return Ok(CycleOutcome::Held(decision));
    }

    let balances = deps.account.fetch_free_balances()?;
    let constraints = deps.account.fetch_market_constraints(&ctx.pair)?;
    let latest_price = deps.market.fetch_latest_price(&ctx.pair)?;
    info!(
        base = ctx.pair.base(),
        base_free = balances.free(ctx.pair.base()),
        quote = ctx.pair.quote(),
        quote_free = balances.free(ctx.pair.quote()),
        latest_price,
        "balances before order"
    );

    let plan = plan_order(&PlanRequest {
        pair: &ctx.pair,
        action: decision.action,
        quote_amount: ctx.quote_amount,
        balances: &balances,
        latest_price,
        constraints: &constraints,
    })?;
    debug!(side = %plan.side, amount = plan.amount, price = plan.price, "order planned");

    match plan.verdict() {
        PlanVerdict::Submit(request) => {
            let record = deps
                .orders
                .submit_order(&request)
                .map_err(|e| {
                    error!(error = %e, "order submission failed");
                    e
                })?;
            info!(order_id = %record.id, raw = %record.raw, "order submitted");
            Ok(CycleOutcome::Submitted {
                decision,
                plan,
                record,
            })
        }
        PlanVerdict::Abort(violations) => {
            error!(violations = %describe(&violations), "buy aborted");
            Err(CycleError::ConstraintViolation {
                plan: Box::new(plan),
                violations,
            })
        }
        PlanVerdict::Skip(violations) => {
            warn!(violations = %describe(&violations), "sell skipped");
            Ok(CycleOutcome::SellSkipped { decision, plan })
        }
    }
}
