//! Criterion benchmarks for the per-cycle hot path.
//!
//! Benchmarks:
//! 1. Indicator pipeline (TR/ATR, Supertrend, RSI) over growing windows
//! 2. Signal detection on a computed window
//! 3. Order planning including decimal rounding

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use trendpilot_core::domain::{Balances, Bar, MarketConstraints, TradingPair};
use trendpilot_core::{
    compute_rows, detect, plan_order, IndicatorParams, PlanRequest, SignalThresholds, TradeAction,
};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            let open = close - 0.3;
            Bar {
                timestamp: base + Duration::hours(i as i64),
                open,
                high: close + 1.5,
                low: close - 1.5,
                close,
                volume: 1_000.0 + (i % 500) as f64,
            }
        })
        .collect()
}

fn params() -> IndicatorParams {
    IndicatorParams::new(15, 5.0).unwrap()
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicator_pipeline");
    let params = params();

    for &bar_count in &[25, 250, 2_500] {
        let bars = make_bars(bar_count);
        group.bench_with_input(
            BenchmarkId::new("compute_rows", bar_count),
            &bar_count,
            |b, _| {
                b.iter(|| compute_rows(black_box(&bars), black_box(&params)));
            },
        );
    }

    group.finish();
}

fn bench_detect(c: &mut Criterion) {
    let params = params();
    let rows = compute_rows(&make_bars(25), &params);
    let thresholds = SignalThresholds::default();

    c.bench_function("detect_window_25", |b| {
        b.iter(|| detect(black_box(&rows), &params, &thresholds));
    });
}

fn bench_plan(c: &mut Criterion) {
    let pair: TradingPair = "BTC/USDT".parse().unwrap();
    let balances = Balances::new().with("USDT", 1_000.0).with("BTC", 0.123456789);
    let constraints = MarketConstraints {
        min_amount: 0.0001,
        max_amount: 1_000.0,
        price_precision: 0.01,
        amount_precision: 0.000001,
    };

    let mut group = c.benchmark_group("plan_order");
    for action in [TradeAction::Buy, TradeAction::Sell] {
        let request = PlanRequest {
            pair: &pair,
            action,
            quote_amount: 25.0,
            balances: &balances,
            latest_price: 43_219.87654,
            constraints: &constraints,
        };
        group.bench_function(action.to_string(), |b| {
            b.iter(|| plan_order(black_box(&request)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pipeline, bench_detect, bench_plan);
criterion_main!(benches);
