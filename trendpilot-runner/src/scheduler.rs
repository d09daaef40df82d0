//! Fixed-interval cycle scheduler.
//!
//! Runs cycles back-to-back on the calling thread, so a new cycle never
//! starts while one is in flight. Cycle errors are logged and counted; they
//! never end the loop. Only the stop flag or the cycle cap does.

use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{error, info};

/// Longest single sleep between stop-flag checks.
const STOP_POLL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SchedulerSummary {
    pub cycles: u64,
    pub failures: u64,
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    interval: Duration,
    max_cycles: Option<u64>,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_cycles: None,
        }
    }

    /// Stop after `n` cycles.
    pub fn max_cycles(mut self, n: u64) -> Self {
        self.max_cycles = Some(n);
        self
    }

    /// Run `cycle` every `interval`, measured from cycle start, until `stop`
    /// is set or the cycle cap is reached. A cycle that overruns the interval
    /// is followed immediately by the next one.
    ///
    /// `cycle` receives the zero-based cycle number.
    pub fn run<T, E, F>(&self, stop: &AtomicBool, mut cycle: F) -> SchedulerSummary
    where
        E: Display,
        F: FnMut(u64) -> Result<T, E>,
    {
        let mut summary = SchedulerSummary::default();

        while !stop.load(Ordering::Relaxed) {
            if self.max_cycles.is_some_and(|max| summary.cycles >= max) {
                break;
            }

            let started = Instant::now();
            if let Err(e) = cycle(summary.cycles) {
                summary.failures += 1;
                error!(cycle = summary.cycles, error = %e, "cycle failed");
            }
            summary.cycles += 1;

            if self.max_cycles.is_some_and(|max| summary.cycles >= max) {
                break;
            }
            self.wait_until(started + self.interval, stop);
        }

        info!(
            cycles = summary.cycles,
            failures = summary.failures,
            "scheduler stopped"
        );
        summary
    }

    fn wait_until(&self, deadline: Instant, stop: &AtomicBool) {
        loop {
            if stop.load(Ordering::Relaxed) {
                return;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return;
            }
            std::thread::sleep(remaining.min(STOP_POLL));
        }
    }
}
