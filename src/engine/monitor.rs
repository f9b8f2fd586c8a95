// src/engine/monitor.rs

//! Monitor loop: repeated poll cycles with interval, rate-limit and
//! backoff waits.
//!
//! The decision of what to wait for after a cycle is the pure
//! [`next_wait`]; [`MonitorLoop`] is the async shell that performs the
//! waits and owns the [`MonitorState`] for its whole lifetime.

use std::fmt;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::errors::{Result, RunwatchError};
use crate::event::EventSink;
use crate::github::{FetchError, FetchResult, RunSource};
use crate::state::MonitorState;

use super::backoff::Backoff;
use super::cycle::{CycleReport, PollCycle};
use super::shutdown::Shutdown;
use super::sleeper::Sleeper;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_BACKOFF_FLOOR: Duration = Duration::from_secs(1);
pub const DEFAULT_BACKOFF_CEILING: Duration = Duration::from_secs(300);

/// What the loop sleeps on before the next cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Previous cycle succeeded.
    Interval(Duration),
    /// Remote asked us to back off for exactly this long.
    RateLimit(Duration),
    /// Generic failure; delay from the backoff policy.
    Backoff(Duration),
}

impl Wait {
    pub fn duration(&self) -> Duration {
        match *self {
            Wait::Interval(d) | Wait::RateLimit(d) | Wait::Backoff(d) => d,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Wait::Interval(_) => "interval",
            Wait::RateLimit(_) => "rate-limit",
            Wait::Backoff(_) => "backoff",
        }
    }
}

/// Decide the wait after a cycle outcome.
///
/// Success resets the backoff. A rate limit waits the signalled duration
/// and leaves the failure streak alone. Any other failure consumes the
/// next backoff delay.
pub fn next_wait(
    outcome: &FetchResult<CycleReport>,
    backoff: &mut Backoff,
    interval: Duration,
) -> Wait {
    match outcome {
        Ok(_) => {
            backoff.reset();
            Wait::Interval(interval)
        }
        Err(FetchError::RateLimited { retry_after }) => Wait::RateLimit(*retry_after),
        Err(FetchError::Api(_)) => Wait::Backoff(backoff.next_delay()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorOptions {
    pub poll_interval: Duration,
    pub backoff_floor: Duration,
    pub backoff_ceiling: Duration,
    /// Run a single cycle, flush, and return.
    pub exit_after_one_cycle: bool,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            backoff_floor: DEFAULT_BACKOFF_FLOOR,
            backoff_ceiling: DEFAULT_BACKOFF_CEILING,
            exit_after_one_cycle: false,
        }
    }
}

pub struct MonitorLoop<S: RunSource, K: EventSink, Z: Sleeper> {
    cycle: PollCycle<S, K>,
    sleeper: Z,
    shutdown: Shutdown,
    backoff: Backoff,
    options: MonitorOptions,
}

impl<S: RunSource, K: EventSink, Z: Sleeper> fmt::Debug for MonitorLoop<S, K, Z> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorLoop")
            .field("repo", self.cycle.repo())
            .field("backoff", &self.backoff)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<S: RunSource, K: EventSink, Z: Sleeper> MonitorLoop<S, K, Z> {
    pub fn new(cycle: PollCycle<S, K>, sleeper: Z, shutdown: Shutdown, options: MonitorOptions) -> Self {
        let backoff = Backoff::new(options.backoff_floor, options.backoff_ceiling);
        Self {
            cycle,
            sleeper,
            shutdown,
            backoff,
            options,
        }
    }

    /// Run until shutdown (or after one cycle in once mode).
    ///
    /// State is loaded from the store at start and flushed once more on
    /// exit. Returns the final state. In once mode a failed listing is
    /// returned as an error after the flush.
    pub async fn run(mut self) -> Result<MonitorState> {
        let mut state = self.cycle.store().load();
        info!(
            repo = %self.cycle.repo(),
            watermark = state.watermark,
            in_flight = state.in_flight_runs.len(),
            interval_ms = self.options.poll_interval.as_millis() as u64,
            "monitor started"
        );

        let mut cycles: u64 = 0;
        let outcome = loop {
            if self.shutdown.is_triggered() {
                info!("shutdown requested; stopping before next cycle");
                break Ok(());
            }

            cycles += 1;
            let result = self.cycle.run_cycle(&mut state, &self.shutdown).await;
            log_cycle(cycles, &result);

            if self.options.exit_after_one_cycle {
                break result.map(|_| ()).map_err(RunwatchError::from);
            }

            let wait = next_wait(&result, &mut self.backoff, self.options.poll_interval);
            info!(
                reason = wait.reason(),
                delay_ms = wait.duration().as_millis() as u64,
                "waiting before next cycle"
            );

            if !self.wait(wait.duration()).await {
                info!("shutdown requested during wait");
                break Ok(());
            }
        };

        self.flush(&state);
        info!(cycles, watermark = state.watermark, "monitor stopped");

        outcome.map(|()| state)
    }

    /// Sleep for `delay` unless shutdown fires first. Returns `false` on
    /// shutdown.
    async fn wait(&mut self, delay: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.shutdown.triggered() => false,
            _ = self.sleeper.sleep(delay) => true,
        }
    }

    fn flush(&self, state: &MonitorState) {
        if let Err(e) = self.cycle.store().save(state) {
            error!(error = %e, "final state flush failed");
        }
    }
}

fn log_cycle(cycle: u64, result: &FetchResult<CycleReport>) {
    match result {
        Ok(report) => info!(
            cycle,
            listed = report.runs_listed,
            diffed = report.runs_diffed,
            failed = report.runs_failed,
            pruned = report.runs_pruned,
            events = report.events_emitted,
            "cycle complete"
        ),
        Err(FetchError::RateLimited { retry_after }) => warn!(
            cycle,
            retry_after_ms = retry_after.as_millis() as u64,
            "cycle hit rate limit"
        ),
        Err(FetchError::Api(cause)) => warn!(cycle, error = %cause, "cycle failed"),
    }
}
