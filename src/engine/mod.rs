// src/engine/mod.rs

//! Poll-diff-emit engine.
//!
//! This module ties together:
//! - the snapshot differ (pure: previous snapshot + fresh fetch → events)
//! - the poll cycle controller (one listing, per-run diff and persist)
//! - the backoff policy
//! - the monitor loop that repeats cycles and reacts to:
//!   - success (interval wait)
//!   - rate limits (exact wait)
//!   - other failures (backoff wait)
//!   - shutdown signals
//!
//! The pure pieces are [`differ`], [`backoff`] and [`monitor::next_wait`];
//! the async/IO shell is [`cycle::PollCycle`] and [`monitor::MonitorLoop`].

pub mod backoff;
pub mod cycle;
pub mod differ;
pub mod monitor;
pub mod shutdown;
pub mod sleeper;

pub use backoff::Backoff;
pub use cycle::{select_candidates, Candidate, CycleReport, PollCycle, MAX_RUN_ATTEMPTS};
pub use differ::{diff_run, DiffContext, RunDiff};
pub use monitor::{next_wait, MonitorLoop, MonitorOptions, Wait};
pub use shutdown::{shutdown_channel, Shutdown, ShutdownHandle};
pub use sleeper::{Sleeper, TokioSleeper};
