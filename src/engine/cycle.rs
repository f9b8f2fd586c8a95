// src/engine/cycle.rs

//! One fetch → diff → emit → persist pass over the runs visible in a
//! single listing call.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::errors::{Result, RunwatchError};
use crate::event::EventSink;
use crate::github::{FetchError, FetchResult, RunSource, WorkflowRun};
use crate::state::{MonitorState, SnapshotUpdate, StateStore};
use crate::types::{RepoRef, RunId};

use super::differ::{diff_run, DiffContext};
use super::shutdown::Shutdown;

/// Consecutive failed attempts after which a run is dropped from tracking.
pub const MAX_RUN_ATTEMPTS: u32 = 5;

/// Counters describing what one cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub runs_listed: usize,
    pub runs_diffed: usize,
    pub runs_failed: usize,
    pub runs_pruned: usize,
    pub events_emitted: usize,
    pub persist_failures: usize,
    /// Shutdown was requested before every eligible run was processed.
    pub interrupted: bool,
}

/// Where an eligible run's current state comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    /// Present in this cycle's listing.
    Listed(WorkflowRun),
    /// Tracked but absent from the listing page; fetch it individually.
    Refresh,
}

#[derive(Debug, Clone, Copy)]
struct RunOutcome {
    events: usize,
    pruned: bool,
}

/// Poll cycle controller.
///
/// Owns the remote source, the event sink and the state store; the
/// [`MonitorState`] itself is owned by the caller and passed in per cycle.
pub struct PollCycle<S: RunSource, K: EventSink> {
    source: S,
    sink: K,
    store: StateStore,
    repo: RepoRef,
    repo_name: String,
    page_size: u32,
    clock: fn() -> DateTime<Utc>,
}

impl<S: RunSource, K: EventSink> PollCycle<S, K> {
    pub fn new(source: S, sink: K, store: StateStore, repo: RepoRef, page_size: u32) -> Self {
        let repo_name = repo.full_name();
        Self {
            source,
            sink,
            store,
            repo,
            repo_name,
            page_size,
            clock: Utc::now,
        }
    }

    /// Replace the clock used to timestamp events.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    /// Run one full cycle against `state`.
    ///
    /// A failure of the listing call itself, or a rate limit hit on any
    /// call, aborts the cycle and is returned. Any other per-run failure is
    /// logged and the cycle moves on to the next run. State is saved after
    /// every run.
    pub async fn run_cycle(
        &mut self,
        state: &mut MonitorState,
        shutdown: &Shutdown,
    ) -> FetchResult<CycleReport> {
        let watermark = state.watermark;
        let listed = self.source.list_runs(&self.repo, self.page_size).await?;

        let mut report = CycleReport {
            runs_listed: listed.len(),
            ..CycleReport::default()
        };

        let candidates = select_candidates(listed, state, watermark);
        debug!(
            watermark,
            eligible = candidates.len(),
            listed = report.runs_listed,
            "selected runs for this cycle"
        );

        for (run_id, candidate) in candidates {
            if shutdown.is_triggered() {
                info!(run_id, "shutdown requested; leaving remaining runs for later");
                report.interrupted = true;
                break;
            }

            match self.process_run(run_id, candidate, state).await {
                Ok(outcome) => {
                    state.retry_runs.remove(&run_id);
                    report.runs_diffed += 1;
                    report.events_emitted += outcome.events;
                    if outcome.pruned {
                        report.runs_pruned += 1;
                    }
                    info!(run_id, events = outcome.events, pruned = outcome.pruned, "run diffed");
                }
                Err(RunwatchError::Fetch(FetchError::RateLimited { retry_after })) => {
                    warn!(run_id, retry_after_secs = retry_after.as_secs(), "rate limited mid-cycle");
                    return Err(FetchError::RateLimited { retry_after });
                }
                Err(e) => {
                    report.runs_failed += 1;
                    warn!(run_id, error = %e, "processing run failed");
                    record_failure(state, run_id);
                }
            }

            state.advance_watermark(run_id);

            if let Err(e) = self.store.save(state) {
                report.persist_failures += 1;
                error!(run_id, error = %e, "failed to persist state; continuing in memory");
            }
        }

        Ok(report)
    }

    /// Fetch, diff and emit one run, then apply its snapshot update.
    ///
    /// The update is applied only after every event was emitted. If the sink
    /// fails partway, the events it already accepted are emitted again when
    /// the run is retried.
    async fn process_run(
        &mut self,
        run_id: RunId,
        candidate: Candidate,
        state: &mut MonitorState,
    ) -> Result<RunOutcome> {
        let run = match candidate {
            Candidate::Listed(run) => run,
            Candidate::Refresh => {
                debug!(run_id, "run not on listing page; fetching it directly");
                self.source.get_run(&self.repo, run_id).await?
            }
        };

        let jobs = self.source.list_jobs(&self.repo, run_id).await?;

        let ctx = DiffContext {
            repo: &self.repo_name,
            now: (self.clock)(),
        };
        let diff = diff_run(state.in_flight_runs.get(&run_id), &run, &jobs, &ctx);

        for event in &diff.events {
            debug!(run_id, kind = %event.kind, job_id = ?event.job_id, step = ?event.step_number, "emit");
            self.sink.emit(event)?;
        }

        let pruned = matches!(diff.update, SnapshotUpdate::Prune(_));
        state.apply(diff.update);

        Ok(RunOutcome {
            events: diff.events.len(),
            pruned,
        })
    }
}

/// Runs to diff this cycle, ascending by id.
///
/// A run is eligible when it is newer than the watermark read at cycle
/// start, or when it is still tracked (in flight or awaiting retry).
/// Tracked runs missing from the listing are scheduled for a direct fetch.
pub fn select_candidates(
    listed: Vec<WorkflowRun>,
    state: &MonitorState,
    watermark: RunId,
) -> BTreeMap<RunId, Candidate> {
    let tracked = |id: RunId| state.is_in_flight(id) || state.retry_runs.contains_key(&id);

    let mut out = BTreeMap::new();
    for run in listed {
        if run.id > watermark || tracked(run.id) {
            out.insert(run.id, Candidate::Listed(run));
        }
    }

    for &id in state.in_flight_runs.keys().chain(state.retry_runs.keys()) {
        out.entry(id).or_insert(Candidate::Refresh);
    }

    out
}

/// Count a failed attempt; stop tracking the run once it keeps failing.
fn record_failure(state: &mut MonitorState, run_id: RunId) {
    let attempts = state.retry_runs.entry(run_id).or_insert(0);
    *attempts += 1;

    if *attempts >= MAX_RUN_ATTEMPTS {
        warn!(run_id, attempts = *attempts, "giving up on run after repeated failures");
        state.retry_runs.remove(&run_id);
        state.in_flight_runs.remove(&run_id);
    }
}
