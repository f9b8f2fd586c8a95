// src/engine/differ.rs

//! Pure snapshot differ.
//!
//! Given the last persisted [`RunSnapshot`] for a run (if any) and the run,
//! jobs and steps just fetched, [`diff_run`] returns the lifecycle events the
//! change implies plus the snapshot directive to apply. It performs no IO
//! and reads no clock, so identical inputs always give identical output.
//!
//! Event order is hierarchical: run events first, then for each job in
//! fetch order its own events followed by its steps' events.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::event::{EventKind, LifecycleEvent};
use crate::github::{Job, Step, WorkflowRun};
use crate::state::snapshot::{is_queued_status, is_started_status};
use crate::state::{JobSnapshot, RunSnapshot, SnapshotUpdate, StepSnapshot};
use crate::types::{shorten_sha, JobId, StepNumber};

/// Inputs shared by every event of one diff.
#[derive(Debug, Clone, Copy)]
pub struct DiffContext<'a> {
    /// `owner/repo`.
    pub repo: &'a str,
    /// Timestamp stamped onto every event.
    pub now: DateTime<Utc>,
}

/// Result of diffing one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDiff {
    pub events: Vec<LifecycleEvent>,
    pub update: SnapshotUpdate,
}

/// Diff one run against its previous snapshot.
pub fn diff_run(
    previous: Option<&RunSnapshot>,
    run: &WorkflowRun,
    jobs: &[Job],
    ctx: &DiffContext<'_>,
) -> RunDiff {
    let stamp = Stamp::new(ctx, run);
    let mut events = Vec::new();

    // Run level.
    if previous.is_none() {
        if is_queued_status(&run.status) {
            events.push(stamp.run(
                EventKind::WorkflowQueued,
                Some(&run.status),
                run_message("Workflow run queued", run),
            ));
        }
        events.push(stamp.run(
            EventKind::WorkflowStarted,
            Some(&run.status),
            run_message("Workflow run started", run),
        ));
    }
    if let Some(conclusion) = &run.conclusion {
        if previous.is_none_or(|p| p.conclusion.is_none()) {
            events.push(stamp.run(
                EventKind::WorkflowCompleted,
                Some(conclusion),
                run_message("Workflow run completed", run),
            ));
        }
    }

    // Job and step level.
    let mut job_snapshots = BTreeMap::new();
    for job in jobs {
        let prev_job = previous.and_then(|p| p.jobs.get(&job.id));
        diff_job(&stamp, prev_job, job, &mut events);
        job_snapshots.insert(job.id, job_snapshot(job));
    }

    let snapshot = RunSnapshot {
        run_id: run.id,
        status: run.status.clone(),
        conclusion: run.conclusion.clone(),
        jobs: job_snapshots,
    };

    let update = if snapshot.is_fully_terminated() {
        SnapshotUpdate::Prune(run.id)
    } else {
        SnapshotUpdate::Upsert(snapshot)
    };

    RunDiff { events, update }
}

fn diff_job(
    stamp: &Stamp<'_>,
    prev: Option<&JobSnapshot>,
    job: &Job,
    events: &mut Vec<LifecycleEvent>,
) {
    let started_now = job_has_begun(job);

    if started_now && !prev.is_some_and(JobSnapshot::has_started) {
        events.push(stamp.nested(
            EventKind::JobStarted,
            job.id,
            None,
            Some(&job.status),
            format!("Job started: {}", job.name),
        ));
    }

    if let Some(conclusion) = &job.conclusion {
        if prev.is_none_or(|p| p.conclusion.is_none()) {
            events.push(stamp.nested(
                EventKind::JobCompleted,
                job.id,
                None,
                Some(conclusion),
                format!("Job completed: {}", job.name),
            ));
        }
    }

    for step in &job.steps {
        let prev_step = prev.and_then(|j| j.steps.get(&step.number));
        diff_step(stamp, job.id, prev_step, step, events);
    }
}

fn diff_step(
    stamp: &Stamp<'_>,
    job_id: JobId,
    prev: Option<&StepSnapshot>,
    step: &Step,
    events: &mut Vec<LifecycleEvent>,
) {
    let started_now = step_has_begun(step);

    if started_now && !prev.is_some_and(StepSnapshot::has_started) {
        events.push(stamp.nested(
            EventKind::StepStarted,
            job_id,
            Some(step.number),
            Some(&step.status),
            format!("Step started: {}", step.name),
        ));
    }

    if let Some(conclusion) = &step.conclusion {
        if prev.is_none_or(|p| p.conclusion.is_none()) {
            events.push(stamp.nested(
                EventKind::StepCompleted,
                job_id,
                Some(step.number),
                Some(conclusion),
                format!("Step completed: {}", step.name),
            ));
        }
    }
}

/// A start time, a started status or a conclusion all count as started.
/// The result is stored in the snapshot's `started` flag, so a start is
/// reported exactly once even if the status later reads queued again.
fn job_has_begun(job: &Job) -> bool {
    job.started_at.is_some() || job.conclusion.is_some() || is_started_status(&job.status)
}

fn step_has_begun(step: &Step) -> bool {
    step.started_at.is_some() || step.conclusion.is_some() || is_started_status(&step.status)
}

fn job_snapshot(job: &Job) -> JobSnapshot {
    let steps = job
        .steps
        .iter()
        .map(|s| {
            (
                s.number,
                StepSnapshot {
                    number: s.number,
                    status: s.status.clone(),
                    conclusion: s.conclusion.clone(),
                    started: step_has_begun(s),
                },
            )
        })
        .collect();

    JobSnapshot {
        job_id: job.id,
        status: job.status.clone(),
        conclusion: job.conclusion.clone(),
        started: job_has_begun(job),
        steps,
    }
}

fn run_message(prefix: &str, run: &WorkflowRun) -> String {
    match run.name.as_deref().filter(|n| !n.is_empty()) {
        Some(name) => format!("{prefix}: {name}"),
        None => prefix.to_string(),
    }
}

/// Fills in the fields every event of one run shares.
struct Stamp<'a> {
    ctx: &'a DiffContext<'a>,
    run: &'a WorkflowRun,
    short_sha: Option<String>,
}

impl<'a> Stamp<'a> {
    fn new(ctx: &'a DiffContext<'a>, run: &'a WorkflowRun) -> Self {
        let short_sha = run
            .head_sha
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(shorten_sha);
        Self { ctx, run, short_sha }
    }

    fn run(&self, kind: EventKind, status: Option<&String>, message: String) -> LifecycleEvent {
        self.build(kind, None, None, status, message)
    }

    fn nested(
        &self,
        kind: EventKind,
        job_id: JobId,
        step: Option<StepNumber>,
        status: Option<&String>,
        message: String,
    ) -> LifecycleEvent {
        self.build(kind, Some(job_id), step, status, message)
    }

    fn build(
        &self,
        kind: EventKind,
        job_id: Option<JobId>,
        step_number: Option<StepNumber>,
        status: Option<&String>,
        message: String,
    ) -> LifecycleEvent {
        LifecycleEvent {
            timestamp: self.ctx.now,
            kind,
            repo: self.ctx.repo.to_string(),
            run_id: self.run.id,
            job_id,
            step_number,
            branch: self.run.head_branch.clone().filter(|b| !b.is_empty()),
            short_sha: self.short_sha.clone(),
            status: status.filter(|s| !s.is_empty()).cloned(),
            message,
        }
    }
}
