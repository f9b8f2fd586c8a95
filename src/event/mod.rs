// src/event/mod.rs

//! Lifecycle events produced by the differ and the sinks that render them.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::types::{JobId, RunId, StepNumber};

pub mod sink;

pub use sink::{format_line, EventSink, LineSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    WorkflowQueued,
    WorkflowStarted,
    WorkflowCompleted,
    JobStarted,
    JobCompleted,
    StepStarted,
    StepCompleted,
}

impl EventKind {
    /// Name as printed in the event line.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::WorkflowQueued => "WORKFLOW_QUEUED",
            EventKind::WorkflowStarted => "WORKFLOW_STARTED",
            EventKind::WorkflowCompleted => "WORKFLOW_COMPLETED",
            EventKind::JobStarted => "JOB_STARTED",
            EventKind::JobCompleted => "JOB_COMPLETED",
            EventKind::StepStarted => "STEP_STARTED",
            EventKind::StepCompleted => "STEP_COMPLETED",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    /// `owner/repo`.
    pub repo: String,
    pub run_id: RunId,
    pub job_id: Option<JobId>,
    pub step_number: Option<StepNumber>,
    pub branch: Option<String>,
    pub short_sha: Option<String>,
    /// Status for queued/started events, conclusion for completed ones.
    pub status: Option<String>,
    pub message: String,
}
