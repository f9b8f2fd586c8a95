// src/state/snapshot.rs

//! Persisted monitoring state and the per-run snapshot tree.
//!
//! Snapshots are plain values: the differ builds a fresh tree from each
//! fetch and the monitor swaps it in wholesale, so nothing here is mutated
//! in place except through [`MonitorState::apply`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{JobId, RunId, StepNumber};

/// Root persisted object, one per monitored repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorState {
    /// Highest run id a diff has been started for. Never decreases.
    #[serde(rename = "last_processed_run_id", default)]
    pub watermark: RunId,

    /// Runs observed but not yet fully terminated.
    #[serde(default)]
    pub in_flight_runs: BTreeMap<RunId, RunSnapshot>,

    /// Runs whose processing failed, with the number of failed attempts.
    /// They stay eligible until processed or given up on.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub retry_runs: BTreeMap<RunId, u32>,
}

impl MonitorState {
    /// Raise the watermark to `run_id` if it is higher.
    pub fn advance_watermark(&mut self, run_id: RunId) {
        self.watermark = self.watermark.max(run_id);
    }

    pub fn is_in_flight(&self, run_id: RunId) -> bool {
        self.in_flight_runs.contains_key(&run_id)
    }

    /// Apply the differ's directive for one run.
    pub fn apply(&mut self, update: SnapshotUpdate) {
        match update {
            SnapshotUpdate::Upsert(snapshot) => {
                self.in_flight_runs.insert(snapshot.run_id, snapshot);
            }
            SnapshotUpdate::Prune(run_id) => {
                self.in_flight_runs.remove(&run_id);
            }
        }
    }
}

/// What the caller should do with a run's snapshot after diffing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotUpdate {
    /// Run still has unfinished parts; store the new snapshot.
    Upsert(RunSnapshot),
    /// Run and all of its jobs have concluded; forget it.
    Prune(RunId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub run_id: RunId,
    pub status: String,
    pub conclusion: Option<String>,
    #[serde(default)]
    pub jobs: BTreeMap<JobId, JobSnapshot>,
}

impl RunSnapshot {
    /// The run and every job in it carry a conclusion.
    pub fn is_fully_terminated(&self) -> bool {
        self.conclusion.is_some() && self.jobs.values().all(|j| j.conclusion.is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: JobId,
    pub status: String,
    pub conclusion: Option<String>,
    /// Set once the job has reported a start time or a started status.
    #[serde(default)]
    pub started: bool,
    #[serde(default)]
    pub steps: BTreeMap<StepNumber, StepSnapshot>,
}

impl JobSnapshot {
    pub fn has_started(&self) -> bool {
        self.started || self.conclusion.is_some() || is_started_status(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSnapshot {
    pub number: StepNumber,
    pub status: String,
    pub conclusion: Option<String>,
    #[serde(default)]
    pub started: bool,
}

impl StepSnapshot {
    pub fn has_started(&self) -> bool {
        self.started || self.conclusion.is_some() || is_started_status(&self.status)
    }
}

/// Status values that mean work has begun.
pub fn is_started_status(status: &str) -> bool {
    matches!(status, "in_progress" | "completed")
}

/// Status values that mean the entity is waiting to be picked up.
pub fn is_queued_status(status: &str) -> bool {
    matches!(status, "queued" | "waiting" | "pending" | "requested")
}
