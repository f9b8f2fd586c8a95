#![allow(dead_code)]

use chrono::{DateTime, Utc};
use runwatch::github::{Job, Step, WorkflowRun};
use runwatch::types::{JobId, RunId, StepNumber};

/// Fixed base instant; `ts(n)` is `n` seconds after it.
pub fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + secs, 0).expect("valid test timestamp")
}

/// Builder for `WorkflowRun`. Starts out queued on `main`.
pub struct RunBuilder {
    run: WorkflowRun,
}

impl RunBuilder {
    pub fn new(id: RunId) -> Self {
        Self {
            run: WorkflowRun {
                id,
                name: Some("CI".to_string()),
                head_branch: Some("main".to_string()),
                head_sha: Some("0123456789abcdef0123456789abcdef01234567".to_string()),
                status: "queued".to_string(),
                conclusion: None,
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.run.name = Some(name.to_string());
        self
    }

    pub fn branch(mut self, branch: &str) -> Self {
        self.run.head_branch = Some(branch.to_string());
        self
    }

    pub fn sha(mut self, sha: &str) -> Self {
        self.run.head_sha = Some(sha.to_string());
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.run.status = status.to_string();
        self
    }

    pub fn in_progress(self) -> Self {
        self.status("in_progress")
    }

    pub fn completed(mut self, conclusion: &str) -> Self {
        self.run.status = "completed".to_string();
        self.run.conclusion = Some(conclusion.to_string());
        self
    }

    pub fn build(self) -> WorkflowRun {
        self.run
    }
}

/// Builder for `Job`. Starts out queued with no steps.
pub struct JobBuilder {
    job: Job,
}

impl JobBuilder {
    pub fn new(id: JobId, name: &str) -> Self {
        Self {
            job: Job {
                id,
                name: name.to_string(),
                status: "queued".to_string(),
                conclusion: None,
                started_at: None,
                steps: vec![],
            },
        }
    }

    pub fn in_progress(mut self) -> Self {
        self.job.status = "in_progress".to_string();
        self.job.started_at = Some(ts(10));
        self
    }

    pub fn completed(mut self, conclusion: &str) -> Self {
        self.job.status = "completed".to_string();
        self.job.conclusion = Some(conclusion.to_string());
        self.job.started_at.get_or_insert(ts(10));
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.job.steps.push(step);
        self
    }

    pub fn build(self) -> Job {
        self.job
    }
}

/// Builder for `Step`. Starts out queued.
pub struct StepBuilder {
    step: Step,
}

impl StepBuilder {
    pub fn new(number: StepNumber, name: &str) -> Self {
        Self {
            step: Step {
                number,
                name: name.to_string(),
                status: "queued".to_string(),
                conclusion: None,
                started_at: None,
            },
        }
    }

    pub fn in_progress(mut self) -> Self {
        self.step.status = "in_progress".to_string();
        self.step.started_at = Some(ts(20));
        self
    }

    pub fn completed(mut self, conclusion: &str) -> Self {
        self.step.status = "completed".to_string();
        self.step.conclusion = Some(conclusion.to_string());
        self.step.started_at.get_or_insert(ts(20));
        self
    }

    pub fn build(self) -> Step {
        self.step
    }
}
