use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use runwatch::errors::{Result, RunwatchError};
use runwatch::event::{format_line, EventKind, EventSink, LifecycleEvent};
use runwatch::types::RunId;

#[derive(Debug, Default)]
struct Inner {
    events: Vec<LifecycleEvent>,
    failing_runs: HashSet<RunId>,
}

/// An `EventSink` that keeps every event in memory.
///
/// Emission for runs registered with `fail_for_run` returns an error
/// instead of recording. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    inner: Arc<Mutex<Inner>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("recording sink lock poisoned")
    }

    pub fn fail_for_run(&self, run_id: RunId) {
        self.lock().failing_runs.insert(run_id);
    }

    pub fn recover_run(&self, run_id: RunId) {
        self.lock().failing_runs.remove(&run_id);
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.lock().events.clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.lock().events.iter().map(|e| e.kind).collect()
    }

    /// Events for one run, as `(kind, job_id, step_number)`.
    pub fn trace_for(&self, run_id: RunId) -> Vec<(EventKind, Option<u64>, Option<u32>)> {
        self.lock()
            .events
            .iter()
            .filter(|e| e.run_id == run_id)
            .map(|e| (e.kind, e.job_id, e.step_number))
            .collect()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lock().events.iter().map(format_line).collect()
    }

    pub fn clear(&self) {
        self.lock().events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &LifecycleEvent) -> Result<()> {
        let mut inner = self.lock();
        if inner.failing_runs.contains(&event.run_id) {
            return Err(RunwatchError::Sink(format!(
                "injected failure for run {}",
                event.run_id
            )));
        }
        inner.events.push(event.clone());
        Ok(())
    }
}
