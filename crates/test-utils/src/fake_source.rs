use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use runwatch::github::{FetchError, FetchFuture, FetchResult, Job, RunSource, WorkflowRun};
use runwatch::types::{RepoRef, RunId};

/// One call made against the fake, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCall {
    ListRuns,
    ListJobs(RunId),
    GetRun(RunId),
}

#[derive(Debug, Default)]
struct Inner {
    listings: VecDeque<FetchResult<Vec<WorkflowRun>>>,
    last_listing: Vec<WorkflowRun>,
    runs: HashMap<RunId, WorkflowRun>,
    jobs: HashMap<RunId, Vec<Job>>,
    job_failures: HashMap<RunId, VecDeque<FetchError>>,
    calls: Vec<SourceCall>,
}

/// A scripted `RunSource`:
/// - listings are queued with `push_listing`/`push_listing_error` and
///   consumed one per `list_runs` call; once the queue is empty the last
///   successful listing repeats.
/// - jobs are served per run id from `set_jobs` (empty when unset).
/// - `get_run` serves the latest version of a run seen in any listing or
///   set with `set_run`.
/// - every call is recorded.
///
/// Clones share state, so a test can keep one handle while the cycle owns another.
#[derive(Debug, Clone, Default)]
pub struct FakeRunSource {
    inner: Arc<Mutex<Inner>>,
}

impl FakeRunSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("fake source lock poisoned")
    }

    pub fn push_listing(&self, runs: Vec<WorkflowRun>) -> &Self {
        self.lock().listings.push_back(Ok(runs));
        self
    }

    pub fn push_listing_error(&self, err: FetchError) -> &Self {
        self.lock().listings.push_back(Err(err));
        self
    }

    pub fn set_run(&self, run: WorkflowRun) -> &Self {
        self.lock().runs.insert(run.id, run);
        self
    }

    pub fn set_jobs(&self, run_id: RunId, jobs: Vec<Job>) -> &Self {
        self.lock().jobs.insert(run_id, jobs);
        self
    }

    /// Make the next `times` job fetches for `run_id` fail with `err`.
    pub fn fail_jobs(&self, run_id: RunId, err: FetchError, times: usize) -> &Self {
        let mut inner = self.lock();
        let queue = inner.job_failures.entry(run_id).or_default();
        queue.extend(std::iter::repeat_n(err, times));
        drop(inner);
        self
    }

    pub fn calls(&self) -> Vec<SourceCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }
}

impl RunSource for FakeRunSource {
    fn list_runs(&self, _repo: &RepoRef, per_page: u32) -> FetchFuture<'_, Vec<WorkflowRun>> {
        let result = {
            let mut inner = self.lock();
            inner.calls.push(SourceCall::ListRuns);
            match inner.listings.pop_front() {
                Some(Ok(runs)) => {
                    for run in &runs {
                        inner.runs.insert(run.id, run.clone());
                    }
                    inner.last_listing = runs.clone();
                    Ok(runs)
                }
                Some(Err(e)) => Err(e),
                None => Ok(inner.last_listing.clone()),
            }
        };
        let result = result.map(|mut runs| {
            runs.truncate(per_page as usize);
            runs
        });
        Box::pin(async move { result })
    }

    fn list_jobs(&self, _repo: &RepoRef, run_id: RunId) -> FetchFuture<'_, Vec<Job>> {
        let result = {
            let mut inner = self.lock();
            inner.calls.push(SourceCall::ListJobs(run_id));
            let failure = inner
                .job_failures
                .get_mut(&run_id)
                .and_then(|queue| queue.pop_front());
            match failure {
                Some(e) => Err(e),
                None => Ok(inner.jobs.get(&run_id).cloned().unwrap_or_default()),
            }
        };
        Box::pin(async move { result })
    }

    fn get_run(&self, _repo: &RepoRef, run_id: RunId) -> FetchFuture<'_, WorkflowRun> {
        let result = {
            let mut inner = self.lock();
            inner.calls.push(SourceCall::GetRun(run_id));
            inner
                .runs
                .get(&run_id)
                .cloned()
                .ok_or_else(|| FetchError::Api(format!("run {run_id} not found (404)")))
        };
        Box::pin(async move { result })
    }
}
