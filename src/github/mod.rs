// src/github/mod.rs

//! Remote run-listing collaborator.
//!
//! The monitor talks to a [`RunSource`] instead of an HTTP client directly.
//! Production code uses [`GithubClient`]; tests provide a scripted fake that
//! returns canned runs, jobs and failures.
//!
//! Every call resolves to one of three conditions: success, rate-limited
//! (with the wait the remote asked for), or any other API/network failure.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

use crate::types::{RepoRef, RunId};

pub mod client;
pub mod model;

pub use client::GithubClient;
pub use model::{Job, Step, WorkflowRun};

/// Failure signalled by a [`RunSource`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Quota exhausted; resume no earlier than `retry_after` from now.
    #[error("rate limited by remote API; retry after {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    /// Non-2xx response, transport failure or undecodable payload.
    #[error("remote API error: {0}")]
    Api(String),
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Boxed future returned by [`RunSource`] methods.
pub type FetchFuture<'a, T> = Pin<Box<dyn Future<Output = FetchResult<T>> + Send + 'a>>;

/// Trait abstracting how run state is fetched from the CI service.
pub trait RunSource: Send + Sync {
    /// Most recent runs, newest first, at most `per_page` of them.
    fn list_runs(&self, repo: &RepoRef, per_page: u32) -> FetchFuture<'_, Vec<WorkflowRun>>;

    /// All jobs (with nested steps) of one run, in the order the remote lists them.
    fn list_jobs(&self, repo: &RepoRef, run_id: RunId) -> FetchFuture<'_, Vec<Job>>;

    /// A single run by id, used for runs that have scrolled off the listing page.
    fn get_run(&self, repo: &RepoRef, run_id: RunId) -> FetchFuture<'_, WorkflowRun>;
}
