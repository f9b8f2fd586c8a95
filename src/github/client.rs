// src/github/client.rs

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, RETRY_AFTER, USER_AGENT};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::{Result, RunwatchError};
use crate::types::{RepoRef, RunId};

use super::model::{Job, JobsResponse, WorkflowRun, WorkflowRunsResponse};
use super::{FetchError, FetchFuture, FetchResult, RunSource};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Wait used when the remote signals a rate limit without saying for how long.
const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

/// Jobs are paged separately from runs; 100 is the API maximum.
const JOBS_PER_PAGE: u32 = 100;

/// Upper bound on job pages fetched for one run.
const MAX_JOB_PAGES: u32 = 10;

const MAX_ERROR_BODY: usize = 300;

/// REST client for the Actions API.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_base: String,
}

impl GithubClient {
    pub fn new(api_base: &str, token: &SecretString, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("runwatch"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static("2022-11-28"));

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret().trim()))
            .map_err(|_| RunwatchError::ConfigError("API token contains invalid characters".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| RunwatchError::ConfigError(format!("building HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn repo_url(&self, repo: &RepoRef) -> String {
        format!("{}/repos/{}/{}/actions", self.api_base, repo.owner, repo.name)
    }
}

impl RunSource for GithubClient {
    fn list_runs(&self, repo: &RepoRef, per_page: u32) -> FetchFuture<'_, Vec<WorkflowRun>> {
        let url = format!("{}/runs?per_page={per_page}", self.repo_url(repo));

        Box::pin(async move {
            let resp: WorkflowRunsResponse = get_json(&self.http, &url, "runs").await?;
            Ok(resp.workflow_runs)
        })
    }

    fn list_jobs(&self, repo: &RepoRef, run_id: RunId) -> FetchFuture<'_, Vec<Job>> {
        let base = format!("{}/runs/{run_id}/jobs?per_page={JOBS_PER_PAGE}", self.repo_url(repo));

        Box::pin(async move {
            let mut jobs = Vec::new();
            for page in 1..=MAX_JOB_PAGES {
                let url = format!("{base}&page={page}");
                let resp: JobsResponse = get_json(&self.http, &url, "jobs").await?;
                let fetched = resp.jobs.len();
                jobs.extend(resp.jobs);

                if fetched < JOBS_PER_PAGE as usize || jobs.len() as u64 >= resp.total_count {
                    break;
                }
            }
            Ok(jobs)
        })
    }

    fn get_run(&self, repo: &RepoRef, run_id: RunId) -> FetchFuture<'_, WorkflowRun> {
        let url = format!("{}/runs/{run_id}", self.repo_url(repo));

        Box::pin(async move { get_json(&self.http, &url, "run").await })
    }
}

async fn get_json<T: DeserializeOwned>(
    http: &reqwest::Client,
    url: &str,
    operation: &str,
) -> FetchResult<T> {
    debug!(%url, "GET");

    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::Api(format!("{operation} request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();
        return Err(classify_failure(status, &headers, &body, operation, Utc::now()));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| FetchError::Api(format!("decoding {operation} response: {e}")))
}

/// Map a non-2xx response onto the collaborator's failure conditions.
///
/// 429, and 403 carrying either an exhausted quota or a `Retry-After`
/// header, are rate limits; everything else is a plain API error.
pub fn classify_failure(
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
    operation: &str,
    now: DateTime<Utc>,
) -> FetchError {
    let remaining = header_u64(headers, "x-ratelimit-remaining");
    let retry_after = header_u64(headers, RETRY_AFTER.as_str());

    let rate_limited = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && (remaining == Some(0) || retry_after.is_some()));

    if rate_limited {
        return FetchError::RateLimited {
            retry_after: rate_limit_wait(headers, now),
        };
    }

    FetchError::Api(format!(
        "{operation} failed with status {}: {}",
        status.as_u16(),
        truncate(body.trim(), MAX_ERROR_BODY)
    ))
}

/// How long the remote asked us to wait: `Retry-After`, else the quota
/// reset time, else a fixed default.
fn rate_limit_wait(headers: &HeaderMap, now: DateTime<Utc>) -> Duration {
    if let Some(secs) = header_u64(headers, RETRY_AFTER.as_str()) {
        return Duration::from_secs(secs.max(1));
    }

    if let Some(reset) = header_u64(headers, "x-ratelimit-reset") {
        let wait = reset as i64 - now.timestamp();
        return Duration::from_secs(wait.max(1) as u64);
    }

    DEFAULT_RATE_LIMIT_WAIT
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
