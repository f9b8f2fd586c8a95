pub mod builders;
pub mod fake_source;
pub mod recording_sink;
pub mod sleeper;

pub use fake_source::{FakeRunSource, SourceCall};
pub use recording_sink::RecordingSink;
pub use sleeper::RecordingSleeper;

use std::sync::{Arc, Once};

use chrono::{DateTime, Utc};
use runwatch::engine::PollCycle;
use runwatch::fs::mock::MockFileSystem;
use runwatch::state::StateStore;
use runwatch::types::RepoRef;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

pub const STATE_PATH: &str = "/state/runwatch.json";

pub fn repo() -> RepoRef {
    RepoRef::new("octo", "widgets")
}

/// Clock for deterministic event timestamps.
pub fn fixed_now() -> DateTime<Utc> {
    builders::ts(3600)
}

/// State store backed by an in-memory filesystem at [`STATE_PATH`].
pub fn mock_store() -> (StateStore, MockFileSystem) {
    let fs = MockFileSystem::new();
    let store = StateStore::new(STATE_PATH, Arc::new(fs.clone()));
    (store, fs)
}

/// A poll cycle over the given fakes with a fixed clock and page size 50.
pub fn fake_cycle(
    source: &FakeRunSource,
    sink: &RecordingSink,
    store: StateStore,
) -> PollCycle<FakeRunSource, RecordingSink> {
    PollCycle::new(source.clone(), sink.clone(), store, repo(), 50).with_clock(fixed_now)
}
