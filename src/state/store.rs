// src/state/store.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::{Result, RunwatchError};
use crate::fs::FileSystem;

use super::snapshot::MonitorState;

/// Default location of the state file, relative to the working directory.
pub const DEFAULT_STATE_FILE: &str = ".runwatch/state.json";

/// Durable load/save of [`MonitorState`] as indented JSON.
///
/// Saves go to `<path>.tmp` first and are then renamed over the canonical
/// file, so a reader only ever sees a complete previous or complete new
/// state. There is no locking: exactly one monitor may own a state file.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            path: path.into(),
            fs,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Load the persisted state.
    ///
    /// A missing, unreadable or unparsable file yields an empty state; this
    /// never fails.
    pub fn load(&self) -> MonitorState {
        if !self.fs.exists(&self.path) {
            info!(path = ?self.path, "no state file found; starting from empty state");
            return MonitorState::default();
        }

        let raw = match self.fs.read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = ?self.path, error = %e, "failed to read state file; starting over");
                return MonitorState::default();
            }
        };

        match serde_json::from_str::<MonitorState>(&raw) {
            Ok(state) => {
                info!(
                    watermark = state.watermark,
                    in_flight = state.in_flight_runs.len(),
                    retry = state.retry_runs.len(),
                    "loaded state"
                );
                state
            }
            Err(e) => {
                warn!(path = ?self.path, error = %e, "state file is corrupt; starting over");
                MonitorState::default()
            }
        }
    }

    /// Persist `state` crash-safely.
    ///
    /// On failure the previously saved file is left untouched.
    pub fn save(&self, state: &MonitorState) -> Result<()> {
        let mut payload = serde_json::to_string_pretty(state)?;
        payload.push('\n');

        let tmp = self.temp_path();
        self.fs
            .write(&tmp, payload.as_bytes())
            .map_err(|e| RunwatchError::Persistence(format!("{e:#}")))?;

        if let Err(e) = self.fs.rename(&tmp, &self.path) {
            if let Err(cleanup) = self.fs.remove_file(&tmp) {
                debug!(path = ?tmp, error = %cleanup, "could not remove temp state file");
            }
            return Err(RunwatchError::Persistence(format!("{e:#}")));
        }

        debug!(watermark = state.watermark, in_flight = state.in_flight_runs.len(), "state saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::state::snapshot::{RunSnapshot, SnapshotUpdate};

    fn store(fs: &MockFileSystem) -> StateStore {
        StateStore::new("state/runwatch.json", Arc::new(fs.clone()))
    }

    fn state_with_run(watermark: u64, run_id: u64) -> MonitorState {
        let mut state = MonitorState::default();
        state.advance_watermark(watermark);
        state.apply(SnapshotUpdate::Upsert(RunSnapshot {
            run_id,
            status: "in_progress".into(),
            conclusion: None,
            jobs: Default::default(),
        }));
        state
    }

    #[test]
    fn missing_file_loads_empty_state() {
        let fs = MockFileSystem::new();
        assert_eq!(store(&fs).load(), MonitorState::default());
    }

    #[test]
    fn corrupt_file_loads_empty_state() {
        let fs = MockFileSystem::new();
        fs.add_file("state/runwatch.json", "{ not json");
        assert_eq!(store(&fs).load(), MonitorState::default());
    }

    #[test]
    fn save_then_load_restores_state() {
        let fs = MockFileSystem::new();
        let store = store(&fs);
        let state = state_with_run(101, 101);

        store.save(&state).unwrap();

        assert_eq!(store.load(), state);
        assert!(!fs.exists(Path::new("state/runwatch.json.tmp")));
        assert_eq!(fs.rename_count(), 1);
    }

    #[test]
    fn saved_file_is_indented() {
        let fs = MockFileSystem::new();
        store(&fs).save(&state_with_run(5, 5)).unwrap();

        let raw = fs.contents("state/runwatch.json").unwrap();
        assert!(raw.contains("\n  \"last_processed_run_id\": 5"));
    }

    #[test]
    fn failed_rename_keeps_previous_file() {
        let fs = MockFileSystem::new();
        let store = store(&fs);
        let old = state_with_run(10, 10);
        store.save(&old).unwrap();

        fs.set_fail_renames(true);
        let err = store.save(&state_with_run(20, 20)).unwrap_err();
        assert!(matches!(err, RunwatchError::Persistence(_)));

        fs.set_fail_renames(false);
        assert_eq!(store.load(), old);
        assert!(!fs.exists(Path::new("state/runwatch.json.tmp")));
    }

    #[test]
    fn failed_write_keeps_previous_file() {
        let fs = MockFileSystem::new();
        let store = store(&fs);
        let old = state_with_run(10, 10);
        store.save(&old).unwrap();

        fs.set_fail_writes(true);
        assert!(store.save(&state_with_run(20, 20)).is_err());
        assert_eq!(store.load(), old);
    }
}
