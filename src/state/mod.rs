// src/state/mod.rs

//! Monitoring state: the snapshot tree and its durable store.

pub mod snapshot;
pub mod store;

pub use snapshot::{JobSnapshot, MonitorState, RunSnapshot, SnapshotUpdate, StepSnapshot};
pub use store::{StateStore, DEFAULT_STATE_FILE};
