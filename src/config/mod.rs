// src/config/mod.rs

//! Configuration loading and validation for runwatch.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate durations and ranges (`validate.rs`).
//! - Merge CLI overrides and read the API token (`settings.rs`).

pub mod loader;
pub mod model;
pub mod settings;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_optional};
pub use model::{ConfigFile, GithubConfig, MonitorConfig, RawConfigFile};
pub use settings::Settings;
pub use validate::parse_duration;
