// src/config/settings.rs

use std::path::PathBuf;

use secrecy::SecretString;
use tracing::debug;

use crate::cli::CliArgs;
use crate::config::loader::{default_config_path, load_optional};
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::engine::MonitorOptions;
use crate::errors::{Result, RunwatchError};
use crate::types::RepoRef;

/// Everything the binary needs to start, resolved from
/// defaults ← config file ← CLI flags. The token is read separately.
#[derive(Debug, Clone)]
pub struct Settings {
    pub repo: RepoRef,
    pub config_path: PathBuf,
    pub config: ConfigFile,
    pub once: bool,
    pub dry_run: bool,
}

impl Settings {
    pub fn resolve(args: &CliArgs) -> Result<Self> {
        let repo: RepoRef = args.repo.parse()?;

        let (config_path, explicit) = match &args.config {
            Some(p) => (PathBuf::from(p), true),
            None => (default_config_path(), false),
        };

        let mut raw = load_optional(&config_path, explicit)?;
        apply_overrides(&mut raw, args);
        let config = ConfigFile::try_from(raw)?;

        debug!(repo = %repo, config = ?config_path, "settings resolved");

        Ok(Self {
            repo,
            config_path,
            config,
            once: args.once,
            dry_run: args.dry_run,
        })
    }

    pub fn monitor_options(&self) -> MonitorOptions {
        MonitorOptions {
            poll_interval: self.config.monitor.poll_interval,
            backoff_floor: self.config.monitor.backoff_floor,
            backoff_ceiling: self.config.monitor.backoff_ceiling,
            exit_after_one_cycle: self.once,
        }
    }

    /// Read the API token from the environment variable named in `[github].token_env`.
    pub fn token(&self) -> Result<SecretString> {
        token_from_env(&self.config.github.token_env, |key| std::env::var(key).ok())
    }
}

/// CLI flags win over file values. Applied before validation so overrides
/// are checked the same way.
pub fn apply_overrides(raw: &mut RawConfigFile, args: &CliArgs) {
    if let Some(interval) = &args.interval {
        raw.monitor.poll_interval = interval.clone();
    }
    if let Some(state_file) = &args.state_file {
        raw.monitor.state_file = state_file.clone();
    }
    if let Some(page_size) = args.page_size {
        raw.monitor.page_size = page_size;
    }
    if let Some(api_url) = &args.api_url {
        raw.github.api_url = api_url.clone();
    }
}

/// A blank value counts as missing.
pub fn token_from_env(var: &str, lookup: impl FnOnce(&str) -> Option<String>) -> Result<SecretString> {
    match lookup(var) {
        Some(value) if !value.trim().is_empty() => Ok(SecretString::from(value.trim().to_string())),
        _ => Err(RunwatchError::MissingToken(var.to_string())),
    }
}
