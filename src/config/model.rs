// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::github::client::DEFAULT_API_URL;
use crate::state::DEFAULT_STATE_FILE;

/// Configuration exactly as read from TOML, before validation.
///
/// ```toml
/// [monitor]
/// poll_interval = "30s"
/// backoff_floor = "1s"
/// backoff_ceiling = "5m"
/// page_size = 50
/// state_file = ".runwatch/state.json"
///
/// [github]
/// api_url = "https://api.github.com"
/// token_env = "GITHUB_TOKEN"
/// request_timeout = "30s"
/// ```
///
/// Both sections and every key are optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub monitor: RawMonitorSection,

    #[serde(default)]
    pub github: RawGithubSection,
}

/// `[monitor]` section. Durations are strings like `"500ms"`, `"30s"`, `"5m"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawMonitorSection {
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    #[serde(default = "default_backoff_floor")]
    pub backoff_floor: String,

    #[serde(default = "default_backoff_ceiling")]
    pub backoff_ceiling: String,

    /// Runs requested per listing call (GitHub caps this at 100).
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_state_file")]
    pub state_file: String,
}

/// `[github]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawGithubSection {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Name of the environment variable holding the API token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,
}

fn default_poll_interval() -> String {
    "30s".to_string()
}

fn default_backoff_floor() -> String {
    "1s".to_string()
}

fn default_backoff_ceiling() -> String {
    "5m".to_string()
}

fn default_page_size() -> u32 {
    50
}

fn default_state_file() -> String {
    DEFAULT_STATE_FILE.to_string()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_request_timeout() -> String {
    "30s".to_string()
}

impl Default for RawMonitorSection {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            backoff_floor: default_backoff_floor(),
            backoff_ceiling: default_backoff_ceiling(),
            page_size: default_page_size(),
            state_file: default_state_file(),
        }
    }
}

impl Default for RawGithubSection {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token_env: default_token_env(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Validated configuration. Only obtainable through
/// `ConfigFile::try_from(RawConfigFile)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub monitor: MonitorConfig,
    pub github: GithubConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    pub backoff_floor: Duration,
    pub backoff_ceiling: Duration,
    pub page_size: u32,
    pub state_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubConfig {
    pub api_url: String,
    pub token_env: String,
    pub request_timeout: Duration,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(monitor: MonitorConfig, github: GithubConfig) -> Self {
        Self { monitor, github }
    }
}
