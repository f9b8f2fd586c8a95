// src/config/validate.rs

use std::path::PathBuf;
use std::time::Duration;

use crate::config::model::{
    ConfigFile, GithubConfig, MonitorConfig, RawConfigFile, RawGithubSection, RawMonitorSection,
};
use crate::errors::{Result, RunwatchError};

/// Largest page the runs listing endpoint accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::RunwatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let monitor = validate_monitor(&raw.monitor)?;
        let github = validate_github(&raw.github)?;
        Ok(ConfigFile::new_unchecked(monitor, github))
    }
}

fn validate_monitor(raw: &RawMonitorSection) -> Result<MonitorConfig> {
    let poll_interval = non_zero_duration("monitor", "poll_interval", &raw.poll_interval)?;
    let backoff_floor = non_zero_duration("monitor", "backoff_floor", &raw.backoff_floor)?;
    let backoff_ceiling = non_zero_duration("monitor", "backoff_ceiling", &raw.backoff_ceiling)?;

    if backoff_floor > backoff_ceiling {
        return Err(RunwatchError::ConfigError(format!(
            "[monitor].backoff_floor ({}) must not exceed backoff_ceiling ({})",
            raw.backoff_floor, raw.backoff_ceiling
        )));
    }

    if raw.page_size == 0 || raw.page_size > MAX_PAGE_SIZE {
        return Err(RunwatchError::ConfigError(format!(
            "[monitor].page_size must be between 1 and {} (got {})",
            MAX_PAGE_SIZE, raw.page_size
        )));
    }

    if raw.state_file.trim().is_empty() {
        return Err(RunwatchError::ConfigError(
            "[monitor].state_file must not be empty".to_string(),
        ));
    }

    Ok(MonitorConfig {
        poll_interval,
        backoff_floor,
        backoff_ceiling,
        page_size: raw.page_size,
        state_file: PathBuf::from(&raw.state_file),
    })
}

fn validate_github(raw: &RawGithubSection) -> Result<GithubConfig> {
    let api_url = raw.api_url.trim();
    if api_url.is_empty() {
        return Err(RunwatchError::ConfigError(
            "[github].api_url must not be empty".to_string(),
        ));
    }
    if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
        return Err(RunwatchError::ConfigError(format!(
            "[github].api_url must be an http(s) URL (got '{api_url}')"
        )));
    }

    if raw.token_env.trim().is_empty() {
        return Err(RunwatchError::ConfigError(
            "[github].token_env must name an environment variable".to_string(),
        ));
    }

    let request_timeout = non_zero_duration("github", "request_timeout", &raw.request_timeout)?;

    Ok(GithubConfig {
        api_url: api_url.trim_end_matches('/').to_string(),
        token_env: raw.token_env.trim().to_string(),
        request_timeout,
    })
}

fn non_zero_duration(section: &str, key: &str, value: &str) -> Result<Duration> {
    let d = parse_duration(value)
        .map_err(|e| RunwatchError::ConfigError(format!("[{section}].{key}: {e}")))?;
    if d.is_zero() {
        return Err(RunwatchError::ConfigError(format!(
            "[{section}].{key} must be greater than zero"
        )));
    }
    Ok(d)
}

/// Parse a duration like `"500ms"`, `"30s"`, `"5m"` or `"1h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs = |mult: u64| {
        value
            .checked_mul(mult)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("duration '{s}' is too large"))
    };

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => secs(1),
        "m" => secs(60),
        "h" => secs(60 * 60),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}
