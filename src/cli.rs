// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `runwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "runwatch",
    version,
    about = "Watch a repository's CI workflow runs and print lifecycle events.",
    long_about = None
)]
pub struct CliArgs {
    /// Repository to monitor, as `<owner>/<repo>`.
    #[arg(value_name = "OWNER/REPO")]
    pub repo: String,

    /// Path to the config file (TOML).
    ///
    /// Default: `runwatch.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Where to persist monitor state (overrides `[monitor].state_file`).
    #[arg(long, value_name = "PATH")]
    pub state_file: Option<String>,

    /// Poll interval, e.g. `30s` or `2m` (overrides `[monitor].poll_interval`).
    #[arg(long, value_name = "DURATION")]
    pub interval: Option<String>,

    /// Runs fetched per poll, 1..=100 (overrides `[monitor].page_size`).
    #[arg(long, value_name = "N")]
    pub page_size: Option<u32>,

    /// API base URL, for GitHub Enterprise (overrides `[github].api_url`).
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Run a single poll cycle, then exit.
    #[arg(long)]
    pub once: bool,

    /// Resolve settings and print them along with the persisted state; no API calls.
    #[arg(long)]
    pub dry_run: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RUNWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
