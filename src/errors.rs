// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::github::FetchError;

#[derive(Error, Debug)]
pub enum RunwatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid repository '{0}' (expected <owner>/<repo>)")]
    InvalidRepo(String),

    #[error("Missing API token: environment variable {0} is not set")]
    MissingToken(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Persisting state failed: {0}")]
    Persistence(String),

    #[error("Event sink failed: {0}")]
    Sink(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RunwatchError>;
