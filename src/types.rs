use std::fmt;
use std::str::FromStr;

use regex::Regex;

use crate::errors::RunwatchError;

/// Remote identifier of a workflow run.
pub type RunId = u64;

/// Remote identifier of a job within a run.
pub type JobId = u64;

/// Step number; stable within one job.
pub type StepNumber = u32;

const REPO_SLUG: &str = r"^([A-Za-z0-9][A-Za-z0-9-]*)/([A-Za-z0-9_.-]+)$";

/// A monitored repository, parsed from `owner/repo`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// `owner/repo`, as printed in every event line.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoRef {
    type Err = RunwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let slug = Regex::new(REPO_SLUG).map_err(anyhow::Error::from)?;
        let caps = slug
            .captures(trimmed)
            .ok_or_else(|| RunwatchError::InvalidRepo(s.to_string()))?;

        // `.` and `..` are not repositories even though the charset allows them.
        let name = &caps[2];
        if name == "." || name == ".." {
            return Err(RunwatchError::InvalidRepo(s.to_string()));
        }

        Ok(RepoRef::new(&caps[1], name))
    }
}

/// Shorten a commit SHA to its conventional 7-character prefix.
pub fn shorten_sha(sha: &str) -> String {
    sha.chars().take(7).collect()
}
