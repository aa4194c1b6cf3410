//! Project identifiers and build jobs.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a candidate project id was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectIdError {
    #[error("project id is empty")]
    Empty,

    #[error("project id contains invalid character {0:?} (allowed: a-z, 0-9, '-', '_')")]
    InvalidChar(char),

    #[error("project id may not start or end with '-'")]
    EdgeHyphen,
}

/// Validated project identifier.
///
/// Doubles as the log channel suffix, the storage key prefix, and the
/// DNS subdomain label used for routing. DNS labels compare
/// case-insensitively while storage keys do not, so ids are normalized
/// to lowercase at construction — there is exactly one canonical form.
///
/// Uniqueness per tenant is the caller's responsibility.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectId(String);

impl ProjectId {
    /// Parse and normalize a project id.
    pub fn parse(raw: &str) -> Result<Self, ProjectIdError> {
        if raw.is_empty() {
            return Err(ProjectIdError::Empty);
        }
        let id = raw.to_ascii_lowercase();
        for c in id.chars() {
            if !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_') {
                return Err(ProjectIdError::InvalidChar(c));
            }
        }
        if id.starts_with('-') || id.ends_with('-') {
            return Err(ProjectIdError::EdgeHyphen);
        }
        Ok(ProjectId(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Pub/sub channel name for this project's build logs.
    pub fn log_channel(&self) -> String {
        format!("logs:{}", self.0)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ProjectId {
    type Error = ProjectIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ProjectId::parse(&value)
    }
}

impl From<ProjectId> for String {
    fn from(id: ProjectId) -> Self {
        id.0
    }
}

/// One execution instance of a project's build command.
///
/// Ephemeral — created when a deploy is triggered and discarded once a
/// terminal state is reached. Owned by the orchestrator for its lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildJob {
    pub project_id: ProjectId,
    /// Working directory the build command runs in.
    pub source_dir: PathBuf,
    /// Shell command producing static assets under `source_dir`.
    pub build_command: String,
}

impl BuildJob {
    pub fn new(project_id: ProjectId, source_dir: impl Into<PathBuf>, build_command: impl Into<String>) -> Self {
        Self {
            project_id,
            source_dir: source_dir.into(),
            build_command: build_command.into(),
        }
    }
}
