//! Error types for artifact storage.

use thiserror::Error;

/// Result type alias for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while publishing artifacts.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk output root: {0}")]
    Walk(String),

    #[error("upload of {key} failed: {source}")]
    Http {
        key: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("upload of {key} rejected with status {status}")]
    Status { key: String, status: u16 },

    #[error("upload task panicked: {0}")]
    Join(String),
}

impl StoreError {
    /// The storage key or path the failure is attributed to, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            StoreError::Io { path, .. } => Some(path),
            StoreError::Http { key, .. } | StoreError::Status { key, .. } => Some(key),
            StoreError::Walk(_) | StoreError::Join(_) => None,
        }
    }
}
