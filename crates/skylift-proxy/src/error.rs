//! Error types for the edge proxy.

use thiserror::Error;

/// Errors surfaced while resolving or forwarding a request.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The Host header is missing, has no subdomain, or its first
    /// label is not a valid project id. Answered with 400, never
    /// forwarded.
    #[error("cannot resolve host {host:?}: {reason}")]
    BadHost { host: String, reason: String },

    /// The storage backend could not be reached. Answered with 502.
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
}
