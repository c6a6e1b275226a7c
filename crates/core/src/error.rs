//! Unified error types for mapmirror.
//!
//! The fetch taxonomy distinguishes a terminal `NotFound` from a retryable
//! `FetchFailure`; everything else is local to the mirror.

use std::path::PathBuf;

/// Hint attached to failures caused by upstream rate limiting.
pub const RATE_LIMIT_HINT: &str = "rate limited by upstream";

/// Unified error types for a mirror run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Upstream answered 404. Never retried.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// Any other non-success status or transport error.
    #[error("FETCH_FAILURE: {url}: {reason}{}", .hint.map(|h| format!(" ({h})")).unwrap_or_default())]
    FetchFailure { url: String, reason: String, hint: Option<&'static str> },

    /// Cache directory could not be enumerated.
    #[error("CACHE_INDEX: {0}")]
    CacheIndex(String),

    /// Filesystem operation failed.
    #[error("IO_ERROR: {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// A content transform could not complete.
    #[error("TRANSFORM_FAILED: {url}: {reason}")]
    Transform { url: String, reason: String },

    /// HTML rewriting failed.
    #[error("HTML_ERROR: {0}")]
    Html(String),

    /// A zone/marker dataset could not be parsed.
    #[error("DATASET_ERROR: {path}: {reason}")]
    Dataset { path: String, reason: String },

    /// Invalid run configuration.
    #[error("CONFIG_ERROR: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// A worker task panicked or was cancelled.
    #[error("TASK_FAILED: {0}")]
    Task(String),
}

impl Error {
    /// Wrap an I/O error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }

    /// Build a fetch failure for an HTTP status, tagging rate-limit codes.
    pub fn from_status(url: impl Into<String>, status: u16) -> Self {
        let hint = matches!(status, 429 | 503).then_some(RATE_LIMIT_HINT);
        Error::FetchFailure { url: url.into(), reason: format!("status {status}"), hint }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Only fetch failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::FetchFailure { .. })
    }
}
