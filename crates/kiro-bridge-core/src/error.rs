use std::path::PathBuf;

use thiserror::Error;

/// Failures talking to the issue tracker or the local repository.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("auth check failed: {0}")]
    AuthFailed(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("{operation} failed (status {status}): {body}")]
    Status {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("could not decode {0}")]
    Decode(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("document not found: {}", .0.display())]
    DocumentNotFound(PathBuf),

    #[error("no task blocks found in {}", .0.display())]
    ParseYieldedEmpty(PathBuf),

    #[error("tracker error: {0}")]
    TrackerApi(#[from] TrackerError),

    #[error("no task number found in {0:?}")]
    NoTaskNumber(String),

    #[error("no open issue found for task {0}")]
    IssueNotFound(String),
}

impl SyncError {
    /// Whether this error class should stop the whole run.
    ///
    /// Tracker errors are fatal here; per-item handling is decided by the
    /// caller's [`FailurePolicy`](crate::FailurePolicy), not by this flag.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SyncError::ParseYieldedEmpty(_))
    }
}
