//! Error types for gitops-promote

use thiserror::Error;

/// Errors that abort a promotion run
#[derive(Debug, Error)]
pub enum Error {
    /// A required input is absent or unusable; the run never starts
    #[error("configuration error: {0}")]
    Config(String),

    /// Manifest could not be parsed as a YAML mapping
    #[error("malformed manifest: {0}")]
    MalformedDocument(String),

    /// Expected remote path is absent or of the wrong kind
    #[error("not found: {0}")]
    NotFound(String),

    /// Content hash used for a write no longer matches the remote
    #[error("conflict writing {path}: content changed since it was read")]
    Conflict {
        /// Path of the file that was being written
        path: String,
    },

    /// Any other failure reported by the hosting API
    #[error("GitHub API error: {0}")]
    Remote(String),

    /// Installation token exchange failed
    #[error("authentication error: {0}")]
    Auth(String),

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Bug or invariant violation inside this crate
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<octocrab::Error> for Error {
    fn from(err: octocrab::Error) -> Self {
        Self::Remote(err.to_string())
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
