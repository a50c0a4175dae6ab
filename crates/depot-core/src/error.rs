//! Error types for fetching and repository operations.

use depot_schema::{ContentHash, IndexError};
use thiserror::Error;

/// A failed attempt to bring an artifact into the cache.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The source definitively does not have the artifact. Never retried.
    #[error("Not found: {url}")]
    NotFound { url: String },

    /// The source answered with a non-success status other than 404.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[cfg(feature = "network")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The downloaded bytes do not hash to the descriptor id.
    #[error("Hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        expected: ContentHash,
        actual: ContentHash,
    },
}

impl FetchError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::NotFound { .. })
    }
}

/// Errors surfaced by [`crate::ResourceRepository`].
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Download failed: {0}")]
    Fetch(#[from] FetchError),

    /// The download this request joined failed with the given reason.
    #[error("Download failed: {0}")]
    Joined(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The executor refused the task or the download gate was closed.
    #[error("Executor unavailable: {0}")]
    Executor(String),

    #[error("Invalid name '{0}': must be a single path component")]
    InvalidName(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
