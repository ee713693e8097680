//! Error types for GitHub operations

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type for GitHub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during GitHub operations
#[derive(Error, Debug)]
pub enum Error {
    /// Network-level failure worth retrying (connect, timeout, reset)
    #[error("Transient network error: {0}")]
    Transient(String),

    /// Rate limit hit; `reset_at` comes from the response headers when present
    #[error("GitHub rate limit exceeded{}", .reset_at.map(|t| format!(", resets at {}", t)).unwrap_or_default())]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    /// Non-success HTTP status other than a rate limit
    #[error("GitHub API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// A request kept failing after every allowed attempt
    #[error("Giving up on {resource} after {attempts} attempts: {source}")]
    RetriesExhausted {
        resource: String,
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    /// Issue URL without a trailing issue number
    #[error("Cannot derive issue number from URL: {0}")]
    InvalidIssueUrl(String),

    /// Authentication error
    #[error("GitHub authentication error: {0}")]
    Auth(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the retry policy should try the request again
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient(_))
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::RateLimited { .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Error::Parse(err.to_string())
        } else if err.is_builder() {
            Error::Other(err.to_string())
        } else {
            // connect, timeout, body read and protocol errors
            Error::Transient(err.to_string())
        }
    }
}
