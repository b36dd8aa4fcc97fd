//! Error taxonomy for the collection and analytics pipeline.
//!
//! Only [`AggregationError`] is fatal for a run. Fetch and validation errors
//! are absorbed per platform / per record and surfaced as counts.

use std::io::ErrorKind;

use thiserror::Error;

use crate::model::Platform;

/// A platform fetch failed. Retried up to the configured budget.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid payload file {path}: {reason}")]
    InvalidSource { path: String, reason: String },

    #[error("fetch timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("{0} source is not configured")]
    NotConfigured(Platform),

    #[error("invalid request URL: {0}")]
    Url(String),

    #[error("credential cannot be sent in a {0}")]
    InvalidCredential(&'static str),
}

impl FetchError {
    /// Returns `true` when another attempt could plausibly succeed.
    ///
    /// Client errors other than 408/429, malformed bodies, missing or
    /// unreadable files and missing configuration are permanent for the
    /// lifetime of a run.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Http(_) | FetchError::Timeout { .. } => true,
            FetchError::Io(e) => !matches!(
                e.kind(),
                ErrorKind::NotFound
                    | ErrorKind::PermissionDenied
                    | ErrorKind::InvalidData
                    | ErrorKind::IsADirectory
            ),
            FetchError::Status { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            FetchError::Decode(_)
            | FetchError::InvalidSource { .. }
            | FetchError::NotConfigured(_)
            | FetchError::Url(_)
            | FetchError::InvalidCredential(_) => false,
        }
    }
}

/// A single raw payload could not be normalized. The record is dropped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("missing mandatory field `{0}`")]
    MissingField(&'static str),

    #[error("unknown platform `{0}`")]
    UnknownPlatform(String),

    #[error("unparsable timestamp in `{field}`: {value}")]
    InvalidTimestamp { field: &'static str, value: String },
}

/// The normalized batch violates an invariant the normalizer should have
/// guaranteed. Fatal for the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregationError {
    #[error("duplicate post {platform}/{post_id} in batch")]
    DuplicatePost { platform: Platform, post_id: String },

    #[error("post with empty post_id in batch")]
    EmptyPostId,

    #[error("counter overflow while summing {what}")]
    Overflow { what: &'static str },
}

/// A storage collaborator failed to accept the run output.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("S3 error: {0}")]
    S3(String),
}
