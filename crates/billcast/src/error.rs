//! Error types for the relay.
//!
//! None of these escape a poll cycle: the fetcher turns a [`FetchError`] into
//! an empty batch, the publisher turns a [`PublishError`] into `false`, and the
//! pipeline records a [`StoreError`] in its cycle report.

use thiserror::Error;

/// Errors that can occur when fetching bills from congress.gov.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure (timeout, DNS, connection reset)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("congress.gov returned {status}: {reason}")]
    Status { status: u16, reason: String },

    /// The response body was not the expected JSON document
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Errors that can occur when posting to X.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Transport failure (timeout, DNS, connection reset)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The posting service rejected the request
    #[error("Post rejected with {status} {reason}: {body}")]
    Rejected {
        status: u16,
        reason: String,
        body: String,
    },

    /// Request signing failed
    #[error("OAuth signing failed: {0}")]
    Signing(String),

    /// A success response lacked the expected fields
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Errors that can occur when persisting relay state.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem error
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
