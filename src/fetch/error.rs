//! Error types for the script loader and JSON fetcher.

use thiserror::Error;

/// Errors raised while loading a script or fetching a JSON document.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    /// The request never produced a response (DNS, connect, TLS, timeout...).
    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    /// The server answered with a non-success status.
    #[error("{url} responded with {status} {status_text}")]
    Status {
        url: String,
        status: u16,
        status_text: String,
    },

    /// The response did not declare a JSON content type.
    #[error("{url} did not return JSON (content type: {})", content_type.as_deref().unwrap_or("none"))]
    ContentType {
        url: String,
        content_type: Option<String>,
    },

    /// The body claimed to be JSON but did not parse.
    #[error("Could not parse JSON from {url}: {reason}")]
    Parse { url: String, reason: String },
}

impl FetchError {
    /// The URL the failed request was addressed to.
    pub fn url(&self) -> &str {
        match self {
            FetchError::Transport { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::ContentType { url, .. }
            | FetchError::Parse { url, .. } => url,
        }
    }
}
