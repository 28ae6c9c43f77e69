//! Error types for resource declaration and settlement.

use crate::fetch::FetchError;
use thiserror::Error;

/// Errors raised synchronously while validating or registering a definition.
///
/// These never reach a settlement: `declare` returns them directly.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DeclareError {
    /// The definition is malformed (not an object, or several producer sources).
    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    /// `name` is missing, empty, or not a string.
    #[error("Resource has no name")]
    UnnamedResource,

    /// A resource with this name is already declared.
    #[error("Resource already declared: {0}")]
    DuplicateName(String),

    /// `requires` is neither a string nor an array of strings.
    #[error("Invalid requires for {name}: {found}")]
    InvalidRequires { name: String, found: String },

    /// No producer source, or one that cannot be called.
    #[error("Invalid provider for {name}: {reason}")]
    InvalidProvider { name: String, reason: String },

    /// The `script` / `json` URL is not a string.
    #[error("Invalid {field} URL for {name}")]
    InvalidUrl { name: String, field: &'static str },
}

/// Runtime failure captured into a resource's settlement.
///
/// Failures travel as `Arc<ResourceError>`; every dependent of a failed
/// resource observes the very same allocation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResourceError {
    /// The script load or JSON fetch failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The producer returned an error.
    #[error("{0}")]
    Custom(String),

    /// The producer (or its loader) panicked.
    #[error("Producer for {name} panicked: {message}")]
    Panicked { name: String, message: String },
}

impl From<String> for ResourceError {
    fn from(msg: String) -> Self {
        ResourceError::Custom(msg)
    }
}

impl From<&str> for ResourceError {
    fn from(msg: &str) -> Self {
        ResourceError::Custom(msg.to_string())
    }
}
