//! Collaborators that turn a URL into a resource value.
//!
//! A [`Script`](crate::resource::ResourceKind::Script) resource settles once its
//! script has been loaded into the active [`Document`]; a
//! [`Json`](crate::resource::ResourceKind::Json) resource settles with the parsed
//! body of an HTTP response. Both mechanisms sit behind a trait so a registry
//! (or a single resource) can swap in whatever loading facility the host already
//! has.
//!
//! - [`HttpJsonFetcher`] / [`HttpScriptLoader`] - the `reqwest`-backed defaults
//! - [`mock`] - expectation-driven fakes for tests

pub mod error;
pub mod http;
pub mod mock;

pub use error::*;
pub use http::*;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;

/// Loads an external script into the active document.
///
/// Resolves with no value once the script is in place; a failed load surfaces
/// as a [`FetchError`] carrying the status or transport error.
#[async_trait]
pub trait ScriptLoader: Send + Sync {
    async fn load(&self, url: &str) -> Result<(), FetchError>;
}

/// Fetches and parses a JSON document.
///
/// Implementations must reject non-success statuses, responses whose content
/// type is not JSON, and bodies that fail to parse.
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    async fn fetch(&self, url: &str, method: Method) -> Result<Value, FetchError>;

    /// `fetch` with the default `GET` method.
    async fn get(&self, url: &str) -> Result<Value, FetchError> {
        self.fetch(url, Method::GET).await
    }
}

/// The loader and fetcher a registry falls back to when a resource brings no
/// override of its own.
#[derive(Clone)]
pub struct Collaborators {
    pub script_loader: Arc<dyn ScriptLoader>,
    pub fetcher: Arc<dyn JsonFetcher>,
}
