//! # Mock Collaborators
//!
//! Utilities for testing resources without a network.
//!
//! [`MockFetcher`] and [`MockScriptLoader`] replay queued expectations in order:
//! queue a response with `expect_fetch(url).return_ok(..)` (or `return_err`),
//! hand the mock to a registry or a single resource, then call `verify()` to
//! make sure every expectation was consumed.
//!
//! ```ignore
//! let fetcher = Arc::new(MockFetcher::new());
//! fetcher.expect_fetch("http://cfg").return_ok(json!({"debug": true}));
//!
//! registry.declare(Definition::json("config", "http://cfg").fetcher(fetcher.clone()))?;
//! let config = registry.eventual_value_of("config").await?;
//!
//! fetcher.verify();
//! ```

use super::{FetchError, JsonFetcher, ScriptLoader};
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Method;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

/// One queued request and the response it should produce.
struct Expectation<T> {
    url: String,
    response: Result<T, FetchError>,
}

type Queue<T> = Arc<Mutex<VecDeque<Expectation<T>>>>;

/// Pops the next expectation and checks it was meant for `url`.
fn next_response<T>(queue: &Queue<T>, url: &str) -> Result<T, FetchError> {
    let expectation = queue.lock().pop_front();
    match expectation {
        Some(exp) if exp.url == url => exp.response,
        Some(exp) => panic!("Expected request to {}, got {}", exp.url, url),
        None => panic!("Unexpected request to {}", url),
    }
}

/// Builder returned by the `expect_*` methods.
pub struct ExpectationBuilder<T> {
    url: String,
    queue: Queue<T>,
}

impl<T> ExpectationBuilder<T> {
    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, value: T) {
        self.queue.lock().push_back(Expectation {
            url: self.url,
            response: Ok(value),
        });
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: FetchError) {
        self.queue.lock().push_back(Expectation {
            url: self.url,
            response: Err(error),
        });
    }
}

fn verify_queue<T>(queue: &Queue<T>) {
    let remaining = queue.lock().len();
    if remaining != 0 {
        panic!("Not all expectations were met. {} remaining", remaining);
    }
}

// =============================================================================
// JSON FETCHER
// =============================================================================

/// A [`JsonFetcher`] that answers from queued expectations.
#[derive(Default)]
pub struct MockFetcher {
    expectations: Queue<Value>,
    requests: Mutex<Vec<(Method, String)>>,
}

impl MockFetcher {
    /// Creates a new mock fetcher with no expectations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects a fetch of `url`.
    pub fn expect_fetch(&self, url: impl Into<String>) -> ExpectationBuilder<Value> {
        ExpectationBuilder {
            url: url.into(),
            queue: self.expectations.clone(),
        }
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<(Method, String)> {
        self.requests.lock().clone()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        verify_queue(&self.expectations);
    }
}

#[async_trait]
impl JsonFetcher for MockFetcher {
    async fn fetch(&self, url: &str, method: Method) -> Result<Value, FetchError> {
        self.requests.lock().push((method, url.to_string()));
        next_response(&self.expectations, url)
    }
}

// =============================================================================
// SCRIPT LOADER
// =============================================================================

/// A [`ScriptLoader`] that answers from queued expectations.
#[derive(Default)]
pub struct MockScriptLoader {
    expectations: Queue<()>,
    loaded: Mutex<Vec<String>>,
}

impl MockScriptLoader {
    /// Creates a new mock loader with no expectations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects a load of `url`.
    pub fn expect_load(&self, url: impl Into<String>) -> ExpectationBuilder<()> {
        ExpectationBuilder {
            url: url.into(),
            queue: self.expectations.clone(),
        }
    }

    /// URLs that loaded successfully, in order.
    pub fn loaded(&self) -> Vec<String> {
        self.loaded.lock().clone()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        verify_queue(&self.expectations);
    }
}

#[async_trait]
impl ScriptLoader for MockScriptLoader {
    async fn load(&self, url: &str) -> Result<(), FetchError> {
        next_response(&self.expectations, url)?;
        self.loaded.lock().push(url.to_string());
        Ok(())
    }
}
