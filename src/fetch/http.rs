//! `reqwest`-backed default collaborators.

use super::{FetchError, JsonFetcher, ScriptLoader};
use crate::runtime::HttpConfig;
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Builds the shared HTTP client used by both default collaborators.
pub fn build_client(config: &HttpConfig) -> Result<Client, FetchError> {
    let mut builder = Client::builder().user_agent(config.user_agent.clone());
    if let Some(secs) = config.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder.build().map_err(|e| FetchError::Transport {
        url: String::new(),
        reason: format!("could not build HTTP client: {e}"),
    })
}

/// Rejects any non-2xx status with [`FetchError::Status`].
pub fn check_status(url: &str, status: StatusCode) -> Result<(), FetchError> {
    if status.is_success() {
        return Ok(());
    }
    Err(FetchError::Status {
        url: url.to_string(),
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
    })
}

/// Classifies a finished HTTP response.
///
/// Kept separate from the transport so the status / content-type / parse rules
/// can be exercised without a server.
pub fn decode_json_response(
    url: &str,
    status: StatusCode,
    content_type: Option<&str>,
    body: &str,
) -> Result<Value, FetchError> {
    check_status(url, status)?;

    // Accept `application/json`, `application/json; charset=...` and `+json` suffixes.
    let is_json = content_type
        .map(|ct| ct.to_ascii_lowercase().contains("json"))
        .unwrap_or(false);
    if !is_json {
        return Err(FetchError::ContentType {
            url: url.to_string(),
            content_type: content_type.map(str::to_string),
        });
    }

    serde_json::from_str(body).map_err(|e| FetchError::Parse {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

fn transport_error(url: &str, err: reqwest::Error) -> FetchError {
    FetchError::Transport {
        url: url.to_string(),
        reason: err.to_string(),
    }
}

/// Default [`JsonFetcher`]: issues the request and runs it through
/// [`decode_json_response`].
#[derive(Clone, Debug)]
pub struct HttpJsonFetcher {
    client: Client,
}

impl HttpJsonFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpJsonFetcher {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

#[async_trait]
impl JsonFetcher for HttpJsonFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str, method: Method) -> Result<Value, FetchError> {
        debug!("Sending request");
        let response = self
            .client
            .request(method, url)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(|e| transport_error(url, e))?;
        debug!(%status, ?content_type, bytes = body.len(), "Response received");

        decode_json_response(url, status, content_type.as_deref(), &body)
    }
}

/// A script that has been injected into a [`Document`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedScript {
    pub url: String,
    pub source: String,
}

/// The active document scripts are injected into, in load order.
#[derive(Debug, Default)]
pub struct Document {
    scripts: Mutex<Vec<LoadedScript>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a script to the document.
    pub fn inject(&self, url: impl Into<String>, source: impl Into<String>) {
        self.scripts.lock().push(LoadedScript {
            url: url.into(),
            source: source.into(),
        });
    }

    /// Snapshot of the scripts loaded so far.
    pub fn scripts(&self) -> Vec<LoadedScript> {
        self.scripts.lock().clone()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.scripts.lock().iter().any(|s| s.url == url)
    }
}

/// Default [`ScriptLoader`]: downloads the script source and injects it into
/// its [`Document`].
#[derive(Clone, Debug)]
pub struct HttpScriptLoader {
    client: Client,
    document: Arc<Document>,
}

impl HttpScriptLoader {
    pub fn new(client: Client, document: Arc<Document>) -> Self {
        Self { client, document }
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }
}

#[async_trait]
impl ScriptLoader for HttpScriptLoader {
    #[instrument(skip(self))]
    async fn load(&self, url: &str) -> Result<(), FetchError> {
        debug!("Sending request");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        check_status(url, response.status())?;

        let source = response.text().await.map_err(|e| transport_error(url, e))?;
        debug!(bytes = source.len(), "Script injected");
        self.document.inject(url, source);
        Ok(())
    }
}
