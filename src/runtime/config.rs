//! Registry configuration.

use serde::{Deserialize, Serialize};

/// Settings for a [`Registry`](crate::registry::Registry).
///
/// Deserialisable so it can live next to a resource manifest:
///
/// ```json
/// { "spawn_eagerly": true, "http": { "timeout_secs": 10 } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Spawn each settlement onto the current Tokio runtime as soon as the
    /// resource is declared. When off (or outside a runtime) a settlement only
    /// makes progress while something awaits it.
    pub spawn_eagerly: bool,

    /// Settings for the default HTTP collaborators.
    pub http: HttpConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            spawn_eagerly: true,
            http: HttpConfig::default(),
        }
    }
}

/// Settings for [`HttpJsonFetcher`](crate::fetch::HttpJsonFetcher) and
/// [`HttpScriptLoader`](crate::fetch::HttpScriptLoader).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Whole-request timeout. `None` waits forever.
    pub timeout_secs: Option<u64>,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Some(30),
            user_agent: concat!("resource-activator/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_falls_back_to_defaults() {
        let config: RegistryConfig =
            serde_json::from_str(r#"{ "http": { "timeout_secs": null } }"#).unwrap();
        assert!(config.spawn_eagerly);
        assert_eq!(config.http.timeout_secs, None);
        assert!(config.http.user_agent.starts_with("resource-activator/"));
    }
}
