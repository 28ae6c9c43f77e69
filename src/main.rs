//! Demo: activates the resources of a JSON manifest.
//!
//! ```bash
//! RUST_LOG=info cargo run -- manifest.json [config.json]
//! ```
//!
//! The manifest is an array of definitions such as
//! `{ "name": "config", "json": "https://example.com/config.json" }` or
//! `{ "name": "widgets", "requires": "config", "script": "https://example.com/widgets.js" }`.
//! A `report` resource depending on every manifest entry is declared on top.

use futures::future::join_all;
use resource_activator::runtime::setup_tracing;
use resource_activator::{Definition, Registry, RegistryConfig};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{error, info, warn, Instrument};

const SETTLE_TIMEOUT: Duration = Duration::from_secs(60);

async fn read_json(path: &str) -> Result<Value, String> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("{path}: {e}"))?;
    serde_json::from_str(&text).map_err(|e| format!("{path}: {e}"))
}

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let mut args = std::env::args().skip(1);
    let manifest = match args.next() {
        Some(path) => read_json(&path).await?,
        None => json!([]),
    };
    let config: RegistryConfig = match args.next() {
        Some(path) => serde_json::from_value(read_json(&path).await?).map_err(|e| e.to_string())?,
        None => RegistryConfig::default(),
    };

    let registry = Registry::with_config(config).map_err(|e| e.to_string())?;
    registry
        .declare_manifest(manifest)
        .map_err(|e| e.to_string())?;

    let names: Vec<String> = registry.enumerate().map(|r| r.name().to_string()).collect();
    let report_names = names.clone();
    registry
        .declare(
            Definition::immediate("report", move |values| {
                let loaded: serde_json::Map<String, Value> =
                    report_names.iter().cloned().zip(values).collect();
                Ok(json!({ "resources": loaded.len(), "values": loaded }))
            })
            .requires(names),
        )
        .map_err(|e| e.to_string())?;

    let outstanding = registry.outstanding();
    if !outstanding.is_empty() {
        warn!(
            ?outstanding,
            "Some dependencies are never declared; their dependents will not settle"
        );
    }

    let span = tracing::info_span!("activation");
    let settled = async {
        let resources: Vec<_> = registry.enumerate().collect();
        let outcomes = join_all(resources.iter().map(|r| r.settlement())).await;
        for (resource, outcome) in resources.iter().zip(outcomes) {
            match outcome {
                Ok(value) => info!(resource = resource.name(), %value, "Activated"),
                Err(e) => error!(resource = resource.name(), error = %e, "Activation failed"),
            }
        }
    }
    .instrument(span);

    if tokio::time::timeout(SETTLE_TIMEOUT, settled).await.is_err() {
        let pending: Vec<_> = registry
            .enumerate()
            .filter(|r| !r.is_settled())
            .map(|r| r.name().to_string())
            .collect();
        warn!(?pending, "Gave up waiting");
    }

    info!("Done");
    Ok(())
}
