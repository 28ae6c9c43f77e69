use resource_activator::fetch::mock::{MockFetcher, MockScriptLoader};
use resource_activator::fetch::FetchError;
use resource_activator::{DeclareError, Definition, Registry, RegistryConfig, ResourceKind};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;

/// Manifest resources fetched through registry-wide mock collaborators.
#[tokio::test]
async fn test_manifest_with_default_collaborators() {
    let loader = Arc::new(MockScriptLoader::new());
    let fetcher = Arc::new(MockFetcher::new());
    fetcher
        .expect_fetch("http://localhost/config.json")
        .return_ok(json!({"theme": "dark"}));
    loader.expect_load("http://localhost/widgets.js").return_ok(());

    let registry =
        Registry::with_loaders(RegistryConfig::default(), loader.clone(), fetcher.clone());
    registry
        .declare_manifest(json!([
            { "name": "config", "json": "http://localhost/config.json" },
            { "name": "widgets", "requires": "config", "script": "http://localhost/widgets.js" }
        ]))
        .unwrap()
        .declare(
            Definition::immediate("app", |args| {
                Ok(json!({"theme": args[0]["theme"], "widgets": args[1]}))
            })
            .requires(vec!["config", "widgets"]),
        )
        .unwrap();

    let app = registry.eventual_value_of("app").await.unwrap();
    assert_eq!(app, json!({"theme": "dark", "widgets": null}));

    assert_eq!(loader.loaded(), vec!["http://localhost/widgets.js"]);
    assert_eq!(
        fetcher.requests(),
        vec![(Method::GET, "http://localhost/config.json".to_string())]
    );
    loader.verify();
    fetcher.verify();
}

/// A per-resource fetcher wins over the registry default.
#[tokio::test]
async fn test_per_resource_override() {
    let default_fetcher = Arc::new(MockFetcher::new());
    let own_fetcher = Arc::new(MockFetcher::new());
    own_fetcher.expect_fetch("cfg").return_ok(json!(42));

    let registry = Registry::with_loaders(
        RegistryConfig::default(),
        Arc::new(MockScriptLoader::new()),
        default_fetcher.clone(),
    );
    registry
        .declare(Definition::json("cfg", "cfg").fetcher(own_fetcher.clone()))
        .unwrap();

    assert_eq!(registry.eventual_value_of("cfg").await.unwrap(), json!(42));
    assert!(default_fetcher.requests().is_empty());
    own_fetcher.verify();
}

/// A failed script load fails the script resource and its dependents.
#[tokio::test]
async fn test_script_load_failure() {
    let loader = Arc::new(MockScriptLoader::new());
    loader.expect_load("missing.js").return_err(FetchError::Status {
        url: "missing.js".into(),
        status: 404,
        status_text: "Not Found".into(),
    });

    let registry = Registry::with_loaders(
        RegistryConfig::default(),
        loader.clone(),
        Arc::new(MockFetcher::new()),
    );
    registry
        .declare(Definition::immediate("plugin", |_| Ok(Value::Null)).requires("lib"))
        .unwrap()
        .declare(Definition::script("lib", "missing.js"))
        .unwrap();

    let err = registry.eventual_value_of("plugin").await.unwrap_err();
    assert_eq!(err.to_string(), "missing.js responded with 404 Not Found");
    assert!(loader.loaded().is_empty());
    loader.verify();
}

/// Entries before an invalid one stay declared; the rest are never reached.
#[tokio::test]
async fn test_manifest_stops_at_first_invalid_entry() {
    let config = RegistryConfig {
        spawn_eagerly: false,
        ..RegistryConfig::default()
    };
    let registry = Registry::with_loaders(
        config,
        Arc::new(MockScriptLoader::new()),
        Arc::new(MockFetcher::new()),
    );
    let err = registry
        .declare_manifest(json!([
            { "name": "ok", "script": "ok.js" },
            { "name": "bad", "script": 7 },
            { "name": "never", "script": "never.js" }
        ]))
        .err()
        .unwrap();

    assert_eq!(
        err,
        DeclareError::InvalidUrl {
            name: "bad".into(),
            field: "script"
        }
    );
    let names: Vec<String> = registry.enumerate().map(|r| r.name().to_string()).collect();
    assert_eq!(names, vec!["ok"]);
    assert!(matches!(
        registry.resource_by_name("ok").unwrap().kind(),
        ResourceKind::Script { url, .. } if url == "ok.js"
    ));
}
