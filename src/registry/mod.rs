//! # Registry
//!
//! The activator. A [`Registry`] owns two tables:
//!
//! - **declared**: name → [`Resource`]. Resources never leave once added.
//! - **outstanding**: name → [`PendingSlot`] for names that something asked
//!   for before they were declared.
//!
//! A name lives in at most one of the two tables. Declaring a resource moves
//! its name out of *outstanding* (settling the slot with the resource's own
//! settlement) and into *declared*.
//!
//! ## Concurrency Model
//!
//! Both tables sit behind one lock that is only held for the synchronous body
//! of [`declare`](Registry::declare) / [`eventual_value_of`](Registry::eventual_value_of),
//! never across an await. Settlements run outside the lock, on the Tokio
//! runtime when [`RegistryConfig::spawn_eagerly`] is set.
//!
//! ## Cycles
//!
//! A dependency cycle is not detected: every resource on it waits on the
//! next forever, and since all of them are declared `outstanding()` stays
//! empty.

pub mod slot;

pub use slot::PendingSlot;

use crate::fetch::{
    build_client, Collaborators, Document, HttpJsonFetcher, HttpScriptLoader, JsonFetcher,
    ScriptLoader,
};
use crate::resource::{DeclareError, Definition, Resource, Settlement};
use crate::runtime::RegistryConfig;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A namespace of resources and the promise broker between them.
///
/// Cloning yields another handle on the same namespace; separate
/// `Registry::new()` calls never share state.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<Inner>,
}

struct Inner {
    tables: Mutex<Tables>,
    defaults: Collaborators,
    document: Option<Arc<Document>>,
    spawn_eagerly: bool,
}

#[derive(Default)]
struct Tables {
    declared: BTreeMap<String, Arc<Resource>>,
    outstanding: BTreeMap<String, PendingSlot>,
}

impl Tables {
    fn eventual_value_of(&mut self, name: &str) -> Settlement {
        if let Some(resource) = self.declared.get(name) {
            return resource.settlement();
        }
        if let Some(slot) = self.outstanding.get(name) {
            return slot.settlement();
        }

        debug!(resource = name, "Forward reference, creating pending slot");
        let slot = PendingSlot::new(name);
        let settlement = slot.settlement();
        self.outstanding.insert(name.to_string(), slot);
        settlement
    }
}

impl Registry {
    /// A registry with the default configuration and HTTP collaborators.
    pub fn new() -> Self {
        let config = RegistryConfig::default();
        let client = build_client(&config.http).unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to a default HTTP client");
            reqwest::Client::new()
        });
        Self::with_client(config, client)
    }

    /// A registry whose HTTP collaborators are built from `config`.
    pub fn with_config(config: RegistryConfig) -> Result<Self, crate::fetch::FetchError> {
        let client = build_client(&config.http)?;
        Ok(Self::with_client(config, client))
    }

    /// A registry that falls back to the given collaborators instead of HTTP.
    pub fn with_loaders(
        config: RegistryConfig,
        script_loader: Arc<dyn ScriptLoader>,
        fetcher: Arc<dyn JsonFetcher>,
    ) -> Self {
        Self::from_parts(
            config,
            Collaborators {
                script_loader,
                fetcher,
            },
            None,
        )
    }

    fn with_client(config: RegistryConfig, client: reqwest::Client) -> Self {
        let document = Arc::new(Document::new());
        let defaults = Collaborators {
            script_loader: Arc::new(HttpScriptLoader::new(client.clone(), document.clone())),
            fetcher: Arc::new(HttpJsonFetcher::new(client)),
        };
        Self::from_parts(config, defaults, Some(document))
    }

    fn from_parts(
        config: RegistryConfig,
        defaults: Collaborators,
        document: Option<Arc<Document>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                tables: Mutex::new(Tables::default()),
                defaults,
                document,
                spawn_eagerly: config.spawn_eagerly,
            }),
        }
    }

    /// Validates `definition`, registers it and wires it to its dependencies.
    ///
    /// Validation and duplicate-name errors are returned here, synchronously.
    /// Anything that goes wrong later (a failed fetch, a producer error) ends
    /// up in the resource's settlement instead. Returns `self` for chaining:
    ///
    /// ```ignore
    /// registry
    ///     .declare(Definition::immediate("a", |_| Ok(json!(1))))?
    ///     .declare(Definition::immediate("b", |_| Ok(json!(2))))?;
    /// ```
    pub fn declare(&self, definition: Definition) -> Result<&Self, DeclareError> {
        let blueprint = definition.validate().inspect_err(|e| {
            warn!(error = %e, "Rejected definition");
        })?;

        let (resource, slot) = {
            let mut tables = self.inner.tables.lock();
            if tables.declared.contains_key(&blueprint.name) {
                warn!(resource = %blueprint.name, "Duplicate declaration");
                return Err(DeclareError::DuplicateName(blueprint.name));
            }

            let dependencies = blueprint
                .requires
                .iter()
                .map(|dep| tables.eventual_value_of(dep))
                .collect();
            let resource = Arc::new(Resource::activate(
                blueprint,
                dependencies,
                &self.inner.defaults,
            ));
            let name = resource.name().to_string();
            let slot = tables.outstanding.remove(&name);
            tables.declared.insert(name, resource.clone());
            (resource, slot)
        };

        if let Some(slot) = slot {
            slot.settle(resource.settlement());
        }
        info!(resource = resource.name(), requires = ?resource.requires(), "Declared");

        if self.inner.spawn_eagerly {
            self.drive(&resource);
        }
        Ok(self)
    }

    /// Declares every entry of a JSON array, in order.
    ///
    /// Stops at the first invalid entry; entries before it stay declared.
    pub fn declare_manifest(&self, manifest: Value) -> Result<&Self, DeclareError> {
        let entries = match manifest {
            Value::Array(entries) => entries,
            _ => {
                return Err(DeclareError::InvalidResource(
                    "manifest must be an array of definitions".to_string(),
                ))
            }
        };
        for entry in entries {
            self.declare(Definition::try_from(entry)?)?;
        }
        Ok(self)
    }

    /// The declared resource called `name`, if any.
    pub fn resource_by_name(&self, name: &str) -> Option<Arc<Resource>> {
        self.inner.tables.lock().declared.get(name).cloned()
    }

    /// The eventual value of `name`, whether or not it is declared yet.
    ///
    /// Requesting an undeclared name records it as outstanding; every
    /// requester of that name shares one settlement, which follows the
    /// resource once it is declared and stays pending if it never is.
    pub fn eventual_value_of(&self, name: &str) -> Settlement {
        self.inner.tables.lock().eventual_value_of(name)
    }

    /// Names that have been requested but not declared, sorted.
    pub fn outstanding(&self) -> Vec<String> {
        self.inner.tables.lock().outstanding.keys().cloned().collect()
    }

    /// The declared resources, ordered by name.
    ///
    /// Each call takes a fresh snapshot; outstanding names never appear.
    pub fn enumerate(&self) -> Resources {
        let snapshot: Vec<_> = self.inner.tables.lock().declared.values().cloned().collect();
        Resources {
            inner: snapshot.into_iter(),
        }
    }

    /// The document the default script loader injects into.
    ///
    /// `None` when the registry was built with custom collaborators.
    pub fn document(&self) -> Option<&Arc<Document>> {
        self.inner.document.as_ref()
    }

    /// Spawns the settlement so the producer runs without anyone awaiting it.
    fn drive(&self, resource: &Resource) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let settlement = resource.settlement();
                handle.spawn(async move {
                    let _ = settlement.await;
                });
            }
            Err(_) => {
                debug!(resource = resource.name(), "No runtime, settlement runs on first await");
            }
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over declared resources in name order. See [`Registry::enumerate`].
pub struct Resources {
    inner: std::vec::IntoIter<Arc<Resource>>,
}

impl Iterator for Resources {
    type Item = Arc<Resource>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Resources {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::mock::{MockFetcher, MockScriptLoader};
    use serde_json::json;

    fn registry() -> Registry {
        Registry::with_loaders(
            RegistryConfig::default(),
            Arc::new(MockScriptLoader::new()),
            Arc::new(MockFetcher::new()),
        )
    }

    fn constant(name: &str, value: Value) -> Definition {
        Definition::immediate(name, move |_| Ok(value.clone()))
    }

    #[tokio::test]
    async fn test_declare_is_chainable() {
        let registry = registry();
        registry
            .declare(constant("a", json!(1)))
            .unwrap()
            .declare(constant("b", json!(2)))
            .unwrap();

        assert!(registry.resource_by_name("a").is_some());
        assert!(registry.resource_by_name("b").is_some());
        assert!(registry.resource_by_name("c").is_none());
    }

    #[tokio::test]
    async fn test_duplicate_name_keeps_first() {
        let registry = registry();
        registry.declare(constant("a", json!("first"))).unwrap();

        let err = registry.declare(constant("a", json!("second"))).err().unwrap();
        assert_eq!(err, DeclareError::DuplicateName("a".into()));

        let value = registry.eventual_value_of("a").await.unwrap();
        assert_eq!(value, json!("first"));
    }

    #[tokio::test]
    async fn test_name_never_in_both_tables() {
        let registry = registry();
        let _pending = registry.eventual_value_of("x");
        assert_eq!(registry.outstanding(), vec!["x"]);
        assert!(registry.resource_by_name("x").is_none());

        registry.declare(constant("x", json!(1))).unwrap();
        assert!(registry.outstanding().is_empty());
        assert!(registry.resource_by_name("x").is_some());
    }

    #[tokio::test]
    async fn test_requests_share_one_slot() {
        let registry = registry();
        let first = registry.eventual_value_of("later");
        let second = registry.eventual_value_of("later");
        assert_eq!(registry.outstanding(), vec!["later"]);

        registry.declare(constant("later", json!(7))).unwrap();
        assert_eq!(first.await.unwrap(), json!(7));
        assert_eq!(second.await.unwrap(), json!(7));
    }

    #[tokio::test]
    async fn test_invalid_definition_registers_nothing() {
        let registry = registry();
        let err = registry
            .declare(Definition::named("broken").requires(json!(3)).script_url("x.js"))
            .err()
            .unwrap();
        assert!(matches!(err, DeclareError::InvalidRequires { .. }));
        assert_eq!(registry.enumerate().count(), 0);
        assert!(registry.outstanding().is_empty());
    }

    #[tokio::test]
    async fn test_manifest_must_be_an_array() {
        let registry = registry();
        let err = registry
            .declare_manifest(json!({"name": "a", "json": "a.json"}))
            .err()
            .unwrap();
        assert!(matches!(err, DeclareError::InvalidResource(_)));
    }

    #[test]
    fn test_lazy_without_runtime() {
        let registry = registry();
        registry.declare(constant("a", json!(1))).unwrap();

        let resource = registry.resource_by_name("a").unwrap();
        assert!(!resource.is_settled());
        let value = futures::executor::block_on(registry.eventual_value_of("a")).unwrap();
        assert_eq!(value, json!(1));
        assert!(resource.is_settled());
    }

    #[test]
    fn test_default_registry_has_a_document() {
        let registry = Registry::new();
        assert!(registry.document().is_some());
        assert!(registry.enumerate().next().is_none());
    }
}
