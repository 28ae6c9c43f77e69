//! # Resources
//!
//! A [`Resource`] is one named unit of work: its dependency names, its
//! producer source ([`ResourceKind`]) and its [`Settlement`], the single shared
//! future that eventually holds the produced value or the failure.
//!
//! ## Settlement protocol
//!
//! 1. Every dependency settlement is awaited concurrently.
//! 2. The first dependency failure fails this resource with the *same*
//!    [`Failure`]; the producer is never called.
//! 3. Otherwise the producer runs exactly once, receiving the dependency values
//!    in `requires` order. Its result (or panic) becomes the settlement.
//!
//! The settlement is a [`Shared`] future, so every observer sees the one
//! memoized outcome and the producer is never re-run.
//!
//! The work itself (steps 1 to 3) is a separate job that the first poll of the
//! settlement hands to the Tokio runtime. The settlement only waits on a
//! one-shot channel the job completes, so awaiting a dependency never polls
//! that dependency's own dependencies on the same stack, however long the
//! chain. Outside a runtime the job runs on the awaiting task instead.

pub mod definition;
pub mod error;

pub use definition::*;
pub use error::*;

use crate::fetch::{Collaborators, JsonFetcher, ScriptLoader};
use futures::future::{self, try_join_all, BoxFuture, Shared};
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// A runtime failure, shared by every resource it propagates to.
pub type Failure = Arc<ResourceError>;

/// What a settlement resolves to.
pub type Outcome = Result<Value, Failure>;

/// The eventual, memoized outcome of a resource (or of a pending name).
pub type Settlement = Shared<BoxFuture<'static, Outcome>>;

/// A resource's computation, from joining its dependencies to sending the outcome.
type Job = BoxFuture<'static, ()>;

/// A callable that computes a resource value from its dependency values.
pub type Producer =
    Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, Result<Value, ResourceError>> + Send + Sync>;

/// Where a resource's value comes from.
#[derive(Clone)]
pub enum ResourceKind {
    /// Computed in-process.
    Function(Producer),
    /// Settles with `null` once the script at `url` is loaded.
    Script {
        url: String,
        loader: Option<Arc<dyn ScriptLoader>>,
    },
    /// Settles with the JSON document at `url`.
    Json {
        url: String,
        fetcher: Option<Arc<dyn JsonFetcher>>,
    },
}

impl fmt::Debug for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Function(_) => f.write_str("Function"),
            ResourceKind::Script { url, loader } => f
                .debug_struct("Script")
                .field("url", url)
                .field("custom_loader", &loader.is_some())
                .finish(),
            ResourceKind::Json { url, fetcher } => f
                .debug_struct("Json")
                .field("url", url)
                .field("custom_fetcher", &fetcher.is_some())
                .finish(),
        }
    }
}

/// A declared resource.
pub struct Resource {
    name: String,
    requires: Vec<String>,
    kind: ResourceKind,
    settlement: Settlement,
}

impl Resource {
    /// Wires a validated blueprint to its dependency settlements.
    ///
    /// `dependencies` must line up with `blueprint.requires`. Nothing runs until
    /// the returned resource's settlement is polled.
    pub fn activate(
        blueprint: Blueprint,
        dependencies: Vec<Settlement>,
        defaults: &Collaborators,
    ) -> Self {
        let Blueprint {
            name,
            requires,
            kind,
        } = blueprint;

        let work = produce(name.clone(), kind.clone(), defaults.clone());
        let resource = name.clone();
        let (resolver, resolution) = oneshot::channel::<Outcome>();
        let job: Job = async move {
            let args = match try_join_all(dependencies).await {
                Ok(args) => args,
                Err(failure) => {
                    warn!(%resource, error = %failure, "Dependency failed");
                    let _ = resolver.send(Err(failure));
                    return;
                }
            };
            debug!(%resource, "Dependencies satisfied");

            let outcome = match AssertUnwindSafe(async move { work(args).await })
                .catch_unwind()
                .await
            {
                Ok(result) => result.map_err(Arc::new),
                Err(panic) => Err(Arc::new(ResourceError::Panicked {
                    name: resource.clone(),
                    message: panic_message(panic.as_ref()),
                })),
            };
            match &outcome {
                Ok(_) => info!(%resource, "Settled"),
                Err(failure) => warn!(%resource, error = %failure, "Failed"),
            }
            let _ = resolver.send(outcome);
        }
        .boxed();

        let settlement = async move {
            start(job).await;
            match resolution.await {
                Ok(outcome) => outcome,
                // The job was dropped unfinished, e.g. by a runtime shutdown.
                Err(_) => future::pending().await,
            }
        }
        .boxed()
        .shared();

        Self {
            name,
            requires,
            kind,
            settlement,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dependency names, in the order their values reach the producer.
    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    /// A handle on the resource's eventual outcome.
    pub fn settlement(&self) -> Settlement {
        self.settlement.clone()
    }

    /// The outcome, if the resource has already settled.
    pub fn outcome(&self) -> Option<Outcome> {
        self.settlement.peek().cloned()
    }

    pub fn is_settled(&self) -> bool {
        self.settlement.peek().is_some()
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("requires", &self.requires)
            .field("kind", &self.kind)
            .field("settled", &self.is_settled())
            .finish()
    }
}

/// Hands the job to the current runtime, or runs it in place when there is none.
async fn start(job: Job) {
    match Handle::try_current() {
        Ok(handle) => {
            handle.spawn(job);
        }
        Err(_) => job.await,
    }
}

/// Resolves the producer source into a single call taking the dependency values.
fn produce(
    name: String,
    kind: ResourceKind,
    defaults: Collaborators,
) -> impl FnOnce(Vec<Value>) -> BoxFuture<'static, Result<Value, ResourceError>> {
    move |args| match kind {
        ResourceKind::Function(producer) => producer(args),
        ResourceKind::Script { url, loader } => {
            let loader = loader.unwrap_or(defaults.script_loader);
            async move {
                debug!(resource = %name, %url, "Loading script");
                loader.load(&url).await?;
                Ok::<_, ResourceError>(Value::Null)
            }
            .boxed()
        }
        ResourceKind::Json { url, fetcher } => {
            let fetcher = fetcher.unwrap_or(defaults.fetcher);
            async move {
                debug!(resource = %name, %url, "Fetching JSON");
                let value = fetcher.get(&url).await?;
                Ok::<_, ResourceError>(value)
            }
            .boxed()
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::mock::{MockFetcher, MockScriptLoader};
    use crate::fetch::FetchError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn collaborators() -> (Arc<MockScriptLoader>, Arc<MockFetcher>, Collaborators) {
        let loader = Arc::new(MockScriptLoader::new());
        let fetcher = Arc::new(MockFetcher::new());
        let defaults = Collaborators {
            script_loader: loader.clone(),
            fetcher: fetcher.clone(),
        };
        (loader, fetcher, defaults)
    }

    fn ready(outcome: Outcome) -> Settlement {
        futures::future::ready(outcome).boxed().shared()
    }

    #[tokio::test]
    async fn test_producer_receives_values_in_order() {
        let (_, _, defaults) = collaborators();
        let blueprint = Definition::immediate("sum", |args| Ok(json!([args[0], args[1]])))
            .requires(vec!["a", "b"])
            .validate()
            .unwrap();

        let resource = Resource::activate(
            blueprint,
            vec![ready(Ok(json!(1))), ready(Ok(json!(2)))],
            &defaults,
        );
        assert!(!resource.is_settled());
        assert!(resource.outcome().is_none());
        assert_eq!(resource.settlement().await.unwrap(), json!([1, 2]));
        assert!(resource.is_settled());
        assert_eq!(resource.outcome().unwrap().unwrap(), json!([1, 2]));
    }

    #[tokio::test]
    async fn test_dependency_failure_skips_producer() {
        let (_, _, defaults) = collaborators();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let blueprint = Definition::immediate("dependent", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        })
        .requires("broken")
        .validate()
        .unwrap();

        let failure: Failure = Arc::new(ResourceError::Custom("boom".into()));
        let resource = Resource::activate(blueprint, vec![ready(Err(failure.clone()))], &defaults);

        let err = resource.settlement().await.unwrap_err();
        assert!(Arc::ptr_eq(&err, &failure));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_work_runs_without_the_settlement_being_held() {
        let (_, _, defaults) = collaborators();
        let (tx, rx) = tokio::sync::oneshot::channel();
        let tx = parking_lot::Mutex::new(Some(tx));
        let blueprint = Definition::immediate("side_effect", move |_| {
            if let Some(tx) = tx.lock().take() {
                let _ = tx.send(());
            }
            Ok(Value::Null)
        })
        .validate()
        .unwrap();

        let resource = Resource::activate(blueprint, vec![], &defaults);
        // Poll once so the job is handed to the runtime, then walk away.
        let mut settlement = resource.settlement();
        assert!(futures::poll!(&mut settlement).is_pending());
        drop(settlement);

        tokio::time::timeout(std::time::Duration::from_secs(1), rx)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_panicking_producer_settles_with_failure() {
        let (_, _, defaults) = collaborators();
        let blueprint = Definition::immediate("explodes", |_| panic!("kaboom"))
            .validate()
            .unwrap();

        let resource = Resource::activate(blueprint, vec![], &defaults);
        let err = resource.settlement().await.unwrap_err();
        assert_eq!(
            *err,
            ResourceError::Panicked {
                name: "explodes".into(),
                message: "kaboom".into()
            }
        );
    }

    #[tokio::test]
    async fn test_script_and_json_use_default_collaborators() {
        let (loader, fetcher, defaults) = collaborators();
        loader.expect_load("lib.js").return_ok(());
        fetcher.expect_fetch("cfg.json").return_err(FetchError::ContentType {
            url: "cfg.json".into(),
            content_type: Some("text/plain".into()),
        });

        let script = Resource::activate(
            Definition::script("lib", "lib.js").validate().unwrap(),
            vec![],
            &defaults,
        );
        let json = Resource::activate(
            Definition::json("cfg", "cfg.json").validate().unwrap(),
            vec![],
            &defaults,
        );

        assert_eq!(script.settlement().await.unwrap(), Value::Null);
        let err = json.settlement().await.unwrap_err();
        assert!(matches!(*err, ResourceError::Fetch(FetchError::ContentType { .. })));

        loader.verify();
        fetcher.verify();
    }
}
