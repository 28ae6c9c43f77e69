//! Resource definitions and their validation.
//!
//! A [`Definition`] is the loose, caller-supplied description of a resource. It
//! can be assembled with the typed builders or parsed from a JSON object (a
//! manifest entry). [`Definition::validate`] applies the construction rules in
//! order and yields a [`Blueprint`] whose producer source is a closed
//! [`ResourceKind`]:
//!
//! 1. the definition must be an object (`InvalidResource`)
//! 2. `name` must be a non-empty string (`UnnamedResource`)
//! 3. `requires` must normalise to a list of strings (`InvalidRequires`)
//! 4. exactly one producer source: a field named after the resource, `script`
//!    or `json` (`InvalidProvider` when missing, `InvalidResource` when several)
//! 5. a `script` / `json` URL must be a string (`InvalidUrl`)
//! 6. the producer and any loader override must be callable (`InvalidProvider`)

use super::{DeclareError, Producer, ResourceError, ResourceKind};
use crate::fetch::{JsonFetcher, ScriptLoader};
use futures::FutureExt;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;

/// A definition field that should hold a callable.
///
/// Definitions parsed from JSON can only carry data, which rule 6 rejects.
#[derive(Clone)]
enum Field<T> {
    Callable(T),
    Data(Value),
}

/// Caller-supplied description of a resource, validated on `declare`.
#[derive(Clone, Default)]
pub struct Definition {
    name: Option<Value>,
    requires: Option<Value>,
    producer: Option<Field<Producer>>,
    script: Option<Value>,
    json: Option<Value>,
    script_loader: Option<Field<Arc<dyn ScriptLoader>>>,
    fetcher: Option<Field<Arc<dyn JsonFetcher>>>,
}

/// The validated shape of a resource, ready to be registered.
#[derive(Clone, Debug)]
pub struct Blueprint {
    pub name: String,
    pub requires: Vec<String>,
    pub kind: ResourceKind,
}

impl Definition {
    /// An empty definition carrying only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(Value::String(name.into())),
            ..Self::default()
        }
    }

    /// A resource computed by an async producer.
    ///
    /// The producer receives the dependency values in `requires` order.
    pub fn function<F, Fut>(name: impl Into<String>, producer: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ResourceError>> + Send + 'static,
    {
        Self::named(name).producer(producer)
    }

    /// A resource computed by a synchronous producer.
    pub fn immediate<F>(name: impl Into<String>, producer: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, ResourceError> + Send + Sync + 'static,
    {
        Self::named(name).immediate_producer(producer)
    }

    /// A resource that settles once the script at `url` has loaded.
    pub fn script(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::named(name).script_url(url)
    }

    /// A resource that settles with the JSON document at `url`.
    pub fn json(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::named(name).json_url(url)
    }

    /// Sets the dependencies: a single name, a list of names, or nothing.
    pub fn requires(mut self, requires: impl Into<Value>) -> Self {
        self.requires = Some(requires.into());
        self
    }

    pub fn producer<F, Fut>(mut self, producer: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ResourceError>> + Send + 'static,
    {
        let producer: Producer = Arc::new(move |args| producer(args).boxed());
        self.producer = Some(Field::Callable(producer));
        self
    }

    pub fn immediate_producer<F>(mut self, producer: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, ResourceError> + Send + Sync + 'static,
    {
        let producer: Producer = Arc::new(move |args| futures::future::ready(producer(args)).boxed());
        self.producer = Some(Field::Callable(producer));
        self
    }

    pub fn script_url(mut self, url: impl Into<String>) -> Self {
        self.script = Some(Value::String(url.into()));
        self
    }

    pub fn json_url(mut self, url: impl Into<String>) -> Self {
        self.json = Some(Value::String(url.into()));
        self
    }

    /// Overrides the registry's script loader for this resource.
    pub fn script_loader(mut self, loader: Arc<dyn ScriptLoader>) -> Self {
        self.script_loader = Some(Field::Callable(loader));
        self
    }

    /// Overrides the registry's JSON fetcher for this resource.
    pub fn fetcher(mut self, fetcher: Arc<dyn JsonFetcher>) -> Self {
        self.fetcher = Some(Field::Callable(fetcher));
        self
    }

    /// The declared name, if it is a string.
    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().and_then(Value::as_str)
    }

    /// Applies the construction rules.
    pub fn validate(self) -> Result<Blueprint, DeclareError> {
        let name = match self.name {
            Some(Value::String(name)) if !name.is_empty() => name,
            _ => return Err(DeclareError::UnnamedResource),
        };

        let requires = normalize_requires(&name, self.requires)?;

        let sources: Vec<&str> = [
            self.producer.as_ref().map(|_| "function"),
            self.script.as_ref().map(|_| "script"),
            self.json.as_ref().map(|_| "json"),
        ]
        .into_iter()
        .flatten()
        .collect();
        if sources.is_empty() {
            return Err(DeclareError::InvalidProvider {
                name,
                reason: "no function, script or json source".to_string(),
            });
        }
        if sources.len() > 1 {
            return Err(DeclareError::InvalidResource(format!(
                "{name} has conflicting producer sources: {}",
                sources.join(", ")
            )));
        }

        let url = |field: &'static str, value: Value| match value {
            Value::String(url) => Ok(url),
            _ => Err(DeclareError::InvalidUrl {
                name: name.clone(),
                field,
            }),
        };
        let script = self.script.map(|v| url("script", v)).transpose()?;
        let json = self.json.map(|v| url("json", v)).transpose()?;

        let script_loader = callable(&name, "scriptLoader", self.script_loader)?;
        let fetcher = callable(&name, "fetcher", self.fetcher)?;
        let producer = callable(&name, &name, self.producer)?;

        let kind = if let Some(producer) = producer {
            ResourceKind::Function(producer)
        } else if let Some(url) = script {
            ResourceKind::Script {
                url,
                loader: script_loader,
            }
        } else if let Some(url) = json {
            ResourceKind::Json { url, fetcher }
        } else {
            return Err(DeclareError::InvalidProvider {
                name,
                reason: "no function, script or json source".to_string(),
            });
        };

        Ok(Blueprint {
            name,
            requires,
            kind,
        })
    }
}

fn callable<T>(name: &str, field: &str, value: Option<Field<T>>) -> Result<Option<T>, DeclareError> {
    match value {
        None => Ok(None),
        Some(Field::Callable(value)) => Ok(Some(value)),
        Some(Field::Data(data)) => Err(DeclareError::InvalidProvider {
            name: name.to_string(),
            reason: format!("`{field}` is not callable (found {})", describe(&data)),
        }),
    }
}

/// Falsy values mean "no dependencies"; a lone string is a single dependency.
fn normalize_requires(name: &str, requires: Option<Value>) -> Result<Vec<String>, DeclareError> {
    let invalid = |value: &Value| DeclareError::InvalidRequires {
        name: name.to_string(),
        found: describe(value),
    };

    match requires {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(Vec::new()),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Ok(Vec::new()),
        Some(Value::String(s)) if s.is_empty() => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).ok_or_else(|| invalid(item)))
            .collect(),
        Some(other) => Err(invalid(&other)),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string {s:?}"),
        Value::Array(_) => "array".to_string(),
        Value::Object(_) => "object".to_string(),
    }
}

/// Parses a manifest entry.
///
/// Accepted keys: `name`, `requires`, `script`, `json`, and the callable slots
/// (`<name>`, `scriptLoader`, `fetcher`). JSON cannot carry callables, so any
/// value in a callable slot fails validation with `InvalidProvider`.
///
/// The fixed keys are read first. A resource named after one of them (say
/// `json`) therefore has no `<name>` slot of its own.
impl TryFrom<Value> for Definition {
    type Error = DeclareError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let mut object: Map<String, Value> = match value {
            Value::Object(object) => object,
            other => {
                return Err(DeclareError::InvalidResource(format!(
                    "definition must be an object, found {}",
                    describe(&other)
                )))
            }
        };

        let present = |v: Value| (!v.is_null()).then_some(v);
        let name = object.remove("name");
        let requires = object.remove("requires");
        let script = object.remove("script").and_then(present);
        let json = object.remove("json").and_then(present);
        let script_loader = object
            .remove("scriptLoader")
            .or_else(|| object.remove("script_loader"))
            .map(Field::Data);
        let fetcher = object.remove("fetcher").map(Field::Data);
        let producer = name
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|n| object.remove(n))
            .map(Field::Data);

        Ok(Self {
            name,
            requires,
            producer,
            script,
            json,
            script_loader,
            fetcher,
        })
    }
}
