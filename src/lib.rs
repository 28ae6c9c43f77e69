//! # Resource Activator
//!
//! > **Declare what you need, in any order. Each producer runs once, when its
//! > dependencies are ready.**
//!
//! Callers declare named *resources*: a value computed in-process, a JSON
//! document fetched over HTTP, or a script loaded into a document. Each
//! resource may depend on others by name. The [`Registry`] resolves those
//! edges as they become known and invokes every producer exactly once, with
//! its dependency values as arguments.
//!
//! ## 🏗️ Design
//!
//! ### Forward references
//! A resource may be declared before its dependencies. Asking for a name that
//! does not exist yet creates a [`PendingSlot`](registry::PendingSlot): a
//! shared future plus a one-shot settle capability. Declaring the name later
//! chains the slot onto the real resource, so earlier requesters observe its
//! outcome, failures included.
//!
//! ### Memoized settlements
//! Every resource has a single [`Settlement`], a shared future. Awaiting it
//! any number of times yields the same cached value or the same
//! [`Failure`]; the producer never runs twice.
//!
//! ### Errors
//! Malformed definitions fail [`Registry::declare`] synchronously with a
//! [`DeclareError`]. Runtime problems ([`FetchError`](fetch::FetchError), a
//! producer error or panic) become a [`ResourceError`] inside the settlement
//! and propagate unchanged to every dependent.
//!
//! ## 🗺️ Module Tour
//!
//! - [`resource`]: [`Definition`], validation, [`Resource`] and the settlement protocol.
//! - [`registry`]: the [`Registry`] and its pending slots.
//! - [`fetch`]: the script loader / JSON fetcher traits, their HTTP defaults and mocks.
//! - [`runtime`]: [`RegistryConfig`] and [`setup_tracing`](runtime::setup_tracing).
//!
//! ## 🚀 Quick Start
//!
//! ```rust
//! use resource_activator::{Definition, Registry};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = Registry::new();
//!
//!     // `greeting` is declared before `name` exists.
//!     registry
//!         .declare(
//!             Definition::immediate("greeting", |args| {
//!                 Ok(json!(format!("hello {}", args[0].as_str().unwrap_or("?"))))
//!             })
//!             .requires("name"),
//!         )
//!         .unwrap();
//!     assert_eq!(registry.outstanding(), vec!["name"]);
//!
//!     registry
//!         .declare(Definition::immediate("name", |_| Ok(json!("world"))))
//!         .unwrap();
//!
//!     let greeting = registry.eventual_value_of("greeting").await.unwrap();
//!     assert_eq!(greeting, json!("hello world"));
//! }
//! ```
//!
//! ### Running the Demo
//!
//! ```bash
//! RUST_LOG=info cargo run -- manifest.json
//! ```

pub mod fetch;
pub mod registry;
pub mod resource;
pub mod runtime;

pub use registry::{Registry, Resources};
pub use resource::{
    DeclareError, Definition, Failure, Outcome, Resource, ResourceError, ResourceKind, Settlement,
};
pub use runtime::RegistryConfig;
