//! Ambient runtime concerns: configuration and observability.
//!
//! - [`RegistryConfig`] / [`HttpConfig`] - how a registry drives settlements and
//!   talks HTTP
//! - [`setup_tracing`] - initializes the `tracing` subscriber

pub mod config;
pub mod tracing;

pub use self::config::*;
pub use self::tracing::setup_tracing;
