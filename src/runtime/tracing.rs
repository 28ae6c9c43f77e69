/// Initializes the tracing/logging infrastructure for the application.
///
/// Log verbosity follows the `RUST_LOG` environment variable:
/// - `RUST_LOG=info` - declarations and settlements
/// - `RUST_LOG=debug` - adds slot hand-offs and HTTP requests
/// - `RUST_LOG=resource_activator::registry=debug` - only the registry
///
/// The compact format prints spans inline (e.g. `fetch{url=...}: Sending request`)
/// and hides module paths; resource names are carried as structured fields.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
