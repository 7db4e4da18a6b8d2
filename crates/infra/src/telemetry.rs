//! Tracing subscriber setup for the sync runtime.

use tracing_subscriber::EnvFilter;

/// Initialise the global tracing subscriber.
///
/// The filter comes from `RUST_LOG`, defaulting to `info` for the workspace
/// crates. Calling this twice is a no-op, which keeps test binaries happy.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,teamline_core=debug,teamline_infra=debug"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).try_init();
}

/// JSON-formatted variant for deployments where logs are shipped to a
/// structured collector.
pub fn init_json() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt().json().with_env_filter(filter).try_init();
}
