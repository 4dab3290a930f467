//! Tracing initialization.
//!
//! Structured logs via tracing-subscriber: env-filtered, fmt output.
//! The engine emits structured fields at every mutation; this wires
//! them to stderr.

use crate::error::{Error, Result};

/// Initialize the tracing subscriber.
///
/// `default_level` applies when RUST_LOG is not set.
///
/// # Errors
///
/// Returns an error if a global subscriber was already installed.
pub fn init_tracing(default_level: &str) -> Result<()> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt as _;
    use tracing_subscriber::util::SubscriberInitExt as _;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| Error::Other(format!("failed to init tracing subscriber: {e}")))
}
