//! Telemetry initialization
//!
//! Single entry point for the `tracing` subscriber. The filter comes from
//! the client configuration, overridable through the standard `RUST_LOG`
//! environment variable.

use tallyarc_domain::{Result, TallyArcError};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Call once at startup, before the connection loop produces any spans.
///
/// # Errors
/// Returns `TallyArcError::Internal` if a global subscriber is already set.
pub fn init(default_filter: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| TallyArcError::Internal(format!("tracing init failed: {e}")))
}
