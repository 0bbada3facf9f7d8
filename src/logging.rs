//! Structured logging setup
//!
//! The engine logs through `tracing`; this helper wires a subscriber for
//! binaries and long-lived services embedding the driver. Level defaults to
//! `info` and is overridable through `RUST_LOG`.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Safe to call more than once; later calls
/// are no-ops.
pub fn init_logging() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .try_init();
}
