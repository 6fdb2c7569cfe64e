//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

/// Filter used when neither the configured filter nor `RUST_LOG` parses.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Install a global fmt subscriber filtered by `filter`.
///
/// An unparseable `filter` falls back to `RUST_LOG`, then to
/// [`DEFAULT_LOG_FILTER`]. Returns `false` if a global subscriber was already
/// installed; calling this more than once is harmless.
pub fn init_tracing(filter: &str) -> bool {
    let filter = EnvFilter::try_new(filter)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
