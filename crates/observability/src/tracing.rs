//! Tracing subscriber initialization.
//!
//! Ledger operations emit spans carrying `item_id` and `caller`; committed
//! transitions log at `info`, rejections at `debug`, unwinds at `warn`.

use tracing_subscriber::EnvFilter;

/// Default directive when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Install a JSON subscriber filtered by `RUST_LOG` (default [`DEFAULT_FILTER`]).
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    init_with_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    );
}

/// Install a JSON subscriber with an explicit filter, ignoring `RUST_LOG`.
pub fn init_with_filter(filter: EnvFilter) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .with_current_span(true)
        .try_init();
}
