//! Tracing/logging initialization.
//!
//! The dispatch core logs through `tracing` only; installing a subscriber is
//! the consumer's choice. This module is the batteries-included default: a
//! compact formatter filtered via `RUST_LOG`.

use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    install(filter);
}

/// Initialize with an explicit filter directive, ignoring `RUST_LOG`.
pub fn init_with_filter(directive: &str) {
    install(EnvFilter::new(directive));
}

fn install(filter: EnvFilter) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .with_target(true)
        .try_init();
}
