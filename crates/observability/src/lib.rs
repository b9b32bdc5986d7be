//! Tracing/logging shared setup for relayq consumers.

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Like [`init`], but with an explicit filter directive instead of
/// `RUST_LOG` (handy in tests: `init_with_filter("relayq_queue=debug")`).
pub fn init_with_filter(directive: &str) {
    tracing::init_with_filter(directive);
}

/// Tracing configuration (filters, formatting).
pub mod tracing;
