//! Tracing/logging initialization.
//!
//! Batch hosts run unattended, so the console sink emits JSON lines that a
//! log shipper can ingest alongside the durable per-job entries.

use tracing_subscriber::EnvFilter;

/// Initialize JSON tracing for a batch host process.
///
/// Filtering is configurable via `RUST_LOG` and defaults to `info`. Safe to
/// call multiple times (subsequent calls are no-ops).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}

/// Human-readable variant for interactive runs and tests.
pub fn init_compact() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .with_target(false)
        .with_test_writer()
        .try_init();
}
