//! Durable structured logging for batch runs.
//!
//! ## Design
//!
//! - Every lifecycle event (start, retry, failure, success, test result)
//!   becomes one immutable `BatchLogEntry`, persisted immediately, so a
//!   crash mid-run leaves a truthful partial trail
//! - `BatchLogRepository`: storage abstraction (in-memory or durable)
//! - `JobLoggingService`: per-job logger bound to a batch/job id pair,
//!   persists and mirrors to the console sink
//! - `RetentionPruner`: deletes entries older than a configured window

pub mod entry;
pub mod repository;
pub mod retention;
pub mod service;

pub use entry::BatchLogEntry;
pub use repository::{BatchLogRepository, InMemoryBatchLogRepository, LogStoreError};
pub use retention::RetentionPruner;
pub use service::{ConsoleJobLoggingService, JobLogger, JobLoggingService};
