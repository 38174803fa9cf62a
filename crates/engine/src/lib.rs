//! Batch orchestration engine.
//!
//! ## Design
//!
//! - A `BatchSpec` declares a named set of `JobSpec`s plus the unit-of-work
//!   factory and batch-level policy
//! - `ExecutionPlan` validates the dependency graph (duplicates, dangling
//!   edges, cycles) and fixes a deterministic topological order
//! - `BatchRunner` executes jobs sequentially in plan order with bounded
//!   retries and per-job/batch-wide timeouts, sharing one `UnitOfWork`
//! - Failure-recovery hooks can inject a replacement job, executed inline
//!   under its own policy
//! - Every lifecycle event is persisted through `conveyor-logstore`

pub mod batch;
pub mod error;
pub mod graph;
pub mod job;
pub mod retry;
pub mod runner;
pub mod uow;

pub use batch::BatchSpec;
pub use error::{BatchError, GraphError, JobError, ResourceError};
pub use graph::ExecutionPlan;
pub use job::{JobSpec, RecoveryOutcome};
pub use retry::{BackoffStrategy, RetryPolicy};
pub use runner::{BatchReport, BatchRunner};
pub use uow::{Resource, UnitOfWork};
