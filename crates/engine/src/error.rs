//! Engine error taxonomy.
//!
//! Fatal errors (`GraphError`, `ResourceError` at construction) abort before
//! any job executes; `JobError` is a per-attempt execution failure caught and
//! retried by the runner.

use thiserror::Error;

use conveyor_core::JobName;

/// Dependency graph validation failure. Fatal: the batch never starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("duplicate job name: {0}")]
    DuplicateJobName(JobName),

    #[error("job '{job}' depends on unknown job '{dependency}'")]
    UnknownDependency { job: JobName, dependency: JobName },

    #[error("dependency cycle involving: {}", .0.iter().map(|n| n.as_str()).collect::<Vec<_>>().join(", "))]
    Cycle(Vec<JobName>),
}

/// Unit-of-work / resource failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// Two resources registered for one interface. Fatal at construction.
    #[error("ambiguous resource registration for interface '{0}'")]
    AmbiguousInterface(String),

    /// A lifecycle call that the current state does not permit.
    #[error("invalid unit-of-work transition: {attempted} while {from}")]
    InvalidTransition {
        from: &'static str,
        attempted: &'static str,
    },

    /// Failure inside a concrete resource implementation.
    #[error("resource backend error: {0}")]
    Backend(String),
}

impl ResourceError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Execution failure raised by a job's `run` step.
///
/// The runner treats these (and timeouts, and panics) as retryable attempts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct JobError(String);

impl JobError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobError {
    fn from(msg: String) -> Self {
        Self(msg)
    }
}

impl From<&str> for JobError {
    fn from(msg: &str) -> Self {
        Self(msg.to_string())
    }
}

/// Fatal, batch-never-starts error returned by `BatchRunner::run`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Resource(#[from] ResourceError),
}
