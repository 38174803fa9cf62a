//! Job declaration trait and failure-recovery hooks.

use std::collections::BTreeSet;
use std::sync::Arc;

use conveyor_core::{JobName, MaxRetries, TestResult, TimeoutSeconds};
use conveyor_logstore::JobLogger;

use crate::error::JobError;
use crate::uow::UnitOfWork;

/// What a recovery hook asks the runner to do after a terminal failure.
pub enum RecoveryOutcome {
    /// Accept the failure and move on.
    Continue,
    /// Execute the given job inline, under that job's own retry and timeout
    /// policy, before moving to the next planned job.
    Replace(Arc<dyn JobSpec>),
}

/// A unit of work inside a batch.
///
/// Implementations declare their identity, dependencies and policy, and
/// provide the `run` step plus an optional post-run `test` step. All state a
/// job mutates lives behind the shared [`UnitOfWork`]; the job itself is
/// immutable during a run.
pub trait JobSpec: Send + Sync {
    /// Unique name within the batch; also the dependency-graph node identity.
    fn name(&self) -> JobName;

    /// Names of jobs that must succeed before this one may start.
    fn dependencies(&self) -> BTreeSet<JobName> {
        BTreeSet::new()
    }

    /// Retry bound for the `run` step. Zero means a single attempt.
    fn max_retries(&self) -> MaxRetries {
        MaxRetries::NONE
    }

    /// Per-job wall-clock budget; `None` defers to the batch budget.
    fn timeout(&self) -> Option<TimeoutSeconds> {
        None
    }

    /// Perform the job's work against the shared unit of work.
    fn run(&self, uow: &UnitOfWork, logger: &dyn JobLogger) -> Result<(), JobError>;

    /// Post-run verification. Results never change the job's status; failures
    /// are logged and reported through `on_test_failure`.
    fn test(&self, _uow: &UnitOfWork, _logger: &dyn JobLogger) -> Vec<TestResult> {
        Vec::new()
    }

    /// Called once after the `run` step has exhausted all attempts.
    fn on_execution_error(&self, _error: &JobError) -> RecoveryOutcome {
        RecoveryOutcome::Continue
    }

    /// Called once with the failing subset when any `test` result failed.
    fn on_test_failure(&self, _failures: &[TestResult]) -> RecoveryOutcome {
        RecoveryOutcome::Continue
    }
}
