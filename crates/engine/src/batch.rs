//! Batch declaration trait.

use std::sync::Arc;

use conveyor_core::{BatchName, TimeoutSeconds};

use crate::error::ResourceError;
use crate::job::JobSpec;
use crate::uow::UnitOfWork;

/// A named collection of jobs sharing one unit of work per run.
///
/// The runner calls `create_jobs` and `create_unit_of_work` exactly once per
/// run, so implementations may build fresh state each time.
pub trait BatchSpec: Send + Sync {
    /// Batch identity, used for log correlation and reporting.
    fn name(&self) -> BatchName;

    /// Instantiate the jobs for this run. Order is the declaration order used
    /// to break topological ties.
    fn create_jobs(&self) -> Vec<Arc<dyn JobSpec>>;

    /// Build the shared transactional context for this run.
    fn create_unit_of_work(&self) -> Result<UnitOfWork, ResourceError>;

    /// When true, every job's `test` step is skipped for this run.
    fn skip_tests(&self) -> bool {
        false
    }

    /// Wall-clock budget for the whole run; `None` means unbounded.
    fn timeout(&self) -> Option<TimeoutSeconds> {
        None
    }
}
