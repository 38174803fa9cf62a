//! Retention pruning.
//!
//! Pruning is driven by an external scheduler, never by the batch runner.

use std::sync::Arc;

use chrono::Duration;
use tracing::info;

use conveyor_core::{Clock, DaysToKeep};

use crate::repository::{BatchLogRepository, LogStoreError};

/// Applies a retention window to a log repository.
pub struct RetentionPruner {
    repo: Arc<dyn BatchLogRepository>,
    clock: Arc<dyn Clock>,
}

impl RetentionPruner {
    pub fn new(repo: Arc<dyn BatchLogRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Delete entries older than the window if any exist.
    ///
    /// Checks the earliest stored timestamp first so a store with nothing to
    /// prune is not asked to scan.
    pub fn prune_if_needed(&self, days_to_keep: DaysToKeep) -> Result<usize, LogStoreError> {
        let cutoff = self.clock.now() - Duration::days(i64::from(days_to_keep.get()));

        match self.repo.get_earliest_timestamp()? {
            Some(earliest) if earliest < cutoff => {
                let deleted = self.repo.delete_old_entries(days_to_keep)?;
                info!(deleted, days_to_keep = days_to_keep.get(), "pruned log entries");
                Ok(deleted)
            }
            _ => Ok(0),
        }
    }
}
