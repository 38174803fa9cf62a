//! Per-job logging services.

use std::sync::Arc;

use tracing::{error, info};

use conveyor_core::{Clock, JobName, LogLevel, UniqueId};

use crate::entry::BatchLogEntry;
use crate::repository::BatchLogRepository;

/// Logger handed to a job's `run`/`test` steps.
pub trait JobLogger: Send + Sync {
    fn log_info(&self, message: &str);
    fn log_error(&self, message: &str);
}

/// Persisting per-job logger.
///
/// Bound to one `(batch_id, job_id)` pair; every call appends a
/// `BatchLogEntry` and mirrors the message to the console sink.
pub struct JobLoggingService {
    repo: Arc<dyn BatchLogRepository>,
    clock: Arc<dyn Clock>,
    batch_id: UniqueId,
    job_id: UniqueId,
    job_name: JobName,
}

impl JobLoggingService {
    pub fn new(
        repo: Arc<dyn BatchLogRepository>,
        clock: Arc<dyn Clock>,
        batch_id: UniqueId,
        job_id: UniqueId,
        job_name: JobName,
    ) -> Self {
        Self {
            repo,
            clock,
            batch_id,
            job_id,
            job_name,
        }
    }

    fn persist(&self, level: LogLevel, message: &str) {
        let entry = BatchLogEntry::new(
            self.batch_id,
            self.job_id,
            level,
            message,
            self.clock.now(),
        );
        // A failing sink must not take the batch down with it.
        if let Err(e) = self.repo.append(entry) {
            error!(job = %self.job_name, error = %e, "failed to persist log entry");
        }
    }
}

impl JobLogger for JobLoggingService {
    fn log_info(&self, message: &str) {
        self.persist(LogLevel::Info, message);
        info!(job = %self.job_name, job_id = %self.job_id, "{message}");
    }

    fn log_error(&self, message: &str) {
        self.persist(LogLevel::Error, message);
        error!(job = %self.job_name, job_id = %self.job_id, "{message}");
    }
}

/// Console-only logger for dry runs and tests; persists nothing.
#[derive(Debug, Clone)]
pub struct ConsoleJobLoggingService {
    job_name: JobName,
}

impl ConsoleJobLoggingService {
    pub fn new(job_name: JobName) -> Self {
        Self { job_name }
    }
}

impl JobLogger for ConsoleJobLoggingService {
    fn log_info(&self, message: &str) {
        info!(job = %self.job_name, "{message}");
    }

    fn log_error(&self, message: &str) {
        error!(job = %self.job_name, "{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conveyor_core::SystemClock;

    use crate::repository::InMemoryBatchLogRepository;

    #[test]
    fn service_persists_every_call_immediately() {
        let repo = InMemoryBatchLogRepository::arc();
        let batch_id = UniqueId::new();
        let logger = JobLoggingService::new(
            repo.clone(),
            Arc::new(SystemClock),
            batch_id,
            UniqueId::new(),
            JobName::new("extract").unwrap(),
        );

        logger.log_info("started");
        logger.log_error("boom");

        let entries = repo.list_for_batch(batch_id).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, LogLevel::Info);
        assert_eq!(entries[0].message, "started");
        assert_eq!(entries[1].level, LogLevel::Error);
    }

    #[test]
    fn console_variant_persists_nothing() {
        let logger = ConsoleJobLoggingService::new(JobName::new("dry-run").unwrap());
        logger.log_info("only printed");
        logger.log_error("only printed");
    }
}
