//! Sequential batch execution.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{error, info, warn};

use conveyor_core::{
    BatchName, BatchStatus, Clock, JobName, JobStatus, SystemClock, TestResult, UniqueId,
};
use conveyor_logstore::{BatchLogEntry, BatchLogRepository, JobLogger, JobLoggingService};

use crate::batch::BatchSpec;
use crate::error::{BatchError, JobError};
use crate::graph::ExecutionPlan;
use crate::job::{JobSpec, RecoveryOutcome};
use crate::retry::RetryPolicy;
use crate::uow::UnitOfWork;

/// Outcome of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub batch_id: UniqueId,
    pub batch_name: BatchName,
    pub status: BatchStatus,
    /// Terminal status of every planned job, in execution order. Replacement
    /// jobs injected by recovery hooks are not listed; their trail lives in
    /// `entries`.
    pub job_statuses: Vec<(JobName, JobStatus)>,
    /// Every log entry persisted during the run.
    pub entries: Vec<BatchLogEntry>,
}

impl BatchReport {
    pub fn job_status(&self, name: &str) -> Option<JobStatus> {
        self.job_statuses
            .iter()
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, s)| *s)
    }
}

/// Executes one `BatchSpec` at a time against a shared unit of work.
///
/// The runner is stateless between runs; each `run` call creates fresh jobs,
/// a fresh unit of work and a fresh batch id.
pub struct BatchRunner {
    repo: Arc<dyn BatchLogRepository>,
    clock: Arc<dyn Clock>,
    backoff: RetryPolicy,
}

struct JobOutcome {
    status: JobStatus,
    replacement: Option<Arc<dyn JobSpec>>,
}

impl BatchRunner {
    pub fn new(repo: Arc<dyn BatchLogRepository>) -> Self {
        Self {
            repo,
            clock: Arc::new(SystemClock),
            backoff: RetryPolicy::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_backoff(mut self, backoff: RetryPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Run a batch to completion.
    ///
    /// Returns `Err` only for faults that prevent the batch from starting at
    /// all: an invalid dependency graph or a unit of work that cannot be
    /// constructed or opened. Job failures are reported through the
    /// `BatchReport`, never as an `Err`.
    pub fn run(&self, spec: &dyn BatchSpec) -> Result<BatchReport, BatchError> {
        let batch_id = UniqueId::new();
        let batch_name = spec.name();
        info!(batch = %batch_name, batch_id = %batch_id, "starting batch");

        let jobs = spec.create_jobs();
        let uow = Arc::new(spec.create_unit_of_work()?);
        let plan = ExecutionPlan::build(&jobs)?;

        if let Err(e) = uow.open() {
            let _ = uow.close();
            return Err(e.into());
        }

        let deadline = spec.timeout().map(|t| Instant::now() + t.as_duration());
        let skip_tests = spec.skip_tests();

        // Name lookup for dependency gating; uniqueness was validated by the plan.
        let index_of: BTreeMap<JobName, usize> = jobs
            .iter()
            .enumerate()
            .map(|(idx, job)| (job.name(), idx))
            .collect();

        let mut statuses = vec![JobStatus::NotStarted; jobs.len()];
        let mut aborted = false;

        for &idx in plan.order() {
            let job = &jobs[idx];
            let name = plan.name_of(idx);
            let logger = self.logger_for(batch_id, name);

            if aborted || deadline.is_some_and(|d| Instant::now() >= d) {
                if !aborted {
                    aborted = true;
                    error!(batch = %batch_name, "batch budget exhausted, aborting remaining jobs");
                }
                logger.log_error("skipped: batch timeout expired before start");
                statuses[idx] = JobStatus::Skipped;
                continue;
            }

            let blocking = plan
                .dependencies_of(idx)
                .iter()
                .find(|dep| statuses[index_of[*dep]] != JobStatus::Succeeded);
            if let Some(dep) = blocking {
                logger.log_info(&format!("skipped: dependency '{dep}' did not succeed"));
                statuses[idx] = JobStatus::Skipped;
                continue;
            }

            statuses[idx] = JobStatus::Running;
            let outcome = self.execute_job(job, &uow, &logger, deadline, skip_tests);
            statuses[idx] = outcome.status;

            if let Some(replacement) = outcome.replacement {
                self.run_replacement(replacement, batch_id, &uow, deadline, skip_tests);
            }
        }

        let any_failed = statuses.contains(&JobStatus::Failed);
        let any_succeeded = statuses.contains(&JobStatus::Succeeded);
        let status = if aborted {
            BatchStatus::Aborted
        } else if !any_failed {
            BatchStatus::Succeeded
        } else if any_succeeded {
            BatchStatus::PartialFailure
        } else {
            BatchStatus::Failed
        };

        if status == BatchStatus::Succeeded {
            if let Err(e) = uow.commit() {
                error!(batch = %batch_name, error = %e, "commit failed");
            }
        } else if let Err(e) = uow.rollback() {
            error!(batch = %batch_name, error = %e, "rollback failed");
        }
        if let Err(e) = uow.close() {
            error!(batch = %batch_name, error = %e, "close failed");
        }

        let entries = self.repo.list_for_batch(batch_id).unwrap_or_else(|e| {
            warn!(batch = %batch_name, error = %e, "could not read back log entries");
            Vec::new()
        });

        info!(batch = %batch_name, status = ?status, "batch finished");
        Ok(BatchReport {
            batch_id,
            batch_name,
            status,
            job_statuses: plan
                .order()
                .iter()
                .map(|&idx| (jobs[idx].name(), statuses[idx]))
                .collect(),
            entries,
        })
    }

    fn logger_for(&self, batch_id: UniqueId, job_name: &JobName) -> Arc<JobLoggingService> {
        Arc::new(JobLoggingService::new(
            self.repo.clone(),
            self.clock.clone(),
            batch_id,
            UniqueId::new(),
            job_name.clone(),
        ))
    }

    /// Runs one job's full lifecycle: retried `run` step, then the `test`
    /// step, then at most one recovery hook.
    fn execute_job(
        &self,
        job: &Arc<dyn JobSpec>,
        uow: &Arc<UnitOfWork>,
        logger: &Arc<JobLoggingService>,
        deadline: Option<Instant>,
        skip_tests: bool,
    ) -> JobOutcome {
        let total = job.max_retries().total_attempts();
        let mut last_err = JobError::new("never attempted");

        for attempt in 1..=total {
            logger.log_info(&format!("starting attempt {attempt} of {total}"));
            let timeout = effective_timeout(job.as_ref(), deadline);
            match run_with_timeout(job.clone(), uow.clone(), logger.clone(), timeout) {
                Ok(()) => {
                    logger.log_info("run step succeeded");
                    let replacement = if skip_tests {
                        None
                    } else {
                        self.run_tests(job, uow, logger)
                    };
                    return JobOutcome {
                        status: JobStatus::Succeeded,
                        replacement,
                    };
                }
                Err(e) => {
                    logger.log_error(&format!("attempt {attempt} failed: {e}"));
                    last_err = e;
                    if attempt < total {
                        let delay = self.backoff.delay_for_attempt(attempt);
                        logger.log_info(&format!("retrying in {}ms", delay.as_millis()));
                        thread::sleep(delay);
                    }
                }
            }
        }

        logger.log_error("all attempts exhausted");
        let replacement = match job.on_execution_error(&last_err) {
            RecoveryOutcome::Continue => None,
            RecoveryOutcome::Replace(r) => Some(r),
        };
        JobOutcome {
            status: JobStatus::Failed,
            replacement,
        }
    }

    fn run_tests(
        &self,
        job: &Arc<dyn JobSpec>,
        uow: &Arc<UnitOfWork>,
        logger: &Arc<JobLoggingService>,
    ) -> Option<Arc<dyn JobSpec>> {
        let results = job.test(uow, logger.as_ref() as &dyn JobLogger);
        let failures: Vec<TestResult> = results.into_iter().filter(|r| !r.passed).collect();
        for failure in &failures {
            let detail = failure.message.as_deref().unwrap_or("no detail");
            logger.log_error(&format!("test '{}' failed: {detail}", failure.job_name));
        }
        if failures.is_empty() {
            return None;
        }
        match job.on_test_failure(&failures) {
            RecoveryOutcome::Continue => None,
            RecoveryOutcome::Replace(r) => Some(r),
        }
    }

    /// A replacement runs inline under its own policy. Its outcome never
    /// joins aggregation or unblocks dependents, and it may not recurse.
    fn run_replacement(
        &self,
        replacement: Arc<dyn JobSpec>,
        batch_id: UniqueId,
        uow: &Arc<UnitOfWork>,
        deadline: Option<Instant>,
        skip_tests: bool,
    ) {
        let logger = self.logger_for(batch_id, &replacement.name());
        logger.log_info("running as replacement job");
        let outcome = self.execute_job(&replacement, uow, &logger, deadline, skip_tests);
        if outcome.replacement.is_some() {
            logger.log_error("replacement requested another replacement; not honored");
        }
    }
}

/// Job timeout precedence: a job's own budget wins outright; otherwise the
/// attempt runs under whatever remains of the batch budget.
fn effective_timeout(job: &dyn JobSpec, deadline: Option<Instant>) -> Option<Duration> {
    if let Some(t) = job.timeout() {
        return Some(t.as_duration());
    }
    deadline.map(|d| d.saturating_duration_since(Instant::now()))
}

/// Executes one `run` attempt on a worker thread so it can be bounded.
///
/// A timed-out worker is left to finish in the background and its late
/// outcome is discarded. A panicking job becomes a failed attempt.
fn run_with_timeout(
    job: Arc<dyn JobSpec>,
    uow: Arc<UnitOfWork>,
    logger: Arc<JobLoggingService>,
    timeout: Option<Duration>,
) -> Result<(), JobError> {
    let (tx, rx) = mpsc::channel();
    let handle = thread::Builder::new()
        .name(format!("job-{}", job.name()))
        .spawn(move || {
            let result = catch_unwind(AssertUnwindSafe(|| {
                job.run(&uow, logger.as_ref() as &dyn JobLogger)
            }))
            .unwrap_or_else(|panic| Err(JobError::new(panic_message(&panic))));
            let _ = tx.send(result);
        })
        .map_err(|e| JobError::new(format!("failed to spawn job worker: {e}")))?;

    let received = match timeout {
        Some(timeout) => rx.recv_timeout(timeout),
        None => rx.recv().map_err(|_| mpsc::RecvTimeoutError::Disconnected),
    };
    match received {
        Ok(result) => {
            let _ = handle.join();
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => Err(JobError::new(format!(
            "timed out after {:.1}s",
            timeout.unwrap_or_default().as_secs_f64()
        ))),
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            let _ = handle.join();
            Err(JobError::new("job worker terminated without a result"))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    let msg = panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "opaque panic payload".to_string());
    format!("job panicked: {msg}")
}
