//! Job and batch lifecycle statuses.

use serde::{Deserialize, Serialize};

use crate::value::JobName;

/// Per-job execution status.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Declared but not yet scheduled
    NotStarted,
    /// Currently executing
    Running,
    /// Terminal: ran to completion
    Succeeded,
    /// Terminal: retries exhausted
    Failed,
    /// Terminal: never ran (gated by a failed dependency or batch abort)
    Skipped,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Skipped
        )
    }
}

/// Batch-level outcome aggregated over job statuses.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    NotStarted,
    Running,
    /// Every job succeeded or was skipped by design; none failed.
    Succeeded,
    /// Some jobs succeeded, at least one failed.
    PartialFailure,
    /// At least one job failed and none succeeded.
    Failed,
    /// The batch-wide budget expired; remaining jobs were skipped.
    Aborted,
}

impl BatchStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BatchStatus::NotStarted | BatchStatus::Running)
    }
}

/// Severity of a log entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum LogLevel {
    Info,
    Error,
}

/// Outcome of one post-execution check produced by a job's `test` step.
///
/// Test results are advisory: a failing result never demotes a succeeded job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub job_name: JobName,
    pub passed: bool,
    pub message: Option<String>,
}

impl TestResult {
    pub fn passed(job_name: JobName) -> Self {
        Self {
            job_name,
            passed: true,
            message: None,
        }
    }

    pub fn failed(job_name: JobName, message: impl Into<String>) -> Self {
        Self {
            job_name,
            passed: false,
            message: Some(message.into()),
        }
    }
}
