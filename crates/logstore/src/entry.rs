//! Log entry record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use conveyor_core::{LogLevel, UniqueId};

/// One persisted lifecycle event.
///
/// Entries are immutable once written; they reference the batch run and job
/// run that produced them and are destroyed only by retention pruning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchLogEntry {
    pub id: UniqueId,
    pub batch_id: UniqueId,
    pub job_id: UniqueId,
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl BatchLogEntry {
    pub fn new(
        batch_id: UniqueId,
        job_id: UniqueId,
        level: LogLevel,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: UniqueId::new(),
            batch_id,
            job_id,
            level,
            message: message.into(),
            timestamp,
        }
    }
}
