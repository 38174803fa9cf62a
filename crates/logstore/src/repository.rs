//! Log storage implementations.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};

use conveyor_core::{Clock, DaysToKeep, SystemClock, UniqueId};

use crate::entry::BatchLogEntry;

/// Log store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LogStoreError {
    #[error("storage error: {0}")]
    Storage(String),
}

/// Durable store of batch log entries.
///
/// Entries are append-only; the only mutation is retention pruning.
pub trait BatchLogRepository: Send + Sync {
    /// Persist one entry. Called per event, never batched.
    fn append(&self, entry: BatchLogEntry) -> Result<(), LogStoreError>;

    /// Timestamp of the oldest stored entry, if any.
    ///
    /// Used by external schedulers to decide whether pruning is needed.
    fn get_earliest_timestamp(&self) -> Result<Option<DateTime<Utc>>, LogStoreError>;

    /// Delete all entries older than `now - days_to_keep`.
    /// Returns the number of entries deleted. Idempotent.
    fn delete_old_entries(&self, days_to_keep: DaysToKeep) -> Result<usize, LogStoreError>;

    /// All entries produced by one batch run, in timestamp/insertion order.
    fn list_for_batch(&self, batch_id: UniqueId) -> Result<Vec<BatchLogEntry>, LogStoreError>;
}

impl<R> BatchLogRepository for Arc<R>
where
    R: BatchLogRepository + ?Sized,
{
    fn append(&self, entry: BatchLogEntry) -> Result<(), LogStoreError> {
        (**self).append(entry)
    }

    fn get_earliest_timestamp(&self) -> Result<Option<DateTime<Utc>>, LogStoreError> {
        (**self).get_earliest_timestamp()
    }

    fn delete_old_entries(&self, days_to_keep: DaysToKeep) -> Result<usize, LogStoreError> {
        (**self).delete_old_entries(days_to_keep)
    }

    fn list_for_batch(&self, batch_id: UniqueId) -> Result<Vec<BatchLogEntry>, LogStoreError> {
        (**self).list_for_batch(batch_id)
    }
}

/// In-memory repository for tests/dev.
pub struct InMemoryBatchLogRepository {
    entries: RwLock<Vec<BatchLogEntry>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryBatchLogRepository {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            clock,
        }
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Total number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryBatchLogRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchLogRepository for InMemoryBatchLogRepository {
    fn append(&self, entry: BatchLogEntry) -> Result<(), LogStoreError> {
        self.entries.write().unwrap().push(entry);
        Ok(())
    }

    fn get_earliest_timestamp(&self) -> Result<Option<DateTime<Utc>>, LogStoreError> {
        let entries = self.entries.read().unwrap();
        Ok(entries.iter().map(|e| e.timestamp).min())
    }

    fn delete_old_entries(&self, days_to_keep: DaysToKeep) -> Result<usize, LogStoreError> {
        let cutoff = self.clock.now() - Duration::days(i64::from(days_to_keep.get()));
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|e| e.timestamp >= cutoff);
        Ok(before - entries.len())
    }

    fn list_for_batch(&self, batch_id: UniqueId) -> Result<Vec<BatchLogEntry>, LogStoreError> {
        let entries = self.entries.read().unwrap();
        Ok(entries
            .iter()
            .filter(|e| e.batch_id == batch_id)
            .cloned()
            .collect())
    }
}
