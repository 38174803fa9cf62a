//! Validated value types used by batch and job declarations.
//!
//! All of these are immutable wrappers compared by value. Names double as
//! graph node identity, so they are `Ord` + `Hash`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

macro_rules! impl_name_newtype {
    ($t:ty, $label:literal) => {
        impl $t {
            /// Create a validated name. Fails on empty/whitespace-only input.
            pub fn new(name: impl Into<String>) -> DomainResult<Self> {
                let name = name.into();
                if name.trim().is_empty() {
                    return Err(DomainError::validation(concat!(
                        $label,
                        " must not be empty"
                    )));
                }
                Ok(Self(name))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $t {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

/// Name of a job; unique within a batch and used as graph node identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobName(String);

/// Name of a batch; batches are identified by name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchName(String);

impl_name_newtype!(JobName, "job name");
impl_name_newtype!(BatchName, "batch name");

/// Retry bound for a single job. Zero means no retry.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MaxRetries(u32);

impl MaxRetries {
    pub const NONE: MaxRetries = MaxRetries(0);

    pub fn new(retries: u32) -> Self {
        Self(retries)
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    /// Total attempts a job is allowed: one initial run plus the retries.
    pub fn total_attempts(&self) -> u32 {
        self.0 + 1
    }
}

/// Wall-clock budget in whole seconds; always strictly positive.
///
/// "No timeout" is expressed as `Option<TimeoutSeconds>` at use sites rather
/// than a zero sentinel.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeoutSeconds(u64);

impl TimeoutSeconds {
    pub fn new(seconds: u64) -> DomainResult<Self> {
        if seconds == 0 {
            return Err(DomainError::validation("timeout must be positive"));
        }
        Ok(Self(seconds))
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.0)
    }
}

/// Retention window for log pruning, in whole days. Zero keeps nothing.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DaysToKeep(u32);

impl DaysToKeep {
    pub fn new(days: u32) -> Self {
        Self(days)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_name_rejects_empty_and_whitespace() {
        assert!(JobName::new("").is_err());
        assert!(JobName::new("   ").is_err());
        assert!(JobName::new("load-accounts").is_ok());
    }

    #[test]
    fn names_compare_by_value() {
        let a = JobName::new("extract").unwrap();
        let b = JobName::new("extract").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn max_retries_counts_total_attempts() {
        assert_eq!(MaxRetries::NONE.total_attempts(), 1);
        assert_eq!(MaxRetries::new(2).total_attempts(), 3);
    }

    #[test]
    fn timeout_must_be_positive() {
        assert!(TimeoutSeconds::new(0).is_err());
        assert_eq!(
            TimeoutSeconds::new(30).unwrap().as_duration(),
            Duration::from_secs(30)
        );
    }
}
