//! `conveyor-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod clock;
pub mod error;
pub mod id;
pub mod status;
pub mod value;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{DomainError, DomainResult};
pub use id::UniqueId;
pub use status::{BatchStatus, JobStatus, LogLevel, TestResult};
pub use value::{BatchName, DaysToKeep, JobName, MaxRetries, TimeoutSeconds};
