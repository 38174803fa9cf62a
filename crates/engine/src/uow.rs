//! Shared unit of work.
//!
//! One `UnitOfWork` is created per batch run and handed by reference to every
//! job. It owns a set of resources keyed by interface name and enforces the
//! lifecycle `Created -> Open -> (Committed | RolledBack) -> Closed`.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::error::ResourceError;

/// A transactional capability owned by a unit of work.
///
/// `interface` names the capability a job looks it up by, for example
/// `"warehouse-db"` or `"ftp-drop"`. `as_any` lets jobs downcast to the
/// concrete type.
pub trait Resource: Send + Sync {
    fn interface(&self) -> &str;

    fn open(&self) -> Result<(), ResourceError> {
        Ok(())
    }

    fn commit(&self) -> Result<(), ResourceError> {
        Ok(())
    }

    fn rollback(&self) -> Result<(), ResourceError> {
        Ok(())
    }

    fn close(&self) -> Result<(), ResourceError> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum UowState {
    Created,
    Open,
    Committed,
    RolledBack,
    Closed,
}

impl UowState {
    fn label(self) -> &'static str {
        match self {
            UowState::Created => "created",
            UowState::Open => "open",
            UowState::Committed => "committed",
            UowState::RolledBack => "rolled back",
            UowState::Closed => "closed",
        }
    }
}

/// The transactional context shared by all jobs of one batch run.
pub struct UnitOfWork {
    resources: Vec<Arc<dyn Resource>>,
    by_interface: BTreeMap<String, usize>,
    state: Mutex<UowState>,
}

impl std::fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("interfaces", &self.by_interface.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl UnitOfWork {
    /// Build a unit of work over the given resources.
    ///
    /// Fails with `AmbiguousInterface` if two resources claim the same
    /// interface name, since a lookup could then silently pick either.
    pub fn new(resources: Vec<Arc<dyn Resource>>) -> Result<Self, ResourceError> {
        let mut by_interface = BTreeMap::new();
        for (idx, resource) in resources.iter().enumerate() {
            let interface = resource.interface().to_string();
            if by_interface.insert(interface.clone(), idx).is_some() {
                return Err(ResourceError::AmbiguousInterface(interface));
            }
        }
        Ok(Self {
            resources,
            by_interface,
            state: Mutex::new(UowState::Created),
        })
    }

    /// An empty unit of work, for batches whose jobs carry their own state.
    pub fn empty() -> Self {
        Self {
            resources: Vec::new(),
            by_interface: BTreeMap::new(),
            state: Mutex::new(UowState::Created),
        }
    }

    /// Look up a resource by interface name.
    pub fn resource(&self, interface: &str) -> Option<&Arc<dyn Resource>> {
        self.by_interface
            .get(interface)
            .map(|&idx| &self.resources[idx])
    }

    /// Open every resource. Idempotent while already open.
    pub fn open(&self) -> Result<(), ResourceError> {
        let mut state = self.state.lock().unwrap();
        match *state {
            UowState::Created => {
                for resource in &self.resources {
                    resource.open()?;
                }
                *state = UowState::Open;
                Ok(())
            }
            UowState::Open => Ok(()),
            other => Err(ResourceError::InvalidTransition {
                from: other.label(),
                attempted: "open",
            }),
        }
    }

    /// Commit every resource. Only legal from the open state, at most once.
    pub fn commit(&self) -> Result<(), ResourceError> {
        self.finish(UowState::Committed, "commit", |r| r.commit())
    }

    /// Roll every resource back. Only legal from the open state, at most once.
    pub fn rollback(&self) -> Result<(), ResourceError> {
        self.finish(UowState::RolledBack, "rollback", |r| r.rollback())
    }

    fn finish(
        &self,
        target: UowState,
        attempted: &'static str,
        op: fn(&dyn Resource) -> Result<(), ResourceError>,
    ) -> Result<(), ResourceError> {
        let mut state = self.state.lock().unwrap();
        if *state != UowState::Open {
            return Err(ResourceError::InvalidTransition {
                from: state.label(),
                attempted,
            });
        }
        // The state advances even if a resource fails, so a later commit or
        // rollback cannot be retried against a half-finished transaction.
        *state = target;
        let mut outcome = Ok(());
        for resource in &self.resources {
            if let Err(e) = op(resource.as_ref()) {
                outcome = outcome.and(Err(e));
            }
        }
        outcome
    }

    /// Release every resource. Idempotent once closed.
    pub fn close(&self) -> Result<(), ResourceError> {
        let mut state = self.state.lock().unwrap();
        if *state == UowState::Closed {
            return Ok(());
        }
        let was_created = *state == UowState::Created;
        *state = UowState::Closed;
        if was_created {
            // Nothing was opened, nothing to release.
            return Ok(());
        }
        let mut outcome = Ok(());
        for resource in &self.resources {
            if let Err(e) = resource.close() {
                outcome = outcome.and(Err(e));
            }
        }
        outcome
    }

    /// True once `commit` or `rollback` has run.
    pub fn is_finished(&self) -> bool {
        matches!(
            *self.state.lock().unwrap(),
            UowState::Committed | UowState::RolledBack | UowState::Closed
        )
    }
}
