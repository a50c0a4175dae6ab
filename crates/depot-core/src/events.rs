//! Repository lifecycle events and their observers.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use depot_schema::ResourceDescriptor;

use crate::error::FetchError;

/// What happened to a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A repository started vouching for the descriptor.
    Add,
    /// The descriptor left the index.
    Remove,
    /// A fetch for the descriptor is starting its attempt loop.
    StartDownload,
    /// The attempt loop finished, successfully or not.
    EndDownload,
    /// The attempt loop gave up; always followed by `EndDownload`.
    Error,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Add => "ADD",
            Self::Remove => "REMOVE",
            Self::StartDownload => "START_DOWNLOAD",
            Self::EndDownload => "END_DOWNLOAD",
            Self::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// A single notification, borrowed for the duration of dispatch.
#[derive(Debug, Clone, Copy)]
pub struct RepositoryEvent<'a> {
    pub kind: EventKind,
    pub descriptor: &'a ResourceDescriptor,
    pub error: Option<&'a FetchError>,
}

/// Observer of repository-wide events.
pub trait RepositoryListener: Send + Sync {
    fn events(&self, event: &RepositoryEvent<'_>) -> anyhow::Result<()>;
}

/// Copy-on-write list of [`RepositoryListener`]s.
///
/// Dispatch works on a snapshot, so listeners may be added or removed (even
/// from inside a callback) while an event is being delivered.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<Arc<Vec<Arc<dyn RepositoryListener>>>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.snapshot().len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, listener: Arc<dyn RepositoryListener>) {
        let mut guard = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = Vec::with_capacity(guard.len() + 1);
        next.extend(guard.iter().cloned());
        next.push(listener);
        *guard = Arc::new(next);
    }

    /// Remove a listener by identity. Returns whether it was registered.
    pub fn remove_listener(&self, listener: &Arc<dyn RepositoryListener>) -> bool {
        let mut guard = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = guard.len();
        let next: Vec<_> = guard
            .iter()
            .filter(|l| !Arc::ptr_eq(l, listener))
            .cloned()
            .collect();
        let removed = next.len() != before;
        *guard = Arc::new(next);
        removed
    }

    fn snapshot(&self) -> Arc<Vec<Arc<dyn RepositoryListener>>> {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Deliver an event to every listener, in registration order.
    pub fn emit(&self, kind: EventKind, descriptor: &ResourceDescriptor, error: Option<&FetchError>) {
        let event = RepositoryEvent {
            kind,
            descriptor,
            error,
        };
        for listener in self.snapshot().iter() {
            if let Err(e) = listener.events(&event) {
                tracing::warn!(%kind, resource = %descriptor, error = %e, "repository listener failed");
            }
        }
    }
}
