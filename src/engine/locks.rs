//! Per-session serialization point

use crate::graph::SessionId;
use dashmap::DashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

/// One mutex per session id
///
/// Every load→mutate→save sequence holds the session's mutex for its whole
/// duration, so two writers can never interleave on the same index.
/// Sessions never contend with each other.
#[derive(Debug, Default)]
pub(crate) struct SessionLocks {
    locks: DashMap<SessionId, Arc<Mutex<()>>>,
}

impl SessionLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The mutex for a session, created on first use
    pub(crate) fn handle(&self, session: &SessionId) -> Arc<Mutex<()>> {
        Arc::clone(&self.locks.entry(session.clone()).or_default())
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.len()
    }
}

/// Block until the mutex is free
///
/// The mutex guards no data, so a panic in a previous holder leaves nothing
/// half-updated in memory and poisoning is ignored.
pub(crate) fn acquire(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Take the mutex only if nobody holds it
pub(crate) fn try_acquire(lock: &Mutex<()>) -> Option<MutexGuard<'_, ()>> {
    match lock.try_lock() {
        Ok(guard) => Some(guard),
        Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
        Err(TryLockError::WouldBlock) => None,
    }
}
