//! One guard per caller identity.

use rps_sessions::{CallerId, SessionGuard};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, instrument};

/// Shared map from caller identity to that caller's guard.
///
/// The map lock is held only for lookup; the guard itself serializes the
/// caller's calls, so different callers proceed in parallel.
#[derive(Debug, Clone, Default)]
pub struct GuardDirectory {
    guards: Arc<Mutex<HashMap<CallerId, Arc<SessionGuard>>>>,
}

impl GuardDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the guard for `caller`, creating an idle one on first use.
    #[instrument(skip(self), fields(caller = %caller))]
    pub fn guard_for(&self, caller: &CallerId) -> Arc<SessionGuard> {
        let mut guards = self.guards.lock().unwrap_or_else(PoisonError::into_inner);
        let guard = guards.entry(caller.clone()).or_insert_with(|| {
            debug!("First request from caller");
            Arc::new(SessionGuard::new(caller.clone()))
        });
        Arc::clone(guard)
    }

    /// Returns the guard for `caller` only if one exists.
    pub fn existing(&self, caller: &CallerId) -> Option<Arc<SessionGuard>> {
        self.guards
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(caller)
            .cloned()
    }

    /// Number of callers seen so far.
    pub fn len(&self) -> usize {
        self.guards
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no caller has been seen.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
