//! Per-caller guard allowing at most one active session.
//!
//! The registry only knows about sessions; it does not know how many a caller
//! has open. A [`SessionGuard`] wraps one caller identity and keeps that
//! caller down to a single active session.
//!
//! ```text
//!          start (registry accepts)
//!   Idle ───────────────────────────▶ Active
//!     ▲                                 │
//!     └─────────────────────────────────┘
//!          cancel (registry accepts)
//! ```
//!
//! A rejected registry call leaves the guard where it was.

use crate::error::GuardError;
use crate::ids::{CallerId, SessionId};
use crate::registry::Registry;
use crate::session::SessionStatus;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};

/// Observable state of a guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(tag = "state", content = "session", rename_all = "lowercase")]
pub enum GuardState {
    /// No active session.
    #[display("idle")]
    Idle,
    /// Holding the given session.
    #[display("active {}", _0)]
    Active(SessionId),
}

impl GuardState {
    fn from_slot(slot: Option<SessionId>) -> Self {
        slot.map_or(Self::Idle, Self::Active)
    }
}

/// Single-active-session wrapper around one caller identity.
///
/// The slot lock is held from the state check through the registry call to the
/// state update, so calls on one guard are serialized end to end: of two
/// concurrent `start`s, exactly one reaches the registry.
#[derive(Debug)]
pub struct SessionGuard {
    caller: CallerId,
    active: Mutex<Option<SessionId>>,
}

impl SessionGuard {
    /// Creates an idle guard for `caller`.
    #[instrument(fields(caller = %caller))]
    pub fn new(caller: CallerId) -> Self {
        debug!("Creating session guard");
        Self {
            caller,
            active: Mutex::new(None),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<SessionId>> {
        // The slot is only written after a registry call succeeds, so a
        // poisoned lock still holds a consistent value.
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The identity this guard acts for.
    pub fn caller(&self) -> &CallerId {
        &self.caller
    }

    /// The session this guard currently holds, if any.
    pub fn active_session(&self) -> Option<SessionId> {
        *self.slot()
    }

    /// Current state.
    pub fn state(&self) -> GuardState {
        GuardState::from_slot(self.active_session())
    }

    /// Whether the guard holds no session.
    pub fn is_idle(&self) -> bool {
        self.active_session().is_none()
    }

    /// Opens a session in `registry` for this caller.
    ///
    /// # Errors
    ///
    /// - [`GuardError::AlreadyActive`] if a session is already held; the
    ///   registry is not contacted
    /// - [`GuardError::Registry`] if the registry refuses; the guard stays idle
    #[instrument(skip(self, registry), fields(caller = %self.caller))]
    pub fn start<R: Registry + ?Sized>(&self, registry: &R) -> Result<SessionId, GuardError> {
        let mut slot = self.slot();

        if let Some(active) = *slot {
            warn!(session_id = %active, "Start rejected: session already active");
            return Err(GuardError::AlreadyActive(active));
        }

        let session = registry
            .open_session(&self.caller)
            .inspect_err(|e| warn!(error = %e, "Registry refused to open session"))?;
        *slot = Some(session);

        info!(session_id = %session, "Guard active");
        Ok(session)
    }

    /// Cancels the held session in `registry`.
    ///
    /// # Errors
    ///
    /// - [`GuardError::NoActiveSession`] if nothing is held; the registry is
    ///   not contacted
    /// - [`GuardError::Registry`] if the registry refuses; the guard keeps the
    ///   session
    #[instrument(skip(self, registry), fields(caller = %self.caller))]
    pub fn cancel<R: Registry + ?Sized>(&self, registry: &R) -> Result<SessionId, GuardError> {
        let mut slot = self.slot();

        let Some(session) = *slot else {
            warn!("Cancel rejected: no active session");
            return Err(GuardError::NoActiveSession);
        };

        registry
            .cancel_session(session, &self.caller)
            .inspect_err(|e| {
                warn!(session_id = %session, error = %e, "Registry refused to cancel session");
            })?;
        *slot = None;

        info!(session_id = %session, "Guard idle");
        Ok(session)
    }

    /// Resolves `session` through `resolve` while holding this guard's lock.
    ///
    /// If `resolve` succeeds and the guard held `session`, the guard returns to
    /// idle in the same step, so no concurrent `start` on this guard can see
    /// the resolved session as still active. The guard is untouched when
    /// `resolve` fails or the guard held a different session.
    #[instrument(skip(self, resolve), fields(caller = %self.caller, session_id = %session))]
    pub fn resolve_with<E>(
        &self,
        session: SessionId,
        resolve: impl FnOnce(SessionId) -> Result<(), E>,
    ) -> Result<GuardState, E> {
        let mut slot = self.slot();

        resolve(session)?;
        if *slot == Some(session) {
            info!("Held session resolved; guard idle");
            *slot = None;
        }

        Ok(GuardState::from_slot(*slot))
    }

    /// Reconciles the guard with the registry after outside resolution.
    ///
    /// If the held session is no longer open (the game completed it) or the
    /// registry no longer knows it, the guard returns to idle. Returns the
    /// resulting state.
    #[instrument(skip(self, registry), fields(caller = %self.caller))]
    pub fn refresh<R: Registry + ?Sized>(&self, registry: &R) -> GuardState {
        let mut slot = self.slot();

        if let Some(session) = *slot {
            match registry.status(session) {
                Some(SessionStatus::Open) => {
                    debug!(session_id = %session, "Held session still open");
                }
                status => {
                    info!(session_id = %session, ?status, "Held session resolved; guard idle");
                    *slot = None;
                }
            }
        }

        GuardState::from_slot(*slot)
    }
}
