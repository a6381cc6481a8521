//! Consistency checks between a guard and the registry it acts on.
//!
//! Used by tests and by the server after each transition; a violation means
//! the guard's bookkeeping and the registry disagree.

use crate::guard::{GuardState, SessionGuard};
use crate::registry::SessionRegistry;
use crate::session::SessionStatus;
use tracing::{instrument, warn};

/// A broken guard/registry invariant.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("Invariant violation: {}", description)]
pub struct InvariantViolation {
    /// What went wrong.
    pub description: String,
}

impl InvariantViolation {
    fn new(description: impl Into<String>) -> Self {
        let description = description.into();
        warn!(%description, "Invariant violated");
        Self { description }
    }
}

/// Invariant: the guard is active exactly when its caller has an open session
/// it created, and then it holds that session.
pub struct GuardConsistent;

impl GuardConsistent {
    /// Checks the invariant for `guard` against `registry`.
    ///
    /// Assumes `guard` is the only guard for its caller on `registry`.
    #[instrument(skip_all, fields(caller = %guard.caller()))]
    pub fn check(guard: &SessionGuard, registry: &SessionRegistry) -> Result<(), InvariantViolation> {
        let open: Vec<_> = registry
            .sessions_owned_by(guard.caller())
            .into_iter()
            .filter(|session| *session.status() == SessionStatus::Open)
            .collect();

        match (guard.state(), open.as_slice()) {
            (GuardState::Idle, []) => Ok(()),
            (GuardState::Active(held), [only]) if *only.id() == held => Ok(()),
            (GuardState::Idle, sessions) => Err(InvariantViolation::new(format!(
                "guard idle but caller owns {} open session(s)",
                sessions.len()
            ))),
            (GuardState::Active(held), sessions) => Err(InvariantViolation::new(format!(
                "guard holds {} but caller owns {} open session(s)",
                held,
                sessions.len()
            ))),
        }
    }
}
