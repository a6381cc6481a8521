//! Error types for the registry and the guard.

use crate::ids::{CallerId, SessionId};
use crate::session::SessionStatus;

/// Error raised by the session registry.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum RegistryError {
    /// The owner identity is empty or otherwise malformed.
    #[display("Invalid caller identity: {:?}", _0)]
    InvalidOwner(#[error(not(source))] String),

    /// No session with this identifier exists.
    #[display("{} not found", _0)]
    NotFound(#[error(not(source))] SessionId),

    /// The requester did not create the session.
    #[display("{} is not the owner of {}", requester, session)]
    NotOwner {
        /// Session the requester tried to act on.
        session: SessionId,
        /// Identity that made the request.
        requester: CallerId,
    },

    /// The session has left the window in which its owner may cancel it.
    #[display("{} can no longer be cancelled", _0)]
    NotCancellable(#[error(not(source))] SessionId),

    /// The session cannot accept a second party.
    #[display("{} cannot be joined", _0)]
    NotJoinable(#[error(not(source))] SessionId),

    /// The session already reached a terminal status.
    #[display("{} is already {}", session, status)]
    AlreadyTerminal {
        /// Session that was targeted.
        session: SessionId,
        /// Its current status.
        status: SessionStatus,
    },
}

/// Error raised by a session guard.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum GuardError {
    /// The guard already holds an active session.
    #[display("Caller already has active session {}", _0)]
    AlreadyActive(#[error(not(source))] SessionId),

    /// The guard holds no session to cancel.
    #[display("Caller has no active session")]
    NoActiveSession,

    /// The registry rejected the request.
    #[display("{}", _0)]
    #[from]
    Registry(RegistryError),
}

impl GuardError {
    /// Returns the underlying registry error, if the registry was contacted and refused.
    pub fn registry_error(&self) -> Option<&RegistryError> {
        match self {
            Self::Registry(err) => Some(err),
            _ => None,
        }
    }
}
