//! Lifecycle events recorded by the registry.

use crate::ids::{CallerId, SessionId};
use serde::{Deserialize, Serialize};

/// A successful change to a session, in the order the registry applied it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// A session was created.
    #[display("{} opened by {}", session, owner)]
    Opened {
        /// New session.
        session: SessionId,
        /// Its creator.
        owner: CallerId,
    },

    /// A second party joined a session.
    #[display("{} joined by {}", session, opponent)]
    Joined {
        /// Joined session.
        session: SessionId,
        /// The second party.
        opponent: CallerId,
    },

    /// The owner cancelled a session.
    #[display("{} cancelled by {}", session, owner)]
    Cancelled {
        /// Cancelled session.
        session: SessionId,
        /// Its creator.
        owner: CallerId,
    },

    /// The game resolved a session.
    #[display("{} completed", session)]
    Completed {
        /// Resolved session.
        session: SessionId,
    },
}

impl LifecycleEvent {
    /// The session this event concerns.
    pub fn session(&self) -> SessionId {
        match self {
            Self::Opened { session, .. }
            | Self::Joined { session, .. }
            | Self::Cancelled { session, .. }
            | Self::Completed { session } => *session,
        }
    }
}
