//! Session records and their status transitions.
//!
//! A session moves forward only:
//!
//! ```text
//! Open ──cancel──▶ Cancelled
//!   └───complete─▶ Completed
//! ```
//!
//! Terminal statuses never change again.

use crate::error::RegistryError;
use crate::ids::{CallerId, SessionId};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

/// Lifecycle status of a session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionStatus {
    /// Accepting a second party; the owner may still cancel.
    Open,
    /// Withdrawn by its owner.
    Cancelled,
    /// Resolved by the game itself.
    Completed,
}

impl SessionStatus {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Open)
    }
}

/// One game session, as held by the registry.
///
/// Values handed out by the registry are snapshots; the registry keeps the
/// authoritative record.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    owner: CallerId,
    status: SessionStatus,
    opponent: Option<CallerId>,
}

impl Session {
    /// Creates an open session with no opponent.
    pub(crate) fn open(id: SessionId, owner: CallerId) -> Self {
        Self {
            id,
            owner,
            status: SessionStatus::Open,
            opponent: None,
        }
    }

    /// Whether a second party has joined.
    pub fn has_opponent(&self) -> bool {
        self.opponent.is_some()
    }

    /// Moves the session to a terminal status.
    ///
    /// Fails if the session is already terminal or `next` is `Open`.
    #[instrument(skip(self), fields(session_id = %self.id, from = %self.status))]
    pub(crate) fn finish(&mut self, next: SessionStatus) -> Result<(), RegistryError> {
        if self.status.is_terminal() || !next.is_terminal() {
            warn!(to = %next, "Rejected backward or repeated transition");
            return Err(RegistryError::AlreadyTerminal {
                session: self.id,
                status: self.status,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Seats a second party in an open session.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub(crate) fn seat_opponent(&mut self, opponent: CallerId) -> Result<(), RegistryError> {
        if self.status.is_terminal() || self.opponent.is_some() || opponent == self.owner {
            warn!(opponent = %opponent, status = %self.status, "Session not joinable");
            return Err(RegistryError::NotJoinable(self.id));
        }
        self.opponent = Some(opponent);
        Ok(())
    }
}
