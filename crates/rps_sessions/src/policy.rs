//! Cancellability predicates.
//!
//! Whether an open session may still be withdrawn by its owner depends on
//! game mechanics outside the registry. The registry asks a [`CancelPolicy`]
//! instead of deciding itself.

use crate::session::Session;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Decides whether an open session is inside its cancellable window.
///
/// Only consulted for sessions whose status is `Open`; status and ownership
/// are checked by the registry first.
pub trait CancelPolicy: Send + Sync {
    /// Returns `true` if the owner may cancel `session` now.
    fn is_cancellable(&self, session: &Session) -> bool;
}

impl<F> CancelPolicy for F
where
    F: Fn(&Session) -> bool + Send + Sync,
{
    fn is_cancellable(&self, session: &Session) -> bool {
        self(session)
    }
}

/// Cancellable until a second party joins.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unjoined;

impl CancelPolicy for Unjoined {
    fn is_cancellable(&self, session: &Session) -> bool {
        !session.has_opponent()
    }
}

/// Cancellable for as long as the session is open.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unrestricted;

impl CancelPolicy for Unrestricted {
    fn is_cancellable(&self, _session: &Session) -> bool {
        true
    }
}

/// Built-in policies selectable from configuration.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PolicyKind {
    /// See [`Unjoined`].
    #[default]
    Unjoined,
    /// See [`Unrestricted`].
    Unrestricted,
}

impl PolicyKind {
    /// Builds the policy this kind names.
    pub fn build(self) -> Arc<dyn CancelPolicy> {
        match self {
            Self::Unjoined => Arc::new(Unjoined),
            Self::Unrestricted => Arc::new(Unrestricted),
        }
    }
}
