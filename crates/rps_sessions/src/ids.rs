//! Identifier types for sessions and callers.

use crate::error::RegistryError;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Opaque handle for a session, unique per creation.
///
/// Allocated by the registry; never reused within one registry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    derive_more::Display,
)]
#[display("session-{}", _0)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    /// Wraps a raw handle value.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

/// Identity of a caller (the owner of a guard, or an opponent joining).
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct CallerId(String);

impl CallerId {
    /// Parses a caller identity, rejecting empty or whitespace-only names.
    #[instrument(skip(raw))]
    pub fn parse(raw: impl Into<String>) -> Result<Self, RegistryError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RegistryError::InvalidOwner(raw));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this identity is well-formed.
    ///
    /// Identities built through [`CallerId::parse`] always are; deserialized
    /// ones may not be.
    pub fn is_well_formed(&self) -> bool {
        !self.0.trim().is_empty()
    }
}
