//! Session lifecycle core for rock-paper-scissors games.
//!
//! # Architecture
//!
//! - **Registry**: [`SessionRegistry`] owns every [`Session`] and is shared by
//!   all callers
//! - **Guard**: [`SessionGuard`] wraps one caller and allows it a single active
//!   session at a time
//! - **Policy**: [`CancelPolicy`] decides when an open session may still be
//!   cancelled
//!
//! # Example
//!
//! ```
//! use rps_sessions::{CallerId, GuardError, SessionGuard, SessionRegistry, SessionStatus};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = SessionRegistry::new();
//! let guard = SessionGuard::new(CallerId::parse("alice")?);
//!
//! let session = guard.start(&registry)?;
//! assert_eq!(registry.status(session), Some(SessionStatus::Open));
//! assert_eq!(guard.start(&registry), Err(GuardError::AlreadyActive(session)));
//!
//! guard.cancel(&registry)?;
//! assert_eq!(registry.status(session), Some(SessionStatus::Cancelled));
//! assert_eq!(guard.cancel(&registry), Err(GuardError::NoActiveSession));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod events;
mod guard;
mod ids;
mod invariants;
mod policy;
mod registry;
mod session;

pub use error::{GuardError, RegistryError};
pub use events::LifecycleEvent;
pub use guard::{GuardState, SessionGuard};
pub use ids::{CallerId, SessionId};
pub use invariants::{GuardConsistent, InvariantViolation};
pub use policy::{CancelPolicy, PolicyKind, Unjoined, Unrestricted};
pub use registry::{DEFAULT_EVENT_CAPACITY, Registry, SessionRegistry};
pub use session::{Session, SessionStatus};
