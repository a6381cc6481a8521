//! Authoritative store of all game sessions.

use crate::error::RegistryError;
use crate::events::LifecycleEvent;
use crate::ids::{CallerId, SessionId};
use crate::policy::{CancelPolicy, Unjoined};
use crate::session::{Session, SessionStatus};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, info, instrument, warn};

/// Operations a guard needs from a session store.
pub trait Registry {
    /// Creates an open session owned by `owner`.
    fn open_session(&self, owner: &CallerId) -> Result<SessionId, RegistryError>;

    /// Cancels `session` on behalf of `requester`.
    fn cancel_session(&self, session: SessionId, requester: &CallerId)
    -> Result<(), RegistryError>;

    /// Current status of `session`, or `None` if it is unknown.
    fn status(&self, session: SessionId) -> Option<SessionStatus>;
}

type Record = Arc<Mutex<Session>>;

/// Events retained by a registry unless configured otherwise.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Shared registry of sessions, keyed by [`SessionId`].
///
/// The id→record map sits behind a read/write lock that is only written when
/// a session is created. Every record has its own mutex, so changes to
/// unrelated sessions do not wait on each other, and two concurrent changes to
/// the same session are applied one after the other.
///
/// The event log keeps only the most recent `event_capacity` events.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Record>>,
    next_id: AtomicU64,
    policy: Arc<dyn CancelPolicy>,
    events: Mutex<VecDeque<LifecycleEvent>>,
    event_capacity: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionRegistry {
    /// Creates an empty registry where sessions stay cancellable until joined.
    #[instrument]
    pub fn new() -> Self {
        Self::with_policy(Arc::new(Unjoined))
    }

    /// Creates an empty registry with a custom cancellability policy.
    #[instrument(skip(policy))]
    pub fn with_policy(policy: Arc<dyn CancelPolicy>) -> Self {
        info!("Creating session registry");
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            policy,
            events: Mutex::new(VecDeque::new()),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Retains at most `capacity` events, dropping the oldest first.
    ///
    /// A capacity of zero disables the event log.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    fn record(&self, id: SessionId) -> Result<Record, RegistryError> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.get(&id).cloned().ok_or_else(|| {
            debug!(session_id = %id, "Session not found");
            RegistryError::NotFound(id)
        })
    }

    fn emit(&self, event: LifecycleEvent) {
        info!(%event, "Session lifecycle event");
        if self.event_capacity == 0 {
            return;
        }
        let mut events = lock(&self.events);
        while events.len() >= self.event_capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Creates an open session owned by `owner` and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidOwner`] if `owner` is not well-formed.
    #[instrument(skip(self), fields(caller = %owner))]
    pub fn open_session(&self, owner: &CallerId) -> Result<SessionId, RegistryError> {
        if !owner.is_well_formed() {
            warn!("Rejected malformed owner");
            return Err(RegistryError::InvalidOwner(owner.as_str().to_string()));
        }

        let id = SessionId::from_raw(self.next_id.fetch_add(1, Ordering::Relaxed));
        let record = Arc::new(Mutex::new(Session::open(id, owner.clone())));
        let opened = lock(&record);
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::clone(&record));

        self.emit(LifecycleEvent::Opened {
            session: id,
            owner: opened.owner().clone(),
        });
        Ok(id)
    }

    /// Cancels an open session on behalf of its owner.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NotFound`] if the session is unknown
    /// - [`RegistryError::NotOwner`] if `requester` did not create it
    /// - [`RegistryError::NotCancellable`] if it is no longer open or the
    ///   policy says its cancellable window has passed
    #[instrument(skip(self), fields(session_id = %session, caller = %requester))]
    pub fn cancel_session(
        &self,
        session: SessionId,
        requester: &CallerId,
    ) -> Result<(), RegistryError> {
        let record = self.record(session)?;
        let mut current = lock(&record);

        if current.owner() != requester {
            warn!(owner = %current.owner(), "Cancel requested by non-owner");
            return Err(RegistryError::NotOwner {
                session,
                requester: requester.clone(),
            });
        }

        if current.status().is_terminal() || !self.policy.is_cancellable(&current) {
            warn!(
                status = %current.status(),
                has_opponent = current.has_opponent(),
                "Session outside cancellable window"
            );
            return Err(RegistryError::NotCancellable(session));
        }

        current
            .finish(SessionStatus::Cancelled)
            .map_err(|_| RegistryError::NotCancellable(session))?;

        self.emit(LifecycleEvent::Cancelled {
            session,
            owner: requester.clone(),
        });
        Ok(())
    }

    /// Seats `opponent` as the second party of an open session.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NotFound`] if the session is unknown
    /// - [`RegistryError::InvalidOwner`] if `opponent` is not well-formed
    /// - [`RegistryError::NotJoinable`] if the session is not open, already
    ///   has an opponent, or `opponent` is its owner
    #[instrument(skip(self), fields(session_id = %session, caller = %opponent))]
    pub fn join_session(
        &self,
        session: SessionId,
        opponent: &CallerId,
    ) -> Result<(), RegistryError> {
        if !opponent.is_well_formed() {
            return Err(RegistryError::InvalidOwner(opponent.as_str().to_string()));
        }
        let record = self.record(session)?;
        let mut current = lock(&record);
        current.seat_opponent(opponent.clone())?;

        self.emit(LifecycleEvent::Joined {
            session,
            opponent: opponent.clone(),
        });
        Ok(())
    }

    /// Marks an open session as resolved by the game.
    ///
    /// The owner's guard still holds the session until it is refreshed. Use
    /// [`SessionGuard::resolve_with`](crate::SessionGuard::resolve_with) to
    /// complete and release in one step.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NotFound`] if the session is unknown
    /// - [`RegistryError::AlreadyTerminal`] if it was already cancelled or completed
    #[instrument(skip(self), fields(session_id = %session))]
    pub fn complete_session(&self, session: SessionId) -> Result<(), RegistryError> {
        let record = self.record(session)?;
        let mut current = lock(&record);
        current.finish(SessionStatus::Completed)?;

        self.emit(LifecycleEvent::Completed { session });
        Ok(())
    }

    /// Returns a snapshot of the session, if it exists.
    #[instrument(skip(self))]
    pub fn session(&self, id: SessionId) -> Option<Session> {
        self.record(id).ok().map(|record| lock(&record).clone())
    }

    /// Returns the current status of the session, if it exists.
    pub fn status(&self, id: SessionId) -> Option<SessionStatus> {
        self.record(id).ok().map(|record| *lock(&record).status())
    }

    fn snapshot_where(&self, keep: impl Fn(&Session) -> bool) -> Vec<Session> {
        let records: Vec<Record> = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        let mut sessions: Vec<Session> = records
            .iter()
            .map(|record| lock(record).clone())
            .filter(|session| keep(session))
            .collect();
        sessions.sort_by_key(|session| *session.id());
        sessions
    }

    /// All sessions ever created by `owner`, oldest first.
    #[instrument(skip(self), fields(caller = %owner))]
    pub fn sessions_owned_by(&self, owner: &CallerId) -> Vec<Session> {
        let owned = self.snapshot_where(|session| session.owner() == owner);
        debug!(count = owned.len(), "Listed sessions by owner");
        owned
    }

    /// Open sessions still waiting for a second party, oldest first.
    #[instrument(skip(self))]
    pub fn open_sessions(&self) -> Vec<Session> {
        let open = self.snapshot_where(|session| {
            *session.status() == SessionStatus::Open && !session.has_opponent()
        });
        info!(count = open.len(), "Listed joinable sessions");
        open
    }

    /// Number of sessions ever created.
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no session was ever created.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retained lifecycle events, oldest first.
    pub fn events(&self) -> Vec<LifecycleEvent> {
        lock(&self.events).iter().cloned().collect()
    }

    /// Removes and returns the retained lifecycle events, oldest first.
    pub fn drain_events(&self) -> Vec<LifecycleEvent> {
        lock(&self.events).drain(..).collect()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.len())
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .field("event_capacity", &self.event_capacity)
            .finish_non_exhaustive()
    }
}

impl Registry for SessionRegistry {
    fn open_session(&self, owner: &CallerId) -> Result<SessionId, RegistryError> {
        SessionRegistry::open_session(self, owner)
    }

    fn cancel_session(
        &self,
        session: SessionId,
        requester: &CallerId,
    ) -> Result<(), RegistryError> {
        SessionRegistry::cancel_session(self, session, requester)
    }

    fn status(&self, session: SessionId) -> Option<SessionStatus> {
        SessionRegistry::status(self, session)
    }
}

impl<R: Registry + ?Sized> Registry for Arc<R> {
    fn open_session(&self, owner: &CallerId) -> Result<SessionId, RegistryError> {
        (**self).open_session(owner)
    }

    fn cancel_session(
        &self,
        session: SessionId,
        requester: &CallerId,
    ) -> Result<(), RegistryError> {
        (**self).cancel_session(session, requester)
    }

    fn status(&self, session: SessionId) -> Option<SessionStatus> {
        (**self).status(session)
    }
}
