//! Tests for the session registry.

use std::sync::{Arc, Barrier};

use rps_sessions::{
    CallerId, DEFAULT_EVENT_CAPACITY, LifecycleEvent, PolicyKind, RegistryError, Session, SessionId, SessionRegistry,
    SessionStatus, Unrestricted,
};

fn caller(name: &str) -> CallerId {
    CallerId::parse(name).expect("Valid caller name")
}

#[test]
fn test_open_session_is_open_and_owned() {
    let registry = SessionRegistry::new();
    let owner = caller("alice");

    let id = registry.open_session(&owner).expect("Open failed");
    let session = registry.session(id).expect("Session missing");

    assert_eq!(session.id(), &id);
    assert_eq!(session.owner(), &owner);
    assert_eq!(session.status(), &SessionStatus::Open);
    assert!(!session.has_opponent());
}

#[test]
fn test_session_ids_are_unique() {
    let registry = SessionRegistry::new();
    let owner = caller("alice");

    let first = registry.open_session(&owner).expect("Open failed");
    let second = registry.open_session(&owner).expect("Open failed");

    assert_ne!(first, second);
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_caller_id_rejects_blank_names() {
    assert!(matches!(
        CallerId::parse("   "),
        Err(RegistryError::InvalidOwner(_))
    ));
    assert_eq!(caller("  alice ").as_str(), "alice");
}

#[test]
fn test_open_session_rejects_malformed_owner() {
    let registry = SessionRegistry::new();
    let blank: CallerId = serde_json::from_str("\"\"").expect("Deserialize failed");

    let result = registry.open_session(&blank);

    assert!(matches!(result, Err(RegistryError::InvalidOwner(_))));
    assert!(registry.is_empty());
}

#[test]
fn test_cancel_unknown_session_is_not_found() {
    let registry = SessionRegistry::new();
    let missing = SessionId::from_raw(42);

    let result = registry.cancel_session(missing, &caller("alice"));

    assert_eq!(result, Err(RegistryError::NotFound(missing)));
}

#[test]
fn test_cancel_by_non_owner_is_rejected() {
    let registry = SessionRegistry::new();
    let id = registry.open_session(&caller("alice")).expect("Open failed");

    let result = registry.cancel_session(id, &caller("mallory"));

    assert_eq!(
        result,
        Err(RegistryError::NotOwner {
            session: id,
            requester: caller("mallory"),
        })
    );
    assert_eq!(registry.status(id), Some(SessionStatus::Open));
}

#[test]
fn test_cancel_after_join_is_not_cancellable() {
    let registry = SessionRegistry::new();
    let owner = caller("alice");
    let id = registry.open_session(&owner).expect("Open failed");
    registry.join_session(id, &caller("bob")).expect("Join failed");

    let result = registry.cancel_session(id, &owner);

    assert_eq!(result, Err(RegistryError::NotCancellable(id)));
    assert_eq!(registry.status(id), Some(SessionStatus::Open));
}

#[test]
fn test_cancel_twice_is_not_cancellable() {
    let registry = SessionRegistry::new();
    let owner = caller("alice");
    let id = registry.open_session(&owner).expect("Open failed");
    registry.cancel_session(id, &owner).expect("First cancel failed");

    let result = registry.cancel_session(id, &owner);

    assert_eq!(result, Err(RegistryError::NotCancellable(id)));
    assert_eq!(registry.status(id), Some(SessionStatus::Cancelled));
}

#[test]
fn test_unrestricted_policy_allows_cancel_after_join() {
    let registry = SessionRegistry::with_policy(Arc::new(Unrestricted));
    let owner = caller("alice");
    let id = registry.open_session(&owner).expect("Open failed");
    registry.join_session(id, &caller("bob")).expect("Join failed");

    registry.cancel_session(id, &owner).expect("Cancel should be allowed");

    assert_eq!(registry.status(id), Some(SessionStatus::Cancelled));
}

#[test]
fn test_closure_policy_is_consulted() {
    let registry = SessionRegistry::with_policy(Arc::new(|_: &Session| false));
    let owner = caller("alice");
    let id = registry.open_session(&owner).expect("Open failed");

    let result = registry.cancel_session(id, &owner);

    assert_eq!(result, Err(RegistryError::NotCancellable(id)));
}

#[test]
fn test_policy_kind_builds_named_policy() {
    let registry = SessionRegistry::with_policy(PolicyKind::Unrestricted.build());
    let owner = caller("alice");
    let id = registry.open_session(&owner).expect("Open failed");
    registry.join_session(id, &caller("bob")).expect("Join failed");
    registry.cancel_session(id, &owner).expect("Unrestricted should allow cancel");

    let kind: PolicyKind = "unjoined".parse().expect("Parse failed");
    assert_eq!(kind, PolicyKind::Unjoined);
    assert_eq!(PolicyKind::default(), PolicyKind::Unjoined);
}

#[test]
fn test_join_rules() {
    let registry = SessionRegistry::new();
    let owner = caller("alice");
    let id = registry.open_session(&owner).expect("Open failed");

    assert_eq!(
        registry.join_session(id, &owner),
        Err(RegistryError::NotJoinable(id)),
        "Owner cannot join their own session"
    );

    registry.join_session(id, &caller("bob")).expect("Join failed");
    assert_eq!(
        registry.join_session(id, &caller("carol")),
        Err(RegistryError::NotJoinable(id)),
        "Session already has an opponent"
    );

    let missing = SessionId::from_raw(999);
    assert_eq!(
        registry.join_session(missing, &caller("carol")),
        Err(RegistryError::NotFound(missing))
    );
}

#[test]
fn test_cancelled_session_cannot_be_joined_or_completed() {
    let registry = SessionRegistry::new();
    let owner = caller("alice");
    let id = registry.open_session(&owner).expect("Open failed");
    registry.cancel_session(id, &owner).expect("Cancel failed");

    assert_eq!(
        registry.join_session(id, &caller("bob")),
        Err(RegistryError::NotJoinable(id))
    );
    assert_eq!(
        registry.complete_session(id),
        Err(RegistryError::AlreadyTerminal {
            session: id,
            status: SessionStatus::Cancelled,
        })
    );
}

#[test]
fn test_completed_session_is_not_cancellable() {
    let registry = SessionRegistry::new();
    let owner = caller("alice");
    let id = registry.open_session(&owner).expect("Open failed");
    registry.complete_session(id).expect("Complete failed");

    assert_eq!(
        registry.cancel_session(id, &owner),
        Err(RegistryError::NotCancellable(id))
    );
    assert_eq!(registry.status(id), Some(SessionStatus::Completed));
}

#[test]
fn test_open_sessions_lists_only_joinable() {
    let registry = SessionRegistry::new();
    let alice = caller("alice");
    let a = registry.open_session(&alice).expect("Open failed");
    let b = registry.open_session(&caller("bob")).expect("Open failed");
    let c = registry.open_session(&caller("carol")).expect("Open failed");
    registry.cancel_session(a, &alice).expect("Cancel failed");
    registry.join_session(b, &caller("dave")).expect("Join failed");

    let open: Vec<SessionId> = registry.open_sessions().iter().map(|s| *s.id()).collect();

    assert_eq!(open, vec![c]);
}

#[test]
fn test_events_record_lifecycle_in_order() {
    let registry = SessionRegistry::new();
    let owner = caller("alice");
    let id = registry.open_session(&owner).expect("Open failed");
    registry.cancel_session(id, &owner).expect("Cancel failed");

    assert_eq!(
        registry.events(),
        vec![
            LifecycleEvent::Opened {
                session: id,
                owner: owner.clone(),
            },
            LifecycleEvent::Cancelled { session: id, owner },
        ]
    );
}

#[test]
fn test_failed_operations_record_no_events() {
    let registry = SessionRegistry::new();
    let id = registry.open_session(&caller("alice")).expect("Open failed");
    let _ = registry.cancel_session(id, &caller("mallory"));
    let _ = registry.cancel_session(SessionId::from_raw(77), &caller("alice"));

    assert_eq!(registry.events().len(), 1);
}

#[test]
fn test_concurrent_cancels_of_one_session_succeed_once() {
    const THREADS: usize = 8;

    let registry = SessionRegistry::new();
    let owner = caller("alice");
    let id = registry.open_session(&owner).expect("Open failed");
    let barrier = Barrier::new(THREADS);

    let successes = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    registry.cancel_session(id, &owner).is_ok()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("Thread panicked"))
            .filter(|ok| *ok)
            .count()
    });

    assert_eq!(successes, 1);
    assert_eq!(registry.status(id), Some(SessionStatus::Cancelled));
}

#[test]
fn test_event_display_and_serialization() {
    let event = LifecycleEvent::Completed {
        session: SessionId::from_raw(5),
    };

    assert_eq!(event.to_string(), "session-5 completed");
    assert_eq!(event.session(), SessionId::from_raw(5));

    let json = serde_json::to_value(&event).expect("Serialize failed");
    assert_eq!(json["event"], "completed");
    assert_eq!(json["session"], 5);
}

#[test]
fn test_event_log_keeps_most_recent_events() {
    let registry = SessionRegistry::new().with_event_capacity(4);
    let owner = caller("alice");

    let mut last = None;
    for _ in 0..10 {
        let id = registry.open_session(&owner).expect("Open failed");
        registry.cancel_session(id, &owner).expect("Cancel failed");
        last = Some(id);
    }
    let last = last.expect("At least one cycle");

    let events = registry.events();
    assert_eq!(events.len(), 4);
    assert_eq!(
        events.last(),
        Some(&LifecycleEvent::Cancelled {
            session: last,
            owner: owner.clone(),
        })
    );
}

#[test]
fn test_default_event_capacity_bounds_log() {
    let registry = SessionRegistry::new();
    let owner = caller("alice");

    for _ in 0..DEFAULT_EVENT_CAPACITY {
        let id = registry.open_session(&owner).expect("Open failed");
        registry.cancel_session(id, &owner).expect("Cancel failed");
    }

    assert_eq!(registry.events().len(), DEFAULT_EVENT_CAPACITY);
}

#[test]
fn test_drain_events_empties_log() {
    let registry = SessionRegistry::new();
    let owner = caller("alice");
    let id = registry.open_session(&owner).expect("Open failed");
    registry.cancel_session(id, &owner).expect("Cancel failed");

    assert_eq!(registry.drain_events().len(), 2);
    assert!(registry.events().is_empty());
}

#[test]
fn test_zero_event_capacity_records_nothing() {
    let registry = SessionRegistry::new().with_event_capacity(0);

    registry.open_session(&caller("alice")).expect("Open failed");

    assert!(registry.events().is_empty());
}
