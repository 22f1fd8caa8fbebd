//! Engine contract tests against the in-memory store.
//!
//! These suites exercise the registration, attendance, coupon, and
//! notification engines end to end through the store traits. The same
//! contracts run against PostgreSQL in `gather-postgres`'s
//! testcontainers suite; here they run at memory speed on every build.

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]
#![allow(clippy::expect_used)]
#![allow(clippy::too_many_lines)]
#![allow(missing_docs)]

use chrono::Duration;
use gather_core::attendance::AttendanceEngine;
use gather_core::coupons::CouponEngine;
use gather_core::notifications::NotificationEngine;
use gather_core::registration::{RegistrationEngine, RegistrationPolicy};
use gather_core::store::RegistrationStore;
use gather_core::types::{CouponId, RegistrationStatus, UserIdentifier};
use gather_core::{Clock, ConflictReason, Error};
use gather_testing::{fixtures, FixedClock, MemoryStore};
use std::sync::Arc;

fn registration_engine(store: &Arc<MemoryStore>) -> RegistrationEngine<MemoryStore> {
    RegistrationEngine::new(
        store.clone(),
        Arc::new(FixedClock::new(fixtures::base_time())),
        RegistrationPolicy::default(),
    )
}

fn attendance_engine(
    store: &Arc<MemoryStore>,
    clock: impl Clock + 'static,
) -> AttendanceEngine<MemoryStore> {
    AttendanceEngine::new(store.clone(), Arc::new(clock))
}

fn assert_conflict(err: &Error, reason: ConflictReason) {
    match err {
        Error::Conflict(r) => assert_eq!(*r, reason),
        other => panic!("expected conflict {reason:?}, got {other:?}"),
    }
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn concurrent_registration_never_exceeds_capacity() {
    let store = Arc::new(MemoryStore::new());
    let org = fixtures::organization().insert(store.as_ref()).await.unwrap();
    let event = fixtures::event(org.id)
        .max_capacity(3)
        .insert(store.as_ref())
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..10 {
        let store = store.clone();
        let event_id = event.id;
        handles.push(tokio::spawn(async move {
            let user = fixtures::user()
                .external_id(&format!("ext-{i}"))
                .email(&format!("u{i}@example.com"))
                .insert(store.as_ref())
                .await
                .unwrap();
            let engine = registration_engine(&store);
            engine.register_for_event(&user, event_id).await
        }));
    }

    let mut admitted = 0;
    let mut full = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(err) => {
                assert_conflict(&err, ConflictReason::CapacityExceeded);
                full += 1;
            }
        }
    }

    assert_eq!(admitted, 3);
    assert_eq!(full, 7);
    assert_eq!(store.confirmed_count(event.id).await.unwrap(), 3);
}

#[tokio::test]
async fn repeating_registration_conflicts_and_leaves_one_record() {
    let store = Arc::new(MemoryStore::new());
    let org = fixtures::organization().insert(store.as_ref()).await.unwrap();
    let event = fixtures::event(org.id).insert(store.as_ref()).await.unwrap();
    let user = fixtures::user().insert(store.as_ref()).await.unwrap();

    let engine = registration_engine(&store);
    engine.register_for_event(&user, event.id).await.unwrap();
    let err = engine.register_for_event(&user, event.id).await.unwrap_err();
    assert_conflict(&err, ConflictReason::AlreadyRegistered);

    let registrations = store.registrations_for_event(event.id).await.unwrap();
    assert_eq!(registrations.len(), 1);
}

#[tokio::test]
async fn registration_past_deadline_conflicts_regardless_of_capacity() {
    let store = Arc::new(MemoryStore::new());
    let org = fixtures::organization().insert(store.as_ref()).await.unwrap();
    let deadline = fixtures::base_time() - Duration::hours(1);
    let event = fixtures::event(org.id)
        .max_capacity(100)
        .registration_deadline(deadline)
        .insert(store.as_ref())
        .await
        .unwrap();
    let user = fixtures::user().insert(store.as_ref()).await.unwrap();

    let engine = registration_engine(&store);
    let err = engine.register_for_event(&user, event.id).await.unwrap_err();
    assert_conflict(&err, ConflictReason::DeadlinePassed);
    assert_eq!(store.confirmed_count(event.id).await.unwrap(), 0);
}

#[tokio::test]
async fn registration_for_missing_event_is_not_found() {
    let store = Arc::new(MemoryStore::new());
    let user = fixtures::user().insert(store.as_ref()).await.unwrap();
    let engine = registration_engine(&store);

    let err = engine
        .register_for_event(&user, gather_core::EventId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { entity: "event" }));
}

#[tokio::test]
async fn event_side_and_user_side_views_report_the_same_registration() {
    let store = Arc::new(MemoryStore::new());
    let org = fixtures::organization().insert(store.as_ref()).await.unwrap();
    let event = fixtures::event(org.id).insert(store.as_ref()).await.unwrap();
    let user = fixtures::user().insert(store.as_ref()).await.unwrap();

    let engine = registration_engine(&store);
    let created = engine.register_for_event(&user, event.id).await.unwrap();

    let event_view = store.registrations_for_event(event.id).await.unwrap();
    let user_view = store.registrations_for_user(user.id).await.unwrap();
    assert_eq!(event_view, vec![created.clone()]);
    assert_eq!(user_view, vec![created]);
}

#[tokio::test]
async fn cancellation_keeps_the_record_and_frees_the_seat() {
    let store = Arc::new(MemoryStore::new());
    let org = fixtures::organization().insert(store.as_ref()).await.unwrap();
    let event = fixtures::event(org.id)
        .max_capacity(1)
        .insert(store.as_ref())
        .await
        .unwrap();
    let alice = fixtures::user()
        .external_id("ext-alice")
        .email("alice@example.com")
        .insert(store.as_ref())
        .await
        .unwrap();
    let bob = fixtures::user()
        .external_id("ext-bob")
        .email("bob@example.com")
        .insert(store.as_ref())
        .await
        .unwrap();

    let engine = registration_engine(&store);
    engine.register_for_event(&alice, event.id).await.unwrap();
    engine.cancel_event_registration(&alice, event.id).await.unwrap();

    // Cancelled record is retained, not deleted.
    let record = store
        .event_registration(event.id, alice.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, RegistrationStatus::Cancelled);

    // Repeat cancellation is a conflict.
    let err = engine
        .cancel_event_registration(&alice, event.id)
        .await
        .unwrap_err();
    assert_conflict(&err, ConflictReason::AlreadyCancelled);

    // The freed seat admits the next registrant.
    engine.register_for_event(&bob, event.id).await.unwrap();
}

#[tokio::test]
async fn session_capacity_is_independent_of_event_capacity() {
    let store = Arc::new(MemoryStore::new());
    let org = fixtures::organization().insert(store.as_ref()).await.unwrap();
    let event = fixtures::event(org.id)
        .max_capacity(1)
        .insert(store.as_ref())
        .await
        .unwrap();
    let session = fixtures::session(event.id)
        .max_capacity(2)
        .insert(store.as_ref())
        .await
        .unwrap();

    let engine = registration_engine(&store);
    for i in 0..2 {
        let user = fixtures::user()
            .external_id(&format!("sess-{i}"))
            .email(&format!("s{i}@example.com"))
            .insert(store.as_ref())
            .await
            .unwrap();
        engine
            .register_for_session(&user, event.id, session.id)
            .await
            .unwrap();
    }

    let third = fixtures::user()
        .external_id("sess-3")
        .email("s3@example.com")
        .insert(store.as_ref())
        .await
        .unwrap();
    let err = engine
        .register_for_session(&third, event.id, session.id)
        .await
        .unwrap_err();
    assert_conflict(&err, ConflictReason::CapacityExceeded);
}

#[tokio::test]
async fn session_registration_can_require_event_registration() {
    let store = Arc::new(MemoryStore::new());
    let org = fixtures::organization().insert(store.as_ref()).await.unwrap();
    let event = fixtures::event(org.id).insert(store.as_ref()).await.unwrap();
    let session = fixtures::session(event.id).insert(store.as_ref()).await.unwrap();
    let user = fixtures::user().insert(store.as_ref()).await.unwrap();

    let strict = RegistrationEngine::new(
        store.clone(),
        Arc::new(FixedClock::new(fixtures::base_time())),
        RegistrationPolicy {
            require_event_registration: true,
        },
    );

    let err = strict
        .register_for_session(&user, event.id, session.id)
        .await
        .unwrap_err();
    assert_conflict(&err, ConflictReason::NotRegistered);

    strict.register_for_event(&user, event.id).await.unwrap();
    strict
        .register_for_session(&user, event.id, session.id)
        .await
        .unwrap();
}

#[tokio::test]
async fn session_must_belong_to_the_named_event() {
    let store = Arc::new(MemoryStore::new());
    let org = fixtures::organization().insert(store.as_ref()).await.unwrap();
    let event_a = fixtures::event(org.id).insert(store.as_ref()).await.unwrap();
    let event_b = fixtures::event(org.id)
        .name("Other Conf")
        .insert(store.as_ref())
        .await
        .unwrap();
    let session_b = fixtures::session(event_b.id).insert(store.as_ref()).await.unwrap();
    let user = fixtures::user().insert(store.as_ref()).await.unwrap();

    let engine = registration_engine(&store);
    let err = engine
        .register_for_session(&user, event_a.id, session_b.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
}

// ============================================================================
// Attendance
// ============================================================================

#[tokio::test]
async fn check_in_flips_once_then_reports_repeat_with_original_timestamp() {
    let store = Arc::new(MemoryStore::new());
    let org = fixtures::organization().insert(store.as_ref()).await.unwrap();
    let event = fixtures::event(org.id).insert(store.as_ref()).await.unwrap();
    let user = fixtures::user().insert(store.as_ref()).await.unwrap();
    registration_engine(&store)
        .register_for_event(&user, event.id)
        .await
        .unwrap();

    let first_scan_at = fixtures::base_time() + Duration::days(30);
    let first = attendance_engine(&store, FixedClock::new(first_scan_at))
        .check_in(&org, event.id, &UserIdentifier::Id(user.id))
        .await
        .unwrap();
    assert!(!first.already_checked_in);
    assert_eq!(first.checked_in_at, first_scan_at);

    // A later scan reports the first timestamp, not its own.
    let second = attendance_engine(
        &store,
        FixedClock::new(first_scan_at + Duration::minutes(20)),
    )
    .check_in(&org, event.id, &UserIdentifier::Id(user.id))
    .await
    .unwrap();
    assert!(second.already_checked_in);
    assert_eq!(second.checked_in_at, first_scan_at);
}

#[tokio::test]
async fn check_in_resolves_external_identifiers() {
    let store = Arc::new(MemoryStore::new());
    let org = fixtures::organization().insert(store.as_ref()).await.unwrap();
    let event = fixtures::event(org.id).insert(store.as_ref()).await.unwrap();
    let user = fixtures::user()
        .external_id("badge-xyz")
        .insert(store.as_ref())
        .await
        .unwrap();
    registration_engine(&store)
        .register_for_event(&user, event.id)
        .await
        .unwrap();

    let record = attendance_engine(&store, FixedClock::new(fixtures::base_time()))
        .check_in(&org, event.id, &UserIdentifier::parse("badge-xyz"))
        .await
        .unwrap();
    assert_eq!(record.user.id, user.id);
}

#[tokio::test]
async fn check_in_without_confirmed_registration_conflicts() {
    let store = Arc::new(MemoryStore::new());
    let org = fixtures::organization().insert(store.as_ref()).await.unwrap();
    let event = fixtures::event(org.id).insert(store.as_ref()).await.unwrap();
    let user = fixtures::user().insert(store.as_ref()).await.unwrap();

    let engine = attendance_engine(&store, FixedClock::new(fixtures::base_time()));
    let err = engine
        .check_in(&org, event.id, &UserIdentifier::Id(user.id))
        .await
        .unwrap_err();
    assert_conflict(&err, ConflictReason::NotRegistered);

    // A cancelled registration is not eligible either.
    registration_engine(&store)
        .register_for_event(&user, event.id)
        .await
        .unwrap();
    registration_engine(&store)
        .cancel_event_registration(&user, event.id)
        .await
        .unwrap();
    let err = engine
        .check_in(&org, event.id, &UserIdentifier::Id(user.id))
        .await
        .unwrap_err();
    assert_conflict(&err, ConflictReason::NotRegistered);
}

#[tokio::test]
async fn check_in_hides_events_of_other_organizations() {
    let store = Arc::new(MemoryStore::new());
    let owner_org = fixtures::organization().insert(store.as_ref()).await.unwrap();
    let other_org = fixtures::organization()
        .name("Rival Org")
        .owner("owner-2")
        .insert(store.as_ref())
        .await
        .unwrap();
    let event = fixtures::event(owner_org.id).insert(store.as_ref()).await.unwrap();
    let user = fixtures::user().insert(store.as_ref()).await.unwrap();
    registration_engine(&store)
        .register_for_event(&user, event.id)
        .await
        .unwrap();

    let err = attendance_engine(&store, FixedClock::new(fixtures::base_time()))
        .check_in(&other_org, event.id, &UserIdentifier::Id(user.id))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { entity: "event" }));
}

// ============================================================================
// Coupons
// ============================================================================

#[tokio::test]
async fn coupon_redeems_once_then_conflicts() {
    let store = Arc::new(MemoryStore::new());
    let org = fixtures::organization().insert(store.as_ref()).await.unwrap();
    let event = fixtures::event(org.id).insert(store.as_ref()).await.unwrap();
    let user = fixtures::user().insert(store.as_ref()).await.unwrap();
    registration_engine(&store)
        .register_for_event(&user, event.id)
        .await
        .unwrap();

    let engine = CouponEngine::new(store.clone(), Arc::new(FixedClock::new(fixtures::base_time())));
    let coupon = engine
        .add_coupon(&org, event.id, "Lunch", None, 100)
        .await
        .unwrap();

    let receipt = engine
        .redeem(&org, event.id, &UserIdentifier::Id(user.id), coupon.coupon_id)
        .await
        .unwrap();
    assert_eq!(receipt.coupon.name, "Lunch");

    let err = engine
        .redeem(&org, event.id, &UserIdentifier::Id(user.id), coupon.coupon_id)
        .await
        .unwrap_err();
    assert_conflict(&err, ConflictReason::AlreadyRedeemed);
}

#[tokio::test]
async fn redeeming_an_unknown_coupon_is_not_found() {
    let store = Arc::new(MemoryStore::new());
    let org = fixtures::organization().insert(store.as_ref()).await.unwrap();
    let event = fixtures::event(org.id).insert(store.as_ref()).await.unwrap();
    let user = fixtures::user().insert(store.as_ref()).await.unwrap();
    registration_engine(&store)
        .register_for_event(&user, event.id)
        .await
        .unwrap();

    let engine = CouponEngine::new(store.clone(), Arc::new(FixedClock::new(fixtures::base_time())));
    let err = engine
        .redeem(&org, event.id, &UserIdentifier::Id(user.id), CouponId::new(42))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { entity: "coupon" }));
}

#[tokio::test]
async fn unregistered_user_cannot_redeem_then_can_after_registering() {
    let store = Arc::new(MemoryStore::new());
    let org = fixtures::organization().insert(store.as_ref()).await.unwrap();
    let event = fixtures::event(org.id).insert(store.as_ref()).await.unwrap();
    let user = fixtures::user().insert(store.as_ref()).await.unwrap();

    let engine = CouponEngine::new(store.clone(), Arc::new(FixedClock::new(fixtures::base_time())));
    let coupon = engine
        .add_coupon(&org, event.id, "Lunch", Some("Day 1 lunch"), 50)
        .await
        .unwrap();

    let err = engine
        .redeem(&org, event.id, &UserIdentifier::Id(user.id), coupon.coupon_id)
        .await
        .unwrap_err();
    assert_conflict(&err, ConflictReason::NotRegistered);

    registration_engine(&store)
        .register_for_event(&user, event.id)
        .await
        .unwrap();
    engine
        .redeem(&org, event.id, &UserIdentifier::Id(user.id), coupon.coupon_id)
        .await
        .unwrap();

    let err = engine
        .redeem(&org, event.id, &UserIdentifier::Id(user.id), coupon.coupon_id)
        .await
        .unwrap_err();
    assert_conflict(&err, ConflictReason::AlreadyRedeemed);
}

#[tokio::test]
async fn coupon_ids_are_assigned_sequentially_per_event() {
    let store = Arc::new(MemoryStore::new());
    let org = fixtures::organization().insert(store.as_ref()).await.unwrap();
    let event = fixtures::event(org.id).insert(store.as_ref()).await.unwrap();

    let engine = CouponEngine::new(store.clone(), Arc::new(FixedClock::new(fixtures::base_time())));
    let lunch = engine.add_coupon(&org, event.id, "Lunch", None, 10).await.unwrap();
    let dinner = engine.add_coupon(&org, event.id, "Dinner", None, 10).await.unwrap();
    assert_eq!(lunch.coupon_id, CouponId::new(1));
    assert_eq!(dinner.coupon_id, CouponId::new(2));
}

// ============================================================================
// Notifications
// ============================================================================

#[tokio::test]
async fn fan_out_targets_only_confirmed_registrants_at_creation_time() {
    let store = Arc::new(MemoryStore::new());
    let org = fixtures::organization().insert(store.as_ref()).await.unwrap();
    let event = fixtures::event(org.id).insert(store.as_ref()).await.unwrap();
    let registration = registration_engine(&store);

    let confirmed = fixtures::user()
        .external_id("n-1")
        .email("n1@example.com")
        .insert(store.as_ref())
        .await
        .unwrap();
    registration.register_for_event(&confirmed, event.id).await.unwrap();

    let cancelled = fixtures::user()
        .external_id("n-2")
        .email("n2@example.com")
        .insert(store.as_ref())
        .await
        .unwrap();
    registration.register_for_event(&cancelled, event.id).await.unwrap();
    registration
        .cancel_event_registration(&cancelled, event.id)
        .await
        .unwrap();

    let engine = NotificationEngine::new(
        store.clone(),
        Arc::new(FixedClock::new(fixtures::base_time())),
    );
    let (notification, delivered) = engine
        .create(&org, event.id, "Doors open", "Hall A at 9am", false)
        .await
        .unwrap();
    assert_eq!(delivered, 1);

    // Repair pass finds nothing missing.
    let repaired = engine.rematerialize(&org, notification.id).await.unwrap();
    assert_eq!(repaired, 0);

    let inbox = engine.list_for_user(&confirmed).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].1.title, "Doors open");
    assert!(engine.list_for_user(&cancelled).await.unwrap().is_empty());
}

#[tokio::test]
async fn mark_read_stamps_once_and_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let org = fixtures::organization().insert(store.as_ref()).await.unwrap();
    let event = fixtures::event(org.id).insert(store.as_ref()).await.unwrap();
    let user = fixtures::user().insert(store.as_ref()).await.unwrap();
    registration_engine(&store)
        .register_for_event(&user, event.id)
        .await
        .unwrap();

    let engine = NotificationEngine::new(
        store.clone(),
        Arc::new(FixedClock::new(fixtures::base_time())),
    );
    let (notification, _) = engine
        .create(&org, event.id, "Reminder", "Bring your badge", false)
        .await
        .unwrap();

    engine.mark_read(&user, notification.id).await.unwrap();
    engine.mark_read(&user, notification.id).await.unwrap();

    let inbox = engine.list_for_user(&user).await.unwrap();
    assert!(inbox[0].0.is_read);
    assert!(inbox[0].0.read_at.is_some());

    let stranger = fixtures::user()
        .external_id("stranger")
        .email("x@example.com")
        .insert(store.as_ref())
        .await
        .unwrap();
    let err = engine.mark_read(&stranger, notification.id).await.unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
}

// ============================================================================
// Full scenarios
// ============================================================================

/// Capacity-one walkthrough: admit A, refuse B, check A in twice.
#[tokio::test]
async fn capacity_one_event_scenario() {
    let store = Arc::new(MemoryStore::new());
    let org = fixtures::organization().insert(store.as_ref()).await.unwrap();
    let event = fixtures::event(org.id)
        .max_capacity(1)
        .insert(store.as_ref())
        .await
        .unwrap();
    let alice = fixtures::user()
        .external_id("sc-alice")
        .email("sa@example.com")
        .insert(store.as_ref())
        .await
        .unwrap();
    let bob = fixtures::user()
        .external_id("sc-bob")
        .email("sb@example.com")
        .insert(store.as_ref())
        .await
        .unwrap();

    let registration = registration_engine(&store);
    registration.register_for_event(&alice, event.id).await.unwrap();
    let err = registration.register_for_event(&bob, event.id).await.unwrap_err();
    assert_conflict(&err, ConflictReason::CapacityExceeded);

    let scan_at = fixtures::base_time() + Duration::days(30);
    let attendance = attendance_engine(&store, FixedClock::new(scan_at));
    let first = attendance
        .check_in(&org, event.id, &UserIdentifier::Id(alice.id))
        .await
        .unwrap();
    assert!(!first.already_checked_in);

    let second = attendance
        .check_in(&org, event.id, &UserIdentifier::Id(alice.id))
        .await
        .unwrap();
    assert!(second.already_checked_in);
    assert_eq!(second.checked_in_at, first.checked_in_at);
}
