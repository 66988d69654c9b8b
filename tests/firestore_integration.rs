// SPDX-License-Identifier: MIT

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (FIRESTORE_EMULATOR_HOST set). Each test uses unique document IDs so
//! tests stay isolated within a shared emulator instance.

use tourney_hub::db::firestore::{ApproveOutcome, RegisterOutcome};
use tourney_hub::models::{
    Event, PaymentRequest, Registration, RequestStatus, Role, User, SLOT_CAPACITY,
};

mod common;
use common::test_db;

const NOW: &str = "2026-08-01T00:00:00Z";

/// Generate a unique ID suffix for test isolation.
fn unique_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

fn test_user(uid: &str, email: &str) -> User {
    User {
        uid: uid.to_string(),
        email: email.to_string(),
        password_hash: "$argon2id$fake$hash".to_string(),
        username: None,
        role: Role::User,
        created_at: NOW.to_string(),
    }
}

fn test_event(id: &str, slots: u32) -> Event {
    Event {
        id: id.to_string(),
        title: "Summer Cup".to_string(),
        description: "Squad tournament".to_string(),
        date: "2026-09-01".to_string(),
        price: 1500,
        slots,
        created_at: NOW.to_string(),
    }
}

/// Create and approve a payment request so the user passes the payment
/// gate for the event.
async fn grant_payment(db: &tourney_hub::db::FirestoreDb, uid: &str, event: &Event) {
    let mut request = PaymentRequest::new(
        uid,
        &format!("{}@example.com", uid),
        &event.id,
        &event.title,
        event.price,
        NOW.to_string(),
    );
    request.id = unique_id("req");
    db.set_payment_request(&request).await.unwrap();

    let outcome = db.approve_payment_atomic(&request, "admin-1").await.unwrap();
    assert_eq!(outcome, ApproveOutcome::Approved);
}

// ═══════════════════════════════════════════════════════════════════════════
// USER TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_user_creation_and_email_lookup() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_id("user");
    let email = format!("{}@example.com", uid);

    let before = db.get_user(&uid).await.unwrap();
    assert!(before.is_none(), "User should not exist before creation");

    db.upsert_user(&test_user(&uid, &email)).await.unwrap();

    let fetched = db.get_user(&uid).await.unwrap().unwrap();
    assert_eq!(fetched.uid, uid);
    assert_eq!(fetched.email, email);
    assert_eq!(fetched.role, Role::User);

    let by_email = db.find_user_by_email(&email).await.unwrap().unwrap();
    assert_eq!(by_email.uid, uid);

    let missing = db.find_user_by_email("nobody@example.com").await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_role_promotion_is_visible_on_next_read() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_id("user");
    let email = format!("{}@example.com", uid);

    let mut user = test_user(&uid, &email);
    db.upsert_user(&user).await.unwrap();
    assert!(!db.get_user(&uid).await.unwrap().unwrap().is_admin());

    user.role = Role::Admin;
    db.upsert_user(&user).await.unwrap();
    assert!(db.get_user(&uid).await.unwrap().unwrap().is_admin());
}

// ═══════════════════════════════════════════════════════════════════════════
// PAYMENT APPROVAL TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_approval_writes_payment_record() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_id("user");
    let event = test_event(&unique_id("event"), 2);
    db.set_event(&event).await.unwrap();

    // No record before approval
    let before = db.get_payment(&uid, &event.id).await.unwrap();
    assert!(before.is_none());

    grant_payment(&db, &uid, &event).await;

    let payment = db.get_payment(&uid, &event.id).await.unwrap().unwrap();
    assert!(payment.paid);
    assert_eq!(payment.uid, uid);
    assert_eq!(payment.event_id, event.id);
}

#[tokio::test]
async fn test_approval_is_idempotent() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_id("user");
    let event = test_event(&unique_id("event"), 2);
    db.set_event(&event).await.unwrap();

    let mut request = PaymentRequest::new(
        &uid,
        "p1@example.com",
        &event.id,
        &event.title,
        event.price,
        NOW.to_string(),
    );
    request.id = unique_id("req");
    db.set_payment_request(&request).await.unwrap();

    let first = db.approve_payment_atomic(&request, "admin-1").await.unwrap();
    assert_eq!(first, ApproveOutcome::Approved);

    // A second approval must not rewrite the payment record
    let second = db.approve_payment_atomic(&request, "admin-2").await.unwrap();
    assert_eq!(second, ApproveOutcome::AlreadyApproved);

    let stored = db.get_payment_request(&request.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RequestStatus::Approved);
    assert_eq!(stored.approved_by.as_deref(), Some("admin-1"));
}

#[tokio::test]
async fn test_rejected_request_cannot_be_approved() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_id("user");
    let event = test_event(&unique_id("event"), 2);

    let mut request = PaymentRequest::new(
        &uid,
        "p1@example.com",
        &event.id,
        &event.title,
        event.price,
        NOW.to_string(),
    );
    request.id = unique_id("req");
    request.status = RequestStatus::Rejected;
    request.rejected_at = Some(NOW.to_string());
    request.rejected_by = Some("admin-1".to_string());
    db.set_payment_request(&request).await.unwrap();

    let outcome = db.approve_payment_atomic(&request, "admin-1").await.unwrap();
    assert_eq!(outcome, ApproveOutcome::Rejected);

    // No payment record may exist for a rejected request
    let payment = db.get_payment(&uid, &event.id).await.unwrap();
    assert!(payment.is_none());
}

#[tokio::test]
async fn test_pending_request_query() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_id("user");
    let event = test_event(&unique_id("event"), 2);

    assert!(!db.has_pending_request(&uid, &event.id).await.unwrap());

    let mut request = PaymentRequest::new(
        &uid,
        "p1@example.com",
        &event.id,
        &event.title,
        event.price,
        NOW.to_string(),
    );
    request.id = unique_id("req");
    db.set_payment_request(&request).await.unwrap();

    assert!(db.has_pending_request(&uid, &event.id).await.unwrap());

    // A resolved request no longer counts as pending
    db.approve_payment_atomic(&request, "admin-1").await.unwrap();
    assert!(!db.has_pending_request(&uid, &event.id).await.unwrap());
}

// ═══════════════════════════════════════════════════════════════════════════
// REGISTRATION TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_registration_requires_approved_payment() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_id("user");
    let event = test_event(&unique_id("event"), 2);
    db.set_event(&event).await.unwrap();

    let outcome = db
        .register_atomic(&event, &uid, "p1@example.com", 1)
        .await
        .unwrap();
    assert_eq!(outcome, RegisterOutcome::PaymentRequired);
}

#[tokio::test]
async fn test_duplicate_registration_rejected() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_id("user");
    let event = test_event(&unique_id("event"), 2);
    db.set_event(&event).await.unwrap();
    grant_payment(&db, &uid, &event).await;

    let first = db
        .register_atomic(&event, &uid, "p1@example.com", 1)
        .await
        .unwrap();
    assert!(matches!(first, RegisterOutcome::Registered(_)));

    // Even into a different slot
    let second = db
        .register_atomic(&event, &uid, "p1@example.com", 2)
        .await
        .unwrap();
    assert_eq!(second, RegisterOutcome::AlreadyRegistered);
}

#[tokio::test]
async fn test_invalid_slot_number() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_id("user");
    let event = test_event(&unique_id("event"), 2);
    db.set_event(&event).await.unwrap();
    grant_payment(&db, &uid, &event).await;

    let zero = db
        .register_atomic(&event, &uid, "p1@example.com", 0)
        .await
        .unwrap();
    assert_eq!(zero, RegisterOutcome::InvalidSlot);

    let beyond = db
        .register_atomic(&event, &uid, "p1@example.com", 3)
        .await
        .unwrap();
    assert_eq!(beyond, RegisterOutcome::InvalidSlot);
}

#[tokio::test]
async fn test_full_slot_excluded_from_availability() {
    require_emulator!();

    let db = test_db().await;
    let event = test_event(&unique_id("event"), 2);
    db.set_event(&event).await.unwrap();

    // Four paid users fill slot 1
    for i in 0..SLOT_CAPACITY {
        let uid = unique_id(&format!("user{}", i));
        grant_payment(&db, &uid, &event).await;

        let outcome = db
            .register_atomic(&event, &uid, &format!("{}@example.com", uid), 1)
            .await
            .unwrap();
        assert!(
            matches!(outcome, RegisterOutcome::Registered(_)),
            "player {} should fit in slot 1",
            i
        );
    }

    // The fifth paid user is turned away from slot 1 and pointed at slot 2
    let latecomer = unique_id("late");
    grant_payment(&db, &latecomer, &event).await;

    let outcome = db
        .register_atomic(&event, &latecomer, "late@example.com", 1)
        .await
        .unwrap();
    assert_eq!(outcome, RegisterOutcome::SlotFull(vec![2]));

    let counts = db.get_slot_counts(&event.id).await.unwrap().unwrap();
    assert_eq!(counts.occupancy(1), SLOT_CAPACITY);
    assert_eq!(counts.total, SLOT_CAPACITY);
    assert_eq!(counts.available_slots(event.slots), vec![2]);
}

#[tokio::test]
async fn test_deleting_registration_frees_slot() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_id("user");
    let event = test_event(&unique_id("event"), 1);
    db.set_event(&event).await.unwrap();
    grant_payment(&db, &uid, &event).await;

    let outcome = db
        .register_atomic(&event, &uid, "p1@example.com", 1)
        .await
        .unwrap();
    let registration = match outcome {
        RegisterOutcome::Registered(r) => r,
        other => panic!("expected registration, got {:?}", other),
    };

    db.delete_registration_atomic(&registration).await.unwrap();

    let gone = db
        .get_registration(&Registration::doc_id(&uid, &event.id))
        .await
        .unwrap();
    assert!(gone.is_none());

    let counts = db.get_slot_counts(&event.id).await.unwrap().unwrap();
    assert_eq!(counts.occupancy(1), 0);
    assert_eq!(counts.total, 0);
}

#[tokio::test]
async fn test_position_update_round_trip() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_id("user");
    let event = test_event(&unique_id("event"), 1);
    db.set_event(&event).await.unwrap();
    grant_payment(&db, &uid, &event).await;

    let outcome = db
        .register_atomic(&event, &uid, "p1@example.com", 1)
        .await
        .unwrap();
    let mut registration = match outcome {
        RegisterOutcome::Registered(r) => r,
        other => panic!("expected registration, got {:?}", other),
    };

    registration.position = Some(2);
    registration.updated_at = Some(NOW.to_string());
    db.set_registration(&registration).await.unwrap();

    let stored = db.get_registration(&registration.id).await.unwrap().unwrap();
    assert_eq!(stored.position, Some(2));
}

// ═══════════════════════════════════════════════════════════════════════════
// EVENT TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_event_delete_cascades_but_keeps_payments() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_id("user");
    let event = test_event(&unique_id("event"), 1);
    db.set_event(&event).await.unwrap();
    grant_payment(&db, &uid, &event).await;

    let outcome = db
        .register_atomic(&event, &uid, "p1@example.com", 1)
        .await
        .unwrap();
    assert!(matches!(outcome, RegisterOutcome::Registered(_)));

    // registration + request + event document
    let deleted = db.delete_event(&event.id).await.unwrap();
    assert_eq!(deleted, 3);

    assert!(db.get_event(&event.id).await.unwrap().is_none());
    assert!(db
        .get_registrations_for_event(&event.id)
        .await
        .unwrap()
        .is_empty());
    assert!(db
        .get_requests_for_event(&event.id)
        .await
        .unwrap()
        .is_empty());
    assert!(db.get_slot_counts(&event.id).await.unwrap().is_none());

    // The payment record survives as a receipt
    let payment = db.get_payment(&uid, &event.id).await.unwrap();
    assert!(payment.is_some());
}

#[tokio::test]
async fn test_registrations_for_event_sorted_by_slot() {
    require_emulator!();

    let db = test_db().await;
    let event = test_event(&unique_id("event"), 3);
    db.set_event(&event).await.unwrap();

    // Seed directly, bypassing the payment gate
    let seeded: Vec<Registration> = [3u32, 1, 2]
        .iter()
        .map(|&slot| {
            let uid = unique_id("user");
            Registration::new(
                &uid,
                &format!("{}@example.com", uid),
                &event.id,
                slot,
                NOW.to_string(),
            )
        })
        .collect();
    db.batch_set_registrations(&seeded).await.unwrap();

    let regs = db.get_registrations_for_event(&event.id).await.unwrap();
    let slots: Vec<u32> = regs.iter().map(|r| r.slot).collect();
    assert_eq!(slots, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_concurrent_registrations_never_overfill_slot() {
    require_emulator!();

    let db = test_db().await;
    let event = test_event(&unique_id("event"), 1);
    db.set_event(&event).await.unwrap();

    let mut uids = Vec::new();
    for _ in 0..6 {
        let uid = unique_id("racer");
        grant_payment(&db, &uid, &event).await;
        uids.push(uid);
    }

    // Fire all six attempts at slot 1 concurrently. Only four places
    // exist; the transactional occupancy read must keep racing commits
    // from both claiming the last one.
    let attempts = uids.into_iter().map(|uid| {
        let db = db.clone();
        let event = event.clone();
        tokio::spawn(async move {
            db.register_atomic(&event, &uid, &format!("{}@example.com", uid), 1)
                .await
        })
    });
    let results = futures_util::future::join_all(attempts).await;

    let successes = results
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(RegisterOutcome::Registered(_)))))
        .count();

    // Losers see SlotFull or a commit conflict; winners never exceed
    // capacity and the aggregate agrees with the stored registrations
    let regs = db.get_registrations_for_event(&event.id).await.unwrap();
    assert_eq!(regs.len(), successes);
    assert!(
        regs.len() <= SLOT_CAPACITY as usize,
        "slot 1 overfilled: {} registrations",
        regs.len()
    );

    let counts = db.get_slot_counts(&event.id).await.unwrap().unwrap();
    assert_eq!(counts.occupancy(1) as usize, regs.len());
    assert_eq!(counts.total as usize, regs.len());
}
