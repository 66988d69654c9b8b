// SPDX-License-Identifier: MIT

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (accounts and roles)
//! - Events (tournament catalog)
//! - Payment requests and payment records
//! - Registrations and slot occupancy aggregates
//!
//! Multi-document workflows (payment approval, slot registration) run
//! inside Firestore transactions so the documents cannot disagree.

use crate::db::collections;
use crate::error::AppError;
use crate::models::{
    Event, Payment, PaymentRequest, Registration, RequestStatus, SlotCounts, User,
};
use crate::time_utils::now_rfc3339;
use futures_util::{stream, StreamExt};

const MAX_CONCURRENT_DB_OPS: usize = 50;
// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Outcome of a registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// Registration written; carries the new record
    Registered(Registration),
    /// User already holds a registration for this event
    AlreadyRegistered,
    /// No approved payment for this (user, event)
    PaymentRequired,
    /// Slot number outside `[1, event.slots]`
    InvalidSlot,
    /// Slot valid but full; carries the slots that still have room
    SlotFull(Vec<u32>),
}

/// Outcome of a payment-request approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApproveOutcome {
    Approved,
    /// Request was already approved; no second payment record is written
    AlreadyApproved,
    /// Request is rejected and cannot be approved
    Rejected,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // Use ExternalJwtFunctionSource to provide a dummy token without needing
        // a custom TokenSource implementation struct.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Client whose reads are attached to the given transaction.
    ///
    /// A plain fluent select issues a standalone read RPC; only reads
    /// carrying the transaction's consistency selector join its read set,
    /// which is what makes the commit conflict-checked.
    fn transactional_reader(
        &self,
        transaction: &firestore::FirestoreTransaction<'_>,
    ) -> Result<firestore::FirestoreDb, AppError> {
        Ok(self.get_client()?.clone_with_consistency_selector(
            firestore::FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            ),
        ))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by uid (the document ID).
    pub async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by email. Used only at login; everywhere else users
    /// are addressed by uid.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_string();
        let mut matches: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.field("email").eq(email.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(matches.pop())
    }

    /// Create or update a user, keyed by uid.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.uid)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// List all users (admin view).
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Event Operations ────────────────────────────────────────

    /// Get an event by ID.
    pub async fn get_event(&self, event_id: &str) -> Result<Option<Event>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::EVENTS)
            .obj()
            .one(event_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List all events.
    pub async fn list_events(&self) -> Result<Vec<Event>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::EVENTS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or overwrite an event, keyed by ID.
    pub async fn set_event(&self, event: &Event) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::EVENTS)
            .document_id(&event.id)
            .object(event)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete an event and cascade to its registrations, payment requests
    /// and slot-count aggregate. Payment records are kept as receipts.
    pub async fn delete_event(&self, event_id: &str) -> Result<usize, AppError> {
        let mut deleted_count = 0;

        // 1. Delete all registrations for the event
        let registrations = self.get_registrations_for_event(event_id).await?;
        let count = registrations.len();
        self.batch_delete(&registrations, collections::REGISTRATIONS, |r: &Registration| {
            r.id.clone()
        })
        .await?;
        deleted_count += count;
        tracing::debug!(event_id, count, "Deleted registrations");

        // 2. Delete all payment requests for the event
        let requests = self.get_requests_for_event(event_id).await?;
        let count = requests.len();
        self.batch_delete(&requests, collections::PAYMENT_REQUESTS, |r: &PaymentRequest| {
            r.id.clone()
        })
        .await?;
        deleted_count += count;
        tracing::debug!(event_id, count, "Deleted payment requests");

        // 3. Delete the slot-count aggregate
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::SLOT_COUNTS)
            .document_id(event_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // 4. Delete the event document itself
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::EVENTS)
            .document_id(event_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        deleted_count += 1;

        tracing::info!(event_id, deleted_count, "Event deletion complete");

        Ok(deleted_count)
    }

    // ─── Slot Count Operations ───────────────────────────────────

    /// Get the slot occupancy aggregate for an event.
    pub async fn get_slot_counts(&self, event_id: &str) -> Result<Option<SlotCounts>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::SLOT_COUNTS)
            .obj()
            .one(event_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List all slot occupancy aggregates (one query for the whole catalog).
    pub async fn list_slot_counts(&self) -> Result<Vec<SlotCounts>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::SLOT_COUNTS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Registration Operations ─────────────────────────────────

    /// Get a registration by document ID.
    pub async fn get_registration(&self, reg_id: &str) -> Result<Option<Registration>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::REGISTRATIONS)
            .obj()
            .one(reg_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get all registrations for an event.
    pub async fn get_registrations_for_event(
        &self,
        event_id: &str,
    ) -> Result<Vec<Registration>, AppError> {
        let event_id = event_id.to_string();
        let mut regs: Vec<Registration> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::REGISTRATIONS)
            .filter(move |q| q.field("event_id").eq(event_id.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        regs.sort_by_key(|r| r.slot);
        Ok(regs)
    }

    /// Get all registrations for a user.
    pub async fn get_registrations_for_user(
        &self,
        uid: &str,
    ) -> Result<Vec<Registration>, AppError> {
        let uid = uid.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::REGISTRATIONS)
            .filter(move |q| q.field("user_id").eq(uid.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List all registrations (admin view).
    pub async fn list_registrations(&self) -> Result<Vec<Registration>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::REGISTRATIONS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Atomically register a user into a team slot.
    ///
    /// All preconditions are re-checked inside a Firestore transaction with
    /// the occupancy aggregate as the conflict anchor: two users racing for
    /// the last place in a slot cannot both commit, and the deterministic
    /// registration document ID rules out duplicate (user, event) entries.
    pub async fn register_atomic(
        &self,
        event: &Event,
        uid: &str,
        user_email: &str,
        slot: u32,
    ) -> Result<RegisterOutcome, AppError> {
        let reg_id = Registration::doc_id(uid, &event.id);
        let now = now_rfc3339();

        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;
        let reader = self.transactional_reader(&transaction)?;

        // 1. Duplicate check against the data layer, not a client cache
        let existing: Option<Registration> = reader
            .fluent()
            .select()
            .by_id_in(collections::REGISTRATIONS)
            .obj()
            .one(&reg_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if existing.is_some() {
            let _ = transaction.rollback().await;
            return Ok(RegisterOutcome::AlreadyRegistered);
        }

        // 2. Payment gate: the payments/{uid}/events/{event_id} record is
        //    the authoritative "may register" flag
        let parent_path = reader
            .parent_path(collections::PAYMENTS, uid)
            .map_err(|e| AppError::Database(e.to_string()))?;
        let payment: Option<Payment> = reader
            .fluent()
            .select()
            .by_id_in(collections::PAYMENT_EVENTS)
            .parent(&parent_path)
            .obj()
            .one(&event.id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        if !payment.map(|p| p.paid).unwrap_or(false) {
            let _ = transaction.rollback().await;
            return Ok(RegisterOutcome::PaymentRequired);
        }

        // 3. Capacity check against the occupancy aggregate, read within
        //    the transaction for conflict detection
        let counts: Option<SlotCounts> = reader
            .fluent()
            .select()
            .by_id_in(collections::SLOT_COUNTS)
            .obj()
            .one(&event.id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut counts = counts.unwrap_or_else(|| SlotCounts::new(&event.id));

        if slot < 1 || slot > event.slots {
            let _ = transaction.rollback().await;
            return Ok(RegisterOutcome::InvalidSlot);
        }
        if !counts.has_room(slot, event.slots) {
            let available = counts.available_slots(event.slots);
            let _ = transaction.rollback().await;
            return Ok(RegisterOutcome::SlotFull(available));
        }

        // 4. Write the registration and the incremented aggregate together
        let registration = Registration::new(uid, user_email, &event.id, slot, now.clone());
        counts.record(slot, &now);

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::REGISTRATIONS)
            .document_id(&reg_id)
            .object(&registration)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add registration to transaction: {}", e))
            })?;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::SLOT_COUNTS)
            .document_id(&event.id)
            .object(&counts)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add slot counts to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            uid,
            event_id = %event.id,
            slot,
            "Registration committed"
        );

        Ok(RegisterOutcome::Registered(registration))
    }

    /// Delete a registration and decrement its slot in the occupancy
    /// aggregate, atomically.
    pub async fn delete_registration_atomic(
        &self,
        registration: &Registration,
    ) -> Result<(), AppError> {
        let now = now_rfc3339();

        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;
        let reader = self.transactional_reader(&transaction)?;

        let counts: Option<SlotCounts> = reader
            .fluent()
            .select()
            .by_id_in(collections::SLOT_COUNTS)
            .obj()
            .one(&registration.event_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut counts = counts.unwrap_or_else(|| SlotCounts::new(&registration.event_id));
        counts.remove(registration.slot, &now);

        self.get_client()?
            .fluent()
            .delete()
            .from(collections::REGISTRATIONS)
            .document_id(&registration.id)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add deletion to transaction: {}", e))
            })?;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::SLOT_COUNTS)
            .document_id(&registration.event_id)
            .object(&counts)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add slot counts to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok(())
    }

    /// Overwrite a registration document (position updates).
    pub async fn set_registration(&self, registration: &Registration) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::REGISTRATIONS)
            .document_id(&registration.id)
            .object(registration)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Payment Operations ──────────────────────────────────────

    /// Get the payment record at `payments/{uid}/events/{event_id}`.
    pub async fn get_payment(&self, uid: &str, event_id: &str) -> Result<Option<Payment>, AppError> {
        let parent_path = self
            .get_client()?
            .parent_path(collections::PAYMENTS, uid)
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PAYMENT_EVENTS)
            .parent(&parent_path)
            .obj()
            .one(event_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Payment Request Operations ──────────────────────────────

    /// Get a payment request by ID.
    pub async fn get_payment_request(
        &self,
        request_id: &str,
    ) -> Result<Option<PaymentRequest>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PAYMENT_REQUESTS)
            .obj()
            .one(request_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List all payment requests (admin view).
    pub async fn list_payment_requests(&self) -> Result<Vec<PaymentRequest>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PAYMENT_REQUESTS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get all payment requests created by a user.
    pub async fn get_requests_for_user(&self, uid: &str) -> Result<Vec<PaymentRequest>, AppError> {
        let uid = uid.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PAYMENT_REQUESTS)
            .filter(move |q| q.field("user_id").eq(uid.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get all payment requests referencing an event.
    pub async fn get_requests_for_event(
        &self,
        event_id: &str,
    ) -> Result<Vec<PaymentRequest>, AppError> {
        let event_id = event_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PAYMENT_REQUESTS)
            .filter(move |q| q.field("event_id").eq(event_id.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Whether the user already has a pending request for the event.
    pub async fn has_pending_request(&self, uid: &str, event_id: &str) -> Result<bool, AppError> {
        let uid = uid.to_string();
        let event_id = event_id.to_string();
        let matches: Vec<PaymentRequest> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::PAYMENT_REQUESTS)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(uid.clone()),
                    q.field("event_id").eq(event_id.clone()),
                    q.field("status").eq("pending"),
                ])
            })
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(!matches.is_empty())
    }

    /// Create or overwrite a payment request, keyed by ID.
    pub async fn set_payment_request(&self, request: &PaymentRequest) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PAYMENT_REQUESTS)
            .document_id(&request.id)
            .object(request)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a payment request regardless of status. An already-written
    /// payment record is deliberately left untouched.
    pub async fn delete_payment_request(&self, request_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::PAYMENT_REQUESTS)
            .document_id(request_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Atomically approve a payment request: write the payment record and
    /// the request status in one transaction.
    ///
    /// Re-approving an already-approved request rolls back without writing
    /// a second payment record (idempotent).
    pub async fn approve_payment_atomic(
        &self,
        request: &PaymentRequest,
        admin_uid: &str,
    ) -> Result<ApproveOutcome, AppError> {
        let now = now_rfc3339();

        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        // Re-read the request within the transaction; a racing admin action
        // may have already resolved it
        let reader = self.transactional_reader(&transaction)?;
        let current: Option<PaymentRequest> = reader
            .fluent()
            .select()
            .by_id_in(collections::PAYMENT_REQUESTS)
            .obj()
            .one(&request.id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let current = match current {
            Some(r) => r,
            None => {
                let _ = transaction.rollback().await;
                return Err(AppError::NotFound(format!(
                    "Payment request {} not found",
                    request.id
                )));
            }
        };

        match current.status {
            RequestStatus::Approved => {
                let _ = transaction.rollback().await;
                return Ok(ApproveOutcome::AlreadyApproved);
            }
            RequestStatus::Rejected => {
                let _ = transaction.rollback().await;
                return Ok(ApproveOutcome::Rejected);
            }
            RequestStatus::Pending => {}
        }

        let payment = Payment {
            uid: current.user_id.clone(),
            event_id: current.event_id.clone(),
            paid: true,
            paid_at: now.clone(),
            reference: "admin-approved".to_string(),
        };

        let approved = PaymentRequest {
            status: RequestStatus::Approved,
            approved_at: Some(now),
            approved_by: Some(admin_uid.to_string()),
            ..current
        };

        let parent_path = self
            .get_client()?
            .parent_path(collections::PAYMENTS, &approved.user_id)
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::PAYMENT_EVENTS)
            .document_id(&approved.event_id)
            .parent(&parent_path)
            .object(&payment)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add payment to transaction: {}", e))
            })?;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::PAYMENT_REQUESTS)
            .document_id(&approved.id)
            .object(&approved)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add request update to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            request_id = %approved.id,
            user_id = %approved.user_id,
            event_id = %approved.event_id,
            admin_uid,
            "Payment request approved"
        );

        Ok(ApproveOutcome::Approved)
    }

    // ─── Helper Methods ────────────────────────────────────────────

    /// Helper to batch delete documents using transactions.
    async fn batch_delete<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        F: Fn(&T) -> String,
    {
        let client = self.get_client()?;

        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for item in chunk {
                let doc_id = id_extractor(item);
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(&doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }

    /// Store multiple documents concurrently with a limit to avoid
    /// overloading Firestore. Used by test fixtures and backfills.
    pub async fn batch_set_registrations(
        &self,
        records: &[Registration],
    ) -> Result<(), AppError> {
        let client = self.get_client()?;

        stream::iter(records.to_vec())
            .map(|record| async move {
                let _: () = client
                    .fluent()
                    .update()
                    .in_col(collections::REGISTRATIONS)
                    .document_id(&record.id)
                    .object(&record)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;

                Ok::<_, AppError>(())
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<(), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>, AppError>>()?;

        Ok(())
    }
}
