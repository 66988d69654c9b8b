// SPDX-License-Identifier: MIT

//! API routes for authenticated users.

use crate::db::firestore::RegisterOutcome;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{PaymentRequest, Registration, Role, SlotCounts, User};
use crate::services::whatsapp;
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/me/username", put(update_username))
        .route("/api/events", get(list_events))
        .route("/api/events/{id}/slots", get(get_event_slots))
        .route("/api/events/{id}/payment-request", post(request_payment))
        .route("/api/events/{id}/register", post(register))
        .route("/api/payment-requests", get(my_payment_requests))
        .route("/api/registrations", get(my_registrations))
}

// ─── User Profile ────────────────────────────────────────────

/// Public view of a user record (never includes the password hash).
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub uid: String,
    pub email: String,
    pub username: Option<String>,
    pub role: Role,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            uid: user.uid,
            email: user.email,
            username: user.username,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Get current user profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let profile = state
        .db
        .get_user(&user.uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.uid)))?;

    Ok(Json(profile.into()))
}

#[derive(Deserialize, Validate)]
pub struct UpdateUsernameRequest {
    #[validate(length(min = 1, max = 32, message = "Username cannot be empty"))]
    username: String,
}

/// Update the caller's display name.
async fn update_username(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(mut payload): Json<UpdateUsernameRequest>,
) -> Result<Json<UserResponse>> {
    // Trim first so a whitespace-only name fails the length check
    payload.username = payload.username.trim().to_string();
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut profile = state
        .db
        .get_user(&user.uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.uid)))?;

    profile.username = Some(payload.username);
    state.db.upsert_user(&profile).await?;

    Ok(Json(profile.into()))
}

// ─── Event Catalog ───────────────────────────────────────────

/// Event with its derived registration count.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EventSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: String,
    pub price: i64,
    pub slots: u32,
    /// Total player capacity (slots * 4)
    pub capacity: u32,
    pub registered_count: u32,
}

/// List all events with registration counts.
///
/// Counts come from the slot-count aggregates, fetched with a single
/// query for the whole catalog instead of one registration query per
/// event.
async fn list_events(State(state): State<Arc<AppState>>) -> Result<Json<Vec<EventSummary>>> {
    let events = state.db.list_events().await?;
    let counts: HashMap<String, u32> = state
        .db
        .list_slot_counts()
        .await?
        .into_iter()
        .map(|c| (c.event_id.clone(), c.total))
        .collect();

    let summaries = events
        .into_iter()
        .map(|e| {
            let registered_count = counts.get(&e.id).copied().unwrap_or(0);
            EventSummary {
                capacity: e.capacity(),
                id: e.id,
                title: e.title,
                description: e.description,
                date: e.date,
                price: e.price,
                slots: e.slots,
                registered_count,
            }
        })
        .collect();

    Ok(Json(summaries))
}

/// Slot availability for one event.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SlotAvailabilityResponse {
    pub event_id: String,
    pub slots: u32,
    /// Slot numbers that still have room
    pub available: Vec<u32>,
    /// Occupancy per slot number (slots with zero players are omitted)
    pub occupancy: HashMap<String, u32>,
}

/// Get per-slot availability for an event, for the slot picker.
async fn get_event_slots(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<Json<SlotAvailabilityResponse>> {
    let event = state
        .db
        .get_event(&event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))?;

    let counts = state
        .db
        .get_slot_counts(&event_id)
        .await?
        .unwrap_or_else(|| SlotCounts::new(&event_id));

    Ok(Json(SlotAvailabilityResponse {
        event_id,
        slots: event.slots,
        available: counts.available_slots(event.slots),
        occupancy: counts.counts,
    }))
}

// ─── Payment Requests ────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PaymentRequestCreated {
    pub request: PaymentRequest,
    /// Prefilled WhatsApp chat link for the client to open
    pub whatsapp_url: String,
}

/// Request manual payment approval for an event.
///
/// One pending request per (user, event); a rejected request may be
/// retried with a fresh one.
async fn request_payment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(event_id): Path<String>,
) -> Result<Json<PaymentRequestCreated>> {
    let event = state
        .db
        .get_event(&event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))?;

    if state.db.has_pending_request(&user.uid, &event_id).await? {
        return Err(AppError::Conflict(
            "You already have a pending payment request for this event".to_string(),
        ));
    }

    let mut request = PaymentRequest::new(
        &user.uid,
        &user.email,
        &event.id,
        &event.title,
        event.price,
        now_rfc3339(),
    );
    request.id = uuid::Uuid::new_v4().to_string();

    state.db.set_payment_request(&request).await?;

    tracing::info!(
        uid = %user.uid,
        event_id = %event.id,
        request_id = %request.id,
        "Payment request created"
    );

    let whatsapp_url = whatsapp::payment_request_link(
        &state.config.admin_whatsapp,
        &user.email,
        &event.title,
        event.price,
    );

    Ok(Json(PaymentRequestCreated {
        request,
        whatsapp_url,
    }))
}

/// Get the caller's payment requests.
async fn my_payment_requests(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<PaymentRequest>>> {
    let requests = state.db.get_requests_for_user(&user.uid).await?;
    Ok(Json(requests))
}

// ─── Registration ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RegisterRequest {
    /// Chosen team slot number, 1-based
    slot: u32,
}

/// Register the caller into a team slot of a paid event.
async fn register(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(event_id): Path<String>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<Registration>> {
    let event = state
        .db
        .get_event(&event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))?;

    let outcome = state
        .db
        .register_atomic(&event, &user.uid, &user.email, payload.slot)
        .await?;

    match outcome {
        RegisterOutcome::Registered(registration) => Ok(Json(registration)),
        RegisterOutcome::AlreadyRegistered => Err(AppError::Conflict(
            "You are already registered for this tournament".to_string(),
        )),
        RegisterOutcome::PaymentRequired => Err(AppError::BadRequest(
            "Payment for this event has not been approved".to_string(),
        )),
        RegisterOutcome::InvalidSlot => Err(AppError::BadRequest(format!(
            "Slot must be between 1 and {}",
            event.slots
        ))),
        RegisterOutcome::SlotFull(available) if available.is_empty() => Err(AppError::Conflict(
            "All slots are full for this event".to_string(),
        )),
        RegisterOutcome::SlotFull(available) => Err(AppError::Conflict(format!(
            "Slot {} is full; available slots: {}",
            payload.slot,
            available
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

/// Get the caller's registrations (the "My Results" view).
async fn my_registrations(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Registration>>> {
    let registrations = state.db.get_registrations_for_user(&user.uid).await?;
    Ok(Json(registrations))
}
