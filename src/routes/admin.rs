// SPDX-License-Identifier: MIT

//! Admin routes: event management, payment approvals, registrations,
//! results and user administration.
//!
//! All routes here sit behind the admin-gate middleware; authorization is
//! enforced server side, never by hiding buttons in a client.

use crate::db::firestore::ApproveOutcome;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::event::DEFAULT_EVENT_PRICE;
use crate::models::payment::DEFAULT_REJECTION_REASON;
use crate::models::{Event, PaymentRequest, Registration, RequestStatus, Role};
use crate::routes::api::UserResponse;
use crate::services::export;
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Admin routes (require authentication and the admin role).
/// Both middleware layers are applied in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/events", post(create_event))
        .route("/admin/events/{id}", put(update_event).delete(delete_event))
        .route("/admin/events/{id}/export", get(export_registrations))
        .route("/admin/registrations", get(list_registrations))
        .route("/admin/registrations/{id}", delete(delete_registration))
        .route("/admin/registrations/{id}/position", put(update_position))
        .route("/admin/payment-requests", get(list_payment_requests))
        .route("/admin/payment-requests/{id}", delete(delete_payment_request))
        .route("/admin/payment-requests/{id}/approve", post(approve_payment))
        .route("/admin/payment-requests/{id}/reject", post(reject_payment))
        .route("/admin/users", get(list_users))
        .route("/admin/users/{id}/role", put(update_role))
}

// ─── Event Management ────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    title: String,
    #[serde(default)]
    description: String,
    #[validate(length(min = 1, message = "Date is required"))]
    date: String,
    price: Option<i64>,
    #[validate(range(min = 1, max = 1000, message = "Slots must be between 1 and 1000"))]
    slots: u32,
}

/// Create a tournament event.
async fn create_event(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateEventRequest>,
) -> Result<Json<Event>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    // Zero and negative prices fall back just like a missing one
    let price = match payload.price {
        Some(p) if p > 0 => p,
        _ => DEFAULT_EVENT_PRICE,
    };

    let event = Event {
        id: uuid::Uuid::new_v4().to_string(),
        title: payload.title,
        description: payload.description,
        date: payload.date,
        price,
        slots: payload.slots,
        created_at: now_rfc3339(),
    };

    state.db.set_event(&event).await?;

    tracing::info!(event_id = %event.id, title = %event.title, "Event created");

    Ok(Json(event))
}

#[derive(Deserialize, Validate)]
pub struct UpdateEventRequest {
    #[validate(length(min = 1))]
    title: Option<String>,
    description: Option<String>,
    #[validate(length(min = 1))]
    date: Option<String>,
    price: Option<i64>,
    #[validate(range(min = 1, max = 1000))]
    slots: Option<u32>,
}

/// Update an event. Absent fields keep their previous values.
async fn update_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
    Json(payload): Json<UpdateEventRequest>,
) -> Result<Json<Event>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut event = state
        .db
        .get_event(&event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))?;

    if let Some(title) = payload.title {
        event.title = title;
    }
    if let Some(description) = payload.description {
        event.description = description;
    }
    if let Some(date) = payload.date {
        event.date = date;
    }
    if let Some(price) = payload.price {
        event.price = if price > 0 { price } else { DEFAULT_EVENT_PRICE };
    }
    if let Some(slots) = payload.slots {
        event.slots = slots;
    }

    state.db.set_event(&event).await?;

    Ok(Json(event))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DeleteEventResponse {
    /// Documents removed, including cascaded registrations and requests
    pub deleted: usize,
}

/// Delete an event, cascading to its registrations and payment requests.
/// Payment records survive as receipts.
async fn delete_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<Json<DeleteEventResponse>> {
    state
        .db
        .get_event(&event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))?;

    let deleted = state.db.delete_event(&event_id).await?;

    Ok(Json(DeleteEventResponse { deleted }))
}

/// Export an event's registrations as CSV.
async fn export_registrations(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse> {
    state
        .db
        .get_event(&event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))?;

    let registrations = state.db.get_registrations_for_event(&event_id).await?;
    let csv = export::registrations_to_csv(&registrations);

    let disposition = format!(
        "attachment; filename=\"event_{}_registrations.csv\"",
        event_id
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}

// ─── Registrations & Results ─────────────────────────────────

#[derive(Deserialize)]
pub struct RegistrationsQuery {
    /// Restrict to a single event
    event_id: Option<String>,
}

/// List registrations, optionally filtered by event.
async fn list_registrations(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RegistrationsQuery>,
) -> Result<Json<Vec<Registration>>> {
    let registrations = match params.event_id {
        Some(event_id) => state.db.get_registrations_for_event(&event_id).await?,
        None => state.db.list_registrations().await?,
    };

    Ok(Json(registrations))
}

/// Delete a registration and free its slot.
async fn delete_registration(
    State(state): State<Arc<AppState>>,
    Path(reg_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let registration = state
        .db
        .get_registration(&reg_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Registration {} not found", reg_id)))?;

    state.db.delete_registration_atomic(&registration).await?;

    tracing::info!(reg_id = %reg_id, "Registration deleted");

    Ok(Json(serde_json::json!({ "success": true })))
}

#[derive(Deserialize, Validate)]
pub struct UpdatePositionRequest {
    /// Final ranking, 1-based
    #[validate(range(min = 1, message = "Position must be 1 or higher"))]
    position: u32,
}

/// Set or overwrite a registration's final position.
///
/// Positions are not unique across an event's registrations; ties are
/// the admin's call.
async fn update_position(
    State(state): State<Arc<AppState>>,
    Path(reg_id): Path<String>,
    Json(payload): Json<UpdatePositionRequest>,
) -> Result<Json<Registration>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut registration = state
        .db
        .get_registration(&reg_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Registration {} not found", reg_id)))?;

    registration.position = Some(payload.position);
    registration.updated_at = Some(now_rfc3339());

    state.db.set_registration(&registration).await?;

    Ok(Json(registration))
}

// ─── Payment Requests ────────────────────────────────────────

/// List all payment requests.
async fn list_payment_requests(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PaymentRequest>>> {
    let requests = state.db.list_payment_requests().await?;
    Ok(Json(requests))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ApproveResponse {
    pub status: String,
    /// True when the request was already approved and no new payment
    /// record was written
    pub idempotent: bool,
}

/// Approve a payment request, writing the payment record and the status
/// update in one transaction.
async fn approve_payment(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(request_id): Path<String>,
) -> Result<Json<ApproveResponse>> {
    let request = state
        .db
        .get_payment_request(&request_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Payment request {} not found", request_id)))?;

    if request.user_id.is_empty() || request.event_id.is_empty() {
        return Err(AppError::BadRequest(
            "Invalid payment request data".to_string(),
        ));
    }

    match state.db.approve_payment_atomic(&request, &admin.uid).await? {
        ApproveOutcome::Approved => Ok(Json(ApproveResponse {
            status: "approved".to_string(),
            idempotent: false,
        })),
        ApproveOutcome::AlreadyApproved => Ok(Json(ApproveResponse {
            status: "approved".to_string(),
            idempotent: true,
        })),
        ApproveOutcome::Rejected => Err(AppError::Conflict(
            "Request has already been rejected".to_string(),
        )),
    }
}

#[derive(Deserialize, Default)]
pub struct RejectRequest {
    /// Optional free-text reason shown to the user
    reason: Option<String>,
}

/// Reject a pending payment request with an optional reason.
async fn reject_payment(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(request_id): Path<String>,
    payload: Option<Json<RejectRequest>>,
) -> Result<Json<PaymentRequest>> {
    let mut request = state
        .db
        .get_payment_request(&request_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Payment request {} not found", request_id)))?;

    if request.status == RequestStatus::Approved {
        return Err(AppError::Conflict(
            "Request has already been approved".to_string(),
        ));
    }

    let reason = payload
        .and_then(|Json(p)| p.reason)
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string());

    request.status = RequestStatus::Rejected;
    request.rejection_reason = Some(reason);
    request.rejected_at = Some(now_rfc3339());
    request.rejected_by = Some(admin.uid.clone());

    state.db.set_payment_request(&request).await?;

    tracing::info!(request_id = %request_id, admin_uid = %admin.uid, "Payment request rejected");

    Ok(Json(request))
}

/// Delete a payment request regardless of status. A payment record
/// already written by approval is left in place.
async fn delete_payment_request(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    state
        .db
        .get_payment_request(&request_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Payment request {} not found", request_id)))?;

    state.db.delete_payment_request(&request_id).await?;

    Ok(Json(serde_json::json!({ "success": true })))
}

// ─── User Administration ─────────────────────────────────────

#[derive(Deserialize)]
pub struct UsersQuery {
    /// Substring match on email, uid or username
    search: Option<String>,
}

/// List users, optionally filtered by a search string.
async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UsersQuery>,
) -> Result<Json<Vec<UserResponse>>> {
    let users = state.db.list_users().await?;

    let needle = params
        .search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let filtered: Vec<UserResponse> = users
        .into_iter()
        .filter(|u| match &needle {
            None => true,
            Some(q) => {
                u.email.to_lowercase().contains(q)
                    || u.uid.to_lowercase().contains(q)
                    || u.username
                        .as_deref()
                        .map(|n| n.to_lowercase().contains(q))
                        .unwrap_or(false)
            }
        })
        .map(UserResponse::from)
        .collect();

    Ok(Json(filtered))
}

#[derive(Deserialize)]
pub struct UpdateRoleRequest {
    role: Role,
}

/// Promote a user to admin. Demotion is not supported.
async fn update_role(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Json<UserResponse>> {
    if payload.role != Role::Admin {
        return Err(AppError::BadRequest(
            "Demoting an admin is not supported".to_string(),
        ));
    }

    let mut user = state
        .db
        .get_user(&uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", uid)))?;

    if !user.is_admin() {
        user.role = Role::Admin;
        state.db.upsert_user(&user).await?;
        tracing::info!(uid = %uid, "User promoted to admin");
    }

    Ok(Json(user.into()))
}
