// SPDX-License-Identifier: MIT

//! Email/password authentication routes.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::create_jwt;
use crate::models::{Role, User};
use crate::routes::api::UserResponse;
use crate::services::password;
use crate::time_utils::now_rfc3339;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

#[derive(Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email)]
    email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    password: String,
    #[validate(length(min = 1, max = 32))]
    username: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    email: String,
    password: String,
}

/// Session response: a bearer token plus the profile it belongs to.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Create an account and its user document in one step.
///
/// The minted uid is the user document's ID; every later lookup goes
/// through it rather than the email.
async fn signup(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SignupRequest>,
) -> Result<Json<SessionResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let email = payload.email.trim().to_lowercase();

    if state.db.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict(
            "An account with this email already exists".to_string(),
        ));
    }

    let password_hash = password::hash_password(payload.password).await?;

    let user = User {
        uid: uuid::Uuid::new_v4().to_string(),
        email,
        password_hash,
        username: payload.username,
        role: Role::User,
        created_at: now_rfc3339(),
    };

    state.db.upsert_user(&user).await?;

    tracing::info!(uid = %user.uid, "Account created");

    let token = create_jwt(&user.uid, &user.email, &state.config.jwt_signing_key)?;

    Ok(Json(SessionResponse {
        token,
        user: user.into(),
    }))
}

/// Verify credentials and issue a session token.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<SessionResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let email = payload.email.trim().to_lowercase();
    let user = state.db.find_user_by_email(&email).await?;

    // Verification runs even for unknown emails (against a dummy hash) so
    // response timing does not reveal which accounts exist
    let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
    let verified = password::verify_password(stored_hash, payload.password).await?;

    let user = match (verified, user) {
        (true, Some(user)) => user,
        _ => return Err(AppError::InvalidCredentials),
    };

    tracing::info!(uid = %user.uid, "Login successful");

    let token = create_jwt(&user.uid, &user.email, &state.config.jwt_signing_key)?;

    Ok(Json(SessionResponse {
        token,
        user: user.into(),
    }))
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// Logout is client side: the token is simply discarded.
async fn logout() -> Json<LogoutResponse> {
    Json(LogoutResponse { success: true })
}
