// SPDX-License-Identifier: MIT

//! User model for storage and API.

use serde::{Deserialize, Serialize};

/// Account role. Admins manage events, payment approvals and results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// User profile stored in Firestore.
///
/// The auth uid doubles as the document ID, so role lookups never go
/// through an email query (login is the only email-keyed read).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Auth uid (also used as document ID)
    pub uid: String,
    /// Email address, unique per account
    pub email: String,
    /// Argon2id password hash in PHC string format
    pub password_hash: String,
    /// Optional display name
    pub username: Option<String>,
    #[serde(default)]
    pub role: Role,
    /// When the account was created (RFC3339)
    pub created_at: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
