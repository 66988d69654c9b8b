// SPDX-License-Identifier: MIT

//! Payment request and payment record models.

use serde::{Deserialize, Serialize};

/// Reason recorded when an admin rejects without giving one.
pub const DEFAULT_REJECTION_REASON: &str = "No reason provided";

/// Lifecycle of a payment request.
///
/// `Pending -> Approved` is terminal; `Pending -> Rejected` may be
/// superseded by a fresh pending request for the same event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// A user's request to pay for an event, awaiting admin action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// Document ID, injected by the Firestore client on reads and never
    /// stored in the document body
    #[serde(alias = "_firestore_id", default, skip_serializing)]
    pub id: String,
    pub user_id: String,
    pub user_email: String,
    pub event_id: String,
    pub event_title: String,
    pub event_price: i64,
    pub status: RequestStatus,
    pub created_at: String,
    pub rejection_reason: Option<String>,
    pub approved_at: Option<String>,
    /// Uid of the approving admin
    pub approved_by: Option<String>,
    pub rejected_at: Option<String>,
    pub rejected_by: Option<String>,
}

impl PaymentRequest {
    pub fn new(
        user_id: &str,
        user_email: &str,
        event_id: &str,
        event_title: &str,
        event_price: i64,
        created_at: String,
    ) -> Self {
        Self {
            id: String::new(),
            user_id: user_id.to_string(),
            user_email: user_email.to_string(),
            event_id: event_id.to_string(),
            event_title: event_title.to_string(),
            event_price,
            status: RequestStatus::Pending,
            created_at,
            rejection_reason: None,
            approved_at: None,
            approved_by: None,
            rejected_at: None,
            rejected_by: None,
        }
    }
}

/// Approved-payment record, stored at `payments/{uid}/events/{event_id}`.
///
/// This is the authoritative "may this user register" flag for an event;
/// it is only ever written by payment-request approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub uid: String,
    pub event_id: String,
    pub paid: bool,
    pub paid_at: String,
    pub reference: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(RequestStatus::Pending).unwrap(),
            serde_json::json!("pending")
        );
        assert_eq!(
            serde_json::to_value(RequestStatus::Approved).unwrap(),
            serde_json::json!("approved")
        );
        assert_eq!(
            serde_json::to_value(RequestStatus::Rejected).unwrap(),
            serde_json::json!("rejected")
        );
    }

    #[test]
    fn test_new_request_starts_pending() {
        let req = PaymentRequest::new(
            "u1",
            "u1@example.com",
            "e1",
            "Cup",
            1000,
            "2026-08-01T00:00:00Z".to_string(),
        );
        assert_eq!(req.status, RequestStatus::Pending);
        assert!(req.approved_at.is_none());
        assert!(req.rejection_reason.is_none());
    }
}
