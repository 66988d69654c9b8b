// SPDX-License-Identifier: MIT

//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const EVENTS: &str = "events";
    pub const REGISTRATIONS: &str = "registrations";
    pub const PAYMENT_REQUESTS: &str = "payment_requests";
    /// Parent collection of the per-user payment subcollections
    /// (`payments/{uid}/events/{event_id}`)
    pub const PAYMENTS: &str = "payments";
    /// Subcollection holding one payment record per event
    pub const PAYMENT_EVENTS: &str = "events";
    /// Slot occupancy aggregates (keyed by event ID)
    pub const SLOT_COUNTS: &str = "slot_counts";
}
