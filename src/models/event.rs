// SPDX-License-Identifier: MIT

//! Tournament event model.

use serde::{Deserialize, Serialize};

/// Price applied when an event is created without a usable price.
pub const DEFAULT_EVENT_PRICE: i64 = 1000;

/// Tournament event stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Document ID, injected by the Firestore client on reads and never
    /// stored in the document body
    #[serde(alias = "_firestore_id", default, skip_serializing)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Event date (YYYY-MM-DD, as entered by the admin)
    pub date: String,
    /// Entry price in naira
    #[serde(default = "default_price")]
    pub price: i64,
    /// Number of team slots; each slot holds up to 4 players
    pub slots: u32,
    /// When the event was created (RFC3339)
    pub created_at: String,
}

fn default_price() -> i64 {
    DEFAULT_EVENT_PRICE
}

impl Event {
    /// Total player capacity across all team slots.
    pub fn capacity(&self) -> u32 {
        self.slots * crate::models::SLOT_CAPACITY
    }
}
