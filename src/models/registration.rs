// SPDX-License-Identifier: MIT

//! Registration and per-event slot occupancy models.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maximum players per team slot.
pub const SLOT_CAPACITY: u32 = 4;

/// A user's registration in a numbered team slot of an event.
///
/// The document ID is `{uid}_{event_id}`, so a user can never hold two
/// registrations for the same event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// Document ID, injected by the Firestore client on reads and never
    /// stored in the document body
    #[serde(alias = "_firestore_id", default, skip_serializing)]
    pub id: String,
    pub user_id: String,
    pub user_email: String,
    pub event_id: String,
    /// Team slot number, 1-based
    pub slot: u32,
    pub team_name: String,
    /// Final ranking, assigned by an admin after the tournament
    pub position: Option<u32>,
    pub registered_at: String,
    pub updated_at: Option<String>,
}

impl Registration {
    /// Deterministic document ID for a (user, event) pair.
    pub fn doc_id(uid: &str, event_id: &str) -> String {
        format!("{}_{}", uid, event_id)
    }

    pub fn new(
        uid: &str,
        user_email: &str,
        event_id: &str,
        slot: u32,
        registered_at: String,
    ) -> Self {
        Self {
            id: Self::doc_id(uid, event_id),
            user_id: uid.to_string(),
            user_email: user_email.to_string(),
            event_id: event_id.to_string(),
            slot,
            team_name: format!("Team {}", slot),
            position: None,
            registered_at,
            updated_at: None,
        }
    }
}

/// Per-event slot occupancy aggregate, keyed by event ID.
///
/// Maintained in the same transaction as every registration write, so a
/// capacity check against this document cannot race a concurrent insert.
/// Map keys are slot numbers as strings (Firestore map keys are strings).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlotCounts {
    pub event_id: String,
    #[serde(default)]
    pub counts: HashMap<String, u32>,
    /// Total registrations across all slots
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub updated_at: String,
}

impl SlotCounts {
    pub fn new(event_id: &str) -> Self {
        Self {
            event_id: event_id.to_string(),
            ..Default::default()
        }
    }

    /// Current occupancy of a slot number.
    pub fn occupancy(&self, slot: u32) -> u32 {
        self.counts.get(&slot.to_string()).copied().unwrap_or(0)
    }

    /// Slot numbers in `[1, total_slots]` that still have room.
    pub fn available_slots(&self, total_slots: u32) -> Vec<u32> {
        (1..=total_slots)
            .filter(|s| self.occupancy(*s) < SLOT_CAPACITY)
            .collect()
    }

    /// Whether a slot number is valid for the event and has room.
    pub fn has_room(&self, slot: u32, total_slots: u32) -> bool {
        slot >= 1 && slot <= total_slots && self.occupancy(slot) < SLOT_CAPACITY
    }

    /// Record one registration in a slot.
    pub fn record(&mut self, slot: u32, now: &str) {
        *self.counts.entry(slot.to_string()).or_insert(0) += 1;
        self.total += 1;
        self.updated_at = now.to_string();
    }

    /// Remove one registration from a slot (admin deletion).
    pub fn remove(&mut self, slot: u32, now: &str) {
        let key = slot.to_string();
        if let Some(count) = self.counts.get_mut(&key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.counts.remove(&key);
            }
            self.total = self.total.saturating_sub(1);
        }
        self.updated_at = now.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: &str = "2026-08-01T00:00:00Z";

    #[test]
    fn test_doc_id_is_user_event_pair() {
        assert_eq!(Registration::doc_id("u1", "e9"), "u1_e9");
    }

    #[test]
    fn test_default_team_name_follows_slot() {
        let reg = Registration::new("u1", "u1@example.com", "e1", 3, NOW.to_string());
        assert_eq!(reg.team_name, "Team 3");
        assert!(reg.position.is_none());
    }

    #[test]
    fn test_slot_fills_at_capacity() {
        let mut counts = SlotCounts::new("e1");
        for _ in 0..SLOT_CAPACITY {
            assert!(counts.has_room(1, 2));
            counts.record(1, NOW);
        }

        // Slot 1 now holds 4 players and is excluded from availability
        assert!(!counts.has_room(1, 2));
        assert_eq!(counts.available_slots(2), vec![2]);
        assert_eq!(counts.total, SLOT_CAPACITY);
    }

    #[test]
    fn test_all_slots_full() {
        let mut counts = SlotCounts::new("e1");
        for slot in 1..=2 {
            for _ in 0..SLOT_CAPACITY {
                counts.record(slot, NOW);
            }
        }
        assert!(counts.available_slots(2).is_empty());
    }

    #[test]
    fn test_slot_outside_event_range_has_no_room() {
        let counts = SlotCounts::new("e1");
        assert!(!counts.has_room(0, 2));
        assert!(!counts.has_room(3, 2));
        assert!(counts.has_room(2, 2));
    }

    #[test]
    fn test_remove_frees_slot() {
        let mut counts = SlotCounts::new("e1");
        for _ in 0..SLOT_CAPACITY {
            counts.record(1, NOW);
        }
        assert!(!counts.has_room(1, 1));

        counts.remove(1, NOW);
        assert!(counts.has_room(1, 1));
        assert_eq!(counts.total, 3);
    }

    #[test]
    fn test_remove_from_empty_slot_is_noop() {
        let mut counts = SlotCounts::new("e1");
        counts.remove(1, NOW);
        assert_eq!(counts.total, 0);
        assert_eq!(counts.occupancy(1), 0);
    }
}
