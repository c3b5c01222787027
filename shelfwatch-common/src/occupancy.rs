//! Current shelf occupancy derivation
//!
//! The inventory API only stores an append-only log of inbound and outbound
//! records. Which slots are occupied right now is never stored; it is inferred
//! by replaying the log in chronological order:
//!
//! - inbound for a location: that record now occupies the slot (last inbound wins)
//! - outbound for a location: the slot is vacated (no-op if already empty)
//!
//! Records with a missing or unparsable timestamp replay first, so a malformed
//! timestamp can never mask a real outbound that follows it.

use std::collections::BTreeMap;

use crate::record::InventoryEvent;

/// Location values that mean "not shelved"
const UNSHELVED_SENTINELS: &[&str] = &["無", "none"];

/// Derived mapping of shelf location to the record currently stored there
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OccupancySnapshot {
    slots: BTreeMap<String, InventoryEvent>,
}

impl OccupancySnapshot {
    /// Replay `events` (any order) into the current occupancy
    pub fn derive(events: &[InventoryEvent]) -> Self {
        let mut slots = BTreeMap::new();

        for event in chronological(events) {
            let Some(location) = shelved_location(event) else {
                continue;
            };

            if event.is_inbound() {
                slots.insert(location.to_string(), event.clone());
            } else {
                slots.remove(location);
            }
        }

        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, location: &str) -> Option<&InventoryEvent> {
        self.slots.get(location)
    }

    pub fn contains(&self, location: &str) -> bool {
        self.slots.contains_key(location)
    }

    /// Occupying records, ascending by location
    pub fn events(&self) -> impl Iterator<Item = &InventoryEvent> {
        self.slots.values()
    }

    /// Occupying records as an owned list, ascending by location
    pub fn into_events(self) -> Vec<InventoryEvent> {
        self.slots.into_values().collect()
    }
}

/// Derive occupancy and return it as a list, one record per occupied location
pub fn derive_occupancy(events: &[InventoryEvent]) -> Vec<InventoryEvent> {
    OccupancySnapshot::derive(events).into_events()
}

/// Ascending sort by timestamp, unparsable timestamps first
///
/// Events on the same instant replay inbound before outbound, then by item id,
/// then by the full record, so the result does not depend on input order.
pub fn chronological(events: &[InventoryEvent]) -> Vec<&InventoryEvent> {
    let mut sorted: Vec<&InventoryEvent> = events.iter().collect();
    // Option orders None before Some; false (inbound) before true (outbound)
    sorted.sort_by(|a, b| {
        (a.ordering_key(), a.is_issued, &a.item_id)
            .cmp(&(b.ordering_key(), b.is_issued, &b.item_id))
            .then_with(|| a.cmp(b))
    });
    sorted
}

/// The event's location if it names a real slot
fn shelved_location(event: &InventoryEvent) -> Option<&str> {
    let location = event.shelf_location.as_deref()?;
    let trimmed = location.trim();
    if trimmed.is_empty() {
        return None;
    }
    if UNSHELVED_SENTINELS
        .iter()
        .any(|sentinel| trimmed.eq_ignore_ascii_case(sentinel))
    {
        return None;
    }
    Some(location)
}
