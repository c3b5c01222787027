//! Order-insensitive change detection
//!
//! Gates re-rendering: charts and tables are only rebuilt when a freshly
//! derived dataset differs in content from the last rendered one. The upstream
//! API gives no ordering guarantee between polls, so both sides are sorted
//! before comparing.

use std::cmp::Ordering;

use crate::record::InventoryEvent;

/// Field used to order records before comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    ItemId,
    ShelfLocation,
}

impl SortKey {
    /// String value of this key on `event` (missing = empty string)
    pub fn value_of(self, event: &InventoryEvent) -> &str {
        match self {
            SortKey::ItemId => event.item_id_str(),
            SortKey::ShelfLocation => event.shelf_location_str(),
        }
    }
}

/// Whether `new` differs from `old`
///
/// `None` is an unknown dataset (no baseline yet):
/// - both unknown: unchanged
/// - exactly one unknown: changed
/// - otherwise lengths, then content after sorting by `sort_key`
///
/// Records with equal sort keys are tie-broken by their full ordering, so any
/// permutation of the same records compares equal and the result does not
/// depend on argument order.
pub fn has_changed<T, F>(new: Option<&[T]>, old: Option<&[T]>, sort_key: F) -> bool
where
    T: Ord,
    F: Fn(&T) -> &str,
{
    let (new, old) = match (new, old) {
        (None, None) => return false,
        (Some(new), Some(old)) => (new, old),
        _ => return true,
    };

    if new.len() != old.len() {
        return true;
    }
    if new.is_empty() {
        return false;
    }

    let by_key = |a: &&T, b: &&T| -> Ordering {
        sort_key(*a)
            .cmp(sort_key(*b))
            .then_with(|| a.cmp(b))
    };

    let mut sorted_new: Vec<&T> = new.iter().collect();
    let mut sorted_old: Vec<&T> = old.iter().collect();
    sorted_new.sort_by(by_key);
    sorted_old.sort_by(by_key);

    sorted_new != sorted_old
}

/// [`has_changed`] over inventory records keyed by a record field
pub fn events_changed(
    new: Option<&[InventoryEvent]>,
    old: Option<&[InventoryEvent]>,
    key: SortKey,
) -> bool {
    has_changed(new, old, |event: &InventoryEvent| key.value_of(event))
}
