//! Dashboard view aggregates
//!
//! Pure functions turning an occupancy snapshot (or the full event list, for
//! the trend) into the payloads the render collaborators draw.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::record::InventoryEvent;
use crate::time::{calendar_date, format_display};

/// Label for records without an item type
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Shelves shown in the occupancy bar chart
pub const SHELVES: [char; 4] = ['A', 'B', 'C', 'D'];

/// Item count per category, labels in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub labels: Vec<String>,
    pub counts: Vec<u32>,
}

/// Occupied slot count per shelf (A-D)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShelfOccupancy {
    pub labels: Vec<String>,
    pub counts: Vec<u32>,
}

/// Daily inbound counts, dates ascending
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendSeries {
    pub dates: Vec<String>,
    pub daily_inbound_counts: Vec<u32>,
}

/// One row of the in-stock table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub employee: String,
    /// `YYYY-MM-DD HH:MM:SS` (UTC), or the raw text when unparsable
    pub inbound_time: String,
    pub shelf_location: String,
    pub item_type: String,
    pub is_violation: bool,
    /// Blank unless `is_violation`
    pub violation_content: String,
}

pub fn category_breakdown<'a, I>(occupied: I) -> CategoryBreakdown
where
    I: IntoIterator<Item = &'a InventoryEvent>,
{
    let mut breakdown = CategoryBreakdown::default();

    for event in occupied {
        let label = event
            .item_type
            .as_deref()
            .filter(|item_type| !item_type.is_empty())
            .unwrap_or(UNKNOWN_CATEGORY);

        match breakdown.labels.iter().position(|existing| existing == label) {
            Some(index) => breakdown.counts[index] += 1,
            None => {
                breakdown.labels.push(label.to_string());
                breakdown.counts.push(1);
            }
        }
    }

    breakdown
}

/// Count occupied slots by shelf letter (first character of the location)
///
/// Locations on shelves other than A-D are not counted.
pub fn shelf_occupancy<'a, I>(occupied: I) -> ShelfOccupancy
where
    I: IntoIterator<Item = &'a InventoryEvent>,
{
    let mut counts = [0u32; SHELVES.len()];

    for event in occupied {
        let shelf = event
            .shelf_location
            .as_deref()
            .and_then(|location| location.chars().next())
            .map(|first| first.to_ascii_uppercase());

        if let Some(index) = shelf.and_then(|s| SHELVES.iter().position(|known| *known == s)) {
            counts[index] += 1;
        }
    }

    ShelfOccupancy {
        labels: SHELVES.iter().map(|shelf| shelf.to_string()).collect(),
        counts: counts.to_vec(),
    }
}

/// Set of occupied location ids for the shelf simulation
pub fn occupied_locations<'a, I>(occupied: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a InventoryEvent>,
{
    occupied
        .into_iter()
        .filter_map(|event| event.shelf_location.as_deref())
        .map(str::trim)
        .filter(|location| !location.is_empty())
        .map(str::to_string)
        .collect()
}

/// Daily inbound counts over the full event list
///
/// Dates are UTC calendar days. Only inbound records with a parseable
/// timestamp count; days without any inbound are omitted, not zero-filled.
pub fn inbound_trend(events: &[InventoryEvent]) -> TrendSeries {
    let mut per_day: BTreeMap<String, u32> = BTreeMap::new();

    for event in events.iter().filter(|event| event.is_inbound()) {
        if let Some(instant) = event.ordering_key() {
            *per_day.entry(calendar_date(&instant)).or_insert(0) += 1;
        }
    }

    let (dates, daily_inbound_counts): (Vec<String>, Vec<u32>) = per_day.into_iter().unzip();
    TrendSeries {
        dates,
        daily_inbound_counts,
    }
}

/// Table rows, newest first; records with unparsable timestamps go last
pub fn table_rows<'a, I>(occupied: I) -> Vec<TableRow>
where
    I: IntoIterator<Item = &'a InventoryEvent>,
{
    let mut sorted: Vec<&InventoryEvent> = occupied.into_iter().collect();
    sorted.sort_by(|a, b| match (a.ordering_key(), b.ordering_key()) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    sorted.into_iter().map(TableRow::from_event).collect()
}

impl TableRow {
    fn from_event(event: &InventoryEvent) -> Self {
        Self {
            employee: event.employee.clone().unwrap_or_default(),
            inbound_time: event
                .timestamp
                .as_deref()
                .map(format_display)
                .unwrap_or_default(),
            shelf_location: event.shelf_location.clone().unwrap_or_default(),
            item_type: event.item_type.clone().unwrap_or_default(),
            is_violation: event.is_violation,
            violation_content: if event.is_violation {
                event.violation_content.clone().unwrap_or_default()
            } else {
                String::new()
            },
        }
    }
}
