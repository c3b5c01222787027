//! # Shelfwatch Common Library
//!
//! Shared code for the Shelfwatch inventory dashboard:
//! - Inventory record type and normalizer
//! - Current shelf occupancy derivation
//! - Order-insensitive change detection
//! - View aggregates (category breakdown, shelf bars, trend, table rows)
//! - Dashboard render events
//! - Configuration loading
//! - Timestamp utilities

pub mod aggregates;
pub mod change;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod occupancy;
pub mod record;
pub mod time;

pub use change::{events_changed, has_changed, SortKey};
pub use dashboard::{DashboardEvent, DashboardView};
pub use error::{Error, Result};
pub use occupancy::{derive_occupancy, OccupancySnapshot};
pub use record::{normalize_items, InventoryEvent};
