//! Dashboard render events and the rendered view
//!
//! Every render signal the reconciliation loop emits is one [`DashboardEvent`].
//! [`DashboardView`] folds those events into "what is on screen now", which
//! lets a browser that connects late draw the current state immediately.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregates::{CategoryBreakdown, ShelfOccupancy, TableRow, TrendSeries};

/// Render signal sent to dashboard clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DashboardEvent {
    /// In-stock table replaced
    TableRendered {
        rows: Vec<TableRow>,
        timestamp: DateTime<Utc>,
    },

    /// Category pie chart replaced
    CategoryBreakdown {
        breakdown: CategoryBreakdown,
        timestamp: DateTime<Utc>,
    },

    /// Shelf bar chart replaced
    ShelfOccupancy {
        shelves: ShelfOccupancy,
        timestamp: DateTime<Utc>,
    },

    /// Shelf simulation: exactly these locations are occupied
    ShelfSimulation {
        occupied: BTreeSet<String>,
        timestamp: DateTime<Utc>,
    },

    /// Inbound trend chart replaced
    TrendRendered {
        trend: TrendSeries,
        timestamp: DateTime<Utc>,
    },

    /// Error region shows `message`
    ErrorReported {
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Error region hidden
    ErrorCleared { timestamp: DateTime<Utc> },
}

impl DashboardEvent {
    /// Event type name, used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            DashboardEvent::TableRendered { .. } => "TableRendered",
            DashboardEvent::CategoryBreakdown { .. } => "CategoryBreakdown",
            DashboardEvent::ShelfOccupancy { .. } => "ShelfOccupancy",
            DashboardEvent::ShelfSimulation { .. } => "ShelfSimulation",
            DashboardEvent::TrendRendered { .. } => "TrendRendered",
            DashboardEvent::ErrorReported { .. } => "ErrorReported",
            DashboardEvent::ErrorCleared { .. } => "ErrorCleared",
        }
    }
}

/// Last payload of each render kind plus the current error message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    pub table: Option<Vec<TableRow>>,
    pub categories: Option<CategoryBreakdown>,
    pub shelves: Option<ShelfOccupancy>,
    pub occupied: Option<BTreeSet<String>>,
    pub trend: Option<TrendSeries>,
    pub error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl DashboardView {
    /// Fold one render event into the view
    ///
    /// An error report blanks the table and charts, matching what the page
    /// shows while the error region is visible.
    pub fn apply(&mut self, event: &DashboardEvent) {
        match event {
            DashboardEvent::TableRendered { rows, timestamp } => {
                self.table = Some(rows.clone());
                self.updated_at = Some(*timestamp);
            }
            DashboardEvent::CategoryBreakdown { breakdown, timestamp } => {
                self.categories = Some(breakdown.clone());
                self.updated_at = Some(*timestamp);
            }
            DashboardEvent::ShelfOccupancy { shelves, timestamp } => {
                self.shelves = Some(shelves.clone());
                self.updated_at = Some(*timestamp);
            }
            DashboardEvent::ShelfSimulation { occupied, timestamp } => {
                self.occupied = Some(occupied.clone());
                self.updated_at = Some(*timestamp);
            }
            DashboardEvent::TrendRendered { trend, timestamp } => {
                self.trend = Some(trend.clone());
                self.updated_at = Some(*timestamp);
            }
            DashboardEvent::ErrorReported { message, timestamp } => {
                self.table = None;
                self.categories = None;
                self.shelves = None;
                self.trend = None;
                self.error = Some(message.clone());
                self.updated_at = Some(*timestamp);
            }
            DashboardEvent::ErrorCleared { timestamp } => {
                self.error = None;
                self.updated_at = Some(*timestamp);
            }
        }
    }

    /// Replay events that reproduce this view on a fresh client
    pub fn replay(&self) -> Vec<DashboardEvent> {
        let timestamp = self.updated_at.unwrap_or_else(Utc::now);
        let mut events = Vec::new();

        if let Some(rows) = &self.table {
            events.push(DashboardEvent::TableRendered {
                rows: rows.clone(),
                timestamp,
            });
        }
        if let Some(breakdown) = &self.categories {
            events.push(DashboardEvent::CategoryBreakdown {
                breakdown: breakdown.clone(),
                timestamp,
            });
        }
        if let Some(shelves) = &self.shelves {
            events.push(DashboardEvent::ShelfOccupancy {
                shelves: shelves.clone(),
                timestamp,
            });
        }
        if let Some(occupied) = &self.occupied {
            events.push(DashboardEvent::ShelfSimulation {
                occupied: occupied.clone(),
                timestamp,
            });
        }
        if let Some(trend) = &self.trend {
            events.push(DashboardEvent::TrendRendered {
                trend: trend.clone(),
                timestamp,
            });
        }
        if let Some(message) = &self.error {
            events.push(DashboardEvent::ErrorReported {
                message: message.clone(),
                timestamp,
            });
        }

        events
    }
}
