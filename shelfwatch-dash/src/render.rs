//! Render collaborator interface
//!
//! The reconciliation loop signals renderers; it never waits for or depends
//! on their output. A failing render step is logged by the caller and the
//! remaining steps still run.

use std::collections::BTreeSet;

use shelfwatch_common::aggregates::{CategoryBreakdown, ShelfOccupancy, TrendSeries};
use shelfwatch_common::InventoryEvent;
use thiserror::Error;

/// Render step failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The target for this view is not available
    #[error("Render target missing: {0}")]
    CollaboratorMissing(String),
}

/// Sink for dashboard render signals
pub trait DashboardRenderer: Send + Sync {
    /// Replace the in-stock table with the occupancy snapshot
    fn render_table(&self, occupancy: &[InventoryEvent]) -> Result<(), RenderError>;

    fn render_category_breakdown(&self, breakdown: &CategoryBreakdown) -> Result<(), RenderError>;

    fn render_shelf_occupancy_bars(&self, shelves: &ShelfOccupancy) -> Result<(), RenderError>;

    /// Highlight exactly `occupied` in the shelf simulation
    fn render_shelf_simulation(&self, occupied: &BTreeSet<String>) -> Result<(), RenderError>;

    fn render_trend(&self, trend: &TrendSeries) -> Result<(), RenderError>;

    /// Show `message` in the error region
    fn report_error(&self, message: &str) -> Result<(), RenderError>;

    /// Hide the error region
    fn clear_error(&self) -> Result<(), RenderError>;
}
