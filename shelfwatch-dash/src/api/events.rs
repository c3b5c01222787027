//! Dashboard event stream and current view

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, Sse},
    Json,
};
use futures::stream::Stream;
use serde::Serialize;
use shelfwatch_common::DashboardView;

use crate::reconcile::ReconcileStats;
use crate::AppState;

/// GET /events - SSE stream of dashboard render events
///
/// A new client first receives the current view, then live events:
/// - TableRendered, CategoryBreakdown, ShelfOccupancy, ShelfSimulation
/// - TrendRendered
/// - ErrorReported, ErrorCleared
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    state.broadcaster.handle_sse_connection()
}

/// GET /api/view
///
/// Last payload of each kind and the error currently shown, if any.
pub async fn get_view(State(state): State<AppState>) -> Json<DashboardView> {
    Json(state.broadcaster.view())
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub sse_clients: usize,
    pub reconcile: ReconcileStats,
}

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        sse_clients: state.broadcaster.client_count(),
        reconcile: state.reconciler.stats().await,
    })
}
