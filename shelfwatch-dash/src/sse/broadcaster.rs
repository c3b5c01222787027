//! SSE broadcaster for dashboard render events

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use chrono::Utc;
use futures::stream::Stream;
use shelfwatch_common::aggregates::{table_rows, CategoryBreakdown, ShelfOccupancy, TrendSeries};
use shelfwatch_common::{DashboardEvent, DashboardView, InventoryEvent};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::render::{DashboardRenderer, RenderError};

/// Fans render events out to connected browsers
///
/// Also keeps the folded [`DashboardView`] so a client connecting later is
/// first sent the current screen, then live updates.
#[derive(Clone)]
pub struct SseBroadcaster {
    tx: broadcast::Sender<DashboardEvent>,
    view: Arc<Mutex<DashboardView>>,
    closed: CancellationToken,
}

impl SseBroadcaster {
    /// Create a new SSE broadcaster
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events buffered per client before it lags
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        info!("SSE broadcaster initialized with capacity {}", capacity);
        Self {
            tx,
            view: Arc::new(Mutex::new(DashboardView::default())),
            closed: CancellationToken::new(),
        }
    }

    /// Record the event in the view and send it to all connected clients
    ///
    /// No connected clients is not an error.
    pub fn publish(&self, event: DashboardEvent) {
        self.lock_view().apply(&event);
        match self.tx.send(event) {
            Ok(count) => debug!("Broadcast event to {} clients", count),
            Err(_) => debug!("No SSE clients connected"),
        }
    }

    /// Current rendered view
    pub fn view(&self) -> DashboardView {
        self.lock_view().clone()
    }

    /// Get current number of connected clients
    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Subscribe to raw events (tests and in-process consumers)
    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.tx.subscribe()
    }

    /// Event stream for one client: current view first, then live events
    pub fn subscribe_stream(&self) -> impl Stream<Item = Result<Event, Infallible>> {
        // Subscribe before snapshotting so nothing published in between is lost.
        // An event may arrive twice; applying a render event twice is harmless.
        let mut rx = self.tx.subscribe();
        let replay = self.lock_view().replay();
        let closed = self.closed.clone();

        async_stream::stream! {
            for event in replay {
                if let Some(sse) = to_sse_event(&event) {
                    yield Ok(sse);
                }
            }

            loop {
                let received = tokio::select! {
                    _ = closed.cancelled() => break,
                    received = rx.recv() => received,
                };

                match received {
                    Ok(event) => {
                        if let Some(sse) = to_sse_event(&event) {
                            yield Ok(sse);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("SSE client lagged, skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    /// Axum SSE response for GET /events
    pub fn handle_sse_connection(&self) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
        info!("New SSE client connected, total clients: {}", self.client_count() + 1);

        Sse::new(self.subscribe_stream()).keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(15))
                .text("keep-alive"),
        )
    }

    /// End every open event stream so the server can drain
    pub fn close(&self) {
        info!("Closing {} SSE streams", self.client_count());
        self.closed.cancel();
    }

    fn lock_view(&self) -> MutexGuard<'_, DashboardView> {
        // The view is plain data; a panic mid-update leaves it usable.
        self.view.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn to_sse_event(event: &DashboardEvent) -> Option<Event> {
    match Event::default()
        .event(event.event_type())
        .id(Uuid::new_v4().to_string())
        .json_data(event)
    {
        Ok(sse) => Some(sse),
        Err(e) => {
            warn!("Failed to serialize event: {}", e);
            None
        }
    }
}

impl DashboardRenderer for SseBroadcaster {
    fn render_table(&self, occupancy: &[InventoryEvent]) -> Result<(), RenderError> {
        self.publish(DashboardEvent::TableRendered {
            rows: table_rows(occupancy),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    fn render_category_breakdown(&self, breakdown: &CategoryBreakdown) -> Result<(), RenderError> {
        self.publish(DashboardEvent::CategoryBreakdown {
            breakdown: breakdown.clone(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    fn render_shelf_occupancy_bars(&self, shelves: &ShelfOccupancy) -> Result<(), RenderError> {
        self.publish(DashboardEvent::ShelfOccupancy {
            shelves: shelves.clone(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    fn render_shelf_simulation(&self, occupied: &BTreeSet<String>) -> Result<(), RenderError> {
        self.publish(DashboardEvent::ShelfSimulation {
            occupied: occupied.clone(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    fn render_trend(&self, trend: &TrendSeries) -> Result<(), RenderError> {
        self.publish(DashboardEvent::TrendRendered {
            trend: trend.clone(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    fn report_error(&self, message: &str) -> Result<(), RenderError> {
        self.publish(DashboardEvent::ErrorReported {
            message: message.to_string(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    fn clear_error(&self) -> Result<(), RenderError> {
        self.publish(DashboardEvent::ErrorCleared {
            timestamp: Utc::now(),
        });
        Ok(())
    }
}
