//! shelfwatch-dash library - inventory dashboard service
//!
//! Polls the inventory API, re-derives shelf occupancy, and pushes render
//! events to browsers over SSE only when the data changed. Also relays chat
//! messages to the warehouse assistant.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use shelfwatch_common::config::DashboardConfig;
use shelfwatch_common::time::millis_to_duration;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub mod api;
pub mod chat;
pub mod client;
pub mod error;
pub mod reconcile;
pub mod render;
pub mod sse;

pub use error::{Error, Result};

use chat::ChatRelay;
use client::{HttpInventoryClient, InventoryApi};
use reconcile::Reconciler;
use sse::SseBroadcaster;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Render fan-out and current view
    pub broadcaster: SseBroadcaster,
    pub reconciler: Arc<Reconciler>,
    pub chat: Arc<ChatRelay>,
}

impl AppState {
    /// Wire the reconciler and chat relay to `api`, rendering through a new
    /// broadcaster
    pub fn new(api: Arc<dyn InventoryApi>, sse_capacity: usize) -> Self {
        let broadcaster = SseBroadcaster::new(sse_capacity);
        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&api),
            Arc::new(broadcaster.clone()),
        ));
        let chat = Arc::new(ChatRelay::new(api));

        Self {
            broadcaster,
            reconciler,
            chat,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/events", get(api::event_stream))
        .route("/api/view", get(api::get_view))
        .route("/api/status", get(api::get_status))
        .route("/api/buildinfo", get(api::get_build_info))
        .route("/api/chat", post(api::post_chat))
        .route("/api/chat/history", get(api::get_chat_history))
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Run the dashboard until `shutdown` is cancelled
///
/// Starts the reconciliation loop and serves HTTP. On shutdown the loop stops
/// scheduling cycles and the server drains open requests.
pub async fn run(config: DashboardConfig, shutdown: CancellationToken) -> Result<()> {
    let api: Arc<dyn InventoryApi> = Arc::new(HttpInventoryClient::new(
        &config.api_base_url,
        millis_to_duration(config.request_timeout_ms),
    )?);
    info!("Inventory API: {}", config.api_base_url);

    let state = AppState::new(api, config.sse_capacity);

    let broadcaster = state.broadcaster.clone();
    let reconciler = Arc::clone(&state.reconciler);
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;
    info!("shelfwatch-dash listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    let poll_loop = tokio::spawn(reconciler.run(
        millis_to_duration(config.poll_interval_ms),
        config.overlap_policy,
        shutdown.clone(),
    ));

    let server_shutdown = shutdown.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            server_shutdown.cancelled().await;
            broadcaster.close();
        })
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)));

    // The server can also stop on its own error; make sure the loop stops too.
    shutdown.cancel();
    if let Err(e) = poll_loop.await {
        warn!("Reconciliation loop task ended abnormally: {}", e);
    }

    served
}
