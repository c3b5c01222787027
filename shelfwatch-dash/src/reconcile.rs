//! Periodic reconciliation of the dashboard against the inventory API
//!
//! Each cycle fetches the full event log, derives what is on the shelves now,
//! and signals the renderer only for the views whose data actually changed.
//! The baseline of what was last rendered is owned by the [`Reconciler`] and
//! guarded by an async mutex that is never held across the network fetch.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use shelfwatch_common::aggregates::{
    category_breakdown, inbound_trend, occupied_locations, shelf_occupancy,
};
use shelfwatch_common::config::OverlapPolicy;
use shelfwatch_common::{derive_occupancy, events_changed, normalize_items, InventoryEvent, SortKey};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::InventoryApi;
use crate::render::{DashboardRenderer, RenderError};

/// Prefix of the message shown when a cycle cannot load data
pub const LOAD_FAILURE_PREFIX: &str = "Failed to load inventory data";

/// What the dashboard currently shows
///
/// `None` means unknown: nothing rendered yet, or invalidated by a failure.
/// The next successful cycle then re-renders every view.
#[derive(Debug, Clone, Default)]
pub struct RenderBaseline {
    pub events: Option<Vec<InventoryEvent>>,
    pub occupancy: Option<Vec<InventoryEvent>>,
    /// Sequence number of the newest cycle whose result was applied
    pub applied_seq: u64,
    /// An error message is currently displayed
    pub error_shown: bool,
    pub last_success_at: Option<DateTime<Utc>>,
}

/// Which views a successful cycle re-rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleOutcome {
    pub trend_changed: bool,
    pub table_changed: bool,
}

/// Result of one reconciliation cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleResult {
    /// Data loaded and the baseline updated
    Applied(CycleOutcome),
    /// Fetch failed; error reported and baselines invalidated
    Failed(String),
    /// A newer cycle already applied its result; this one was discarded
    Stale,
}

/// Counters exposed on the status endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    pub cycles_started: u64,
    pub cycles_applied: u64,
    pub cycles_failed: u64,
    pub cycles_stale: u64,
    pub ticks_skipped: u64,
    pub last_success_at: Option<DateTime<Utc>>,
    pub error_shown: bool,
}

#[derive(Debug, Default)]
struct Counters {
    started: AtomicU64,
    applied: AtomicU64,
    failed: AtomicU64,
    stale: AtomicU64,
    skipped: AtomicU64,
}

/// Drives fetch, derive, diff and render on a timer
pub struct Reconciler {
    api: Arc<dyn InventoryApi>,
    renderer: Arc<dyn DashboardRenderer>,
    baseline: Mutex<RenderBaseline>,
    next_seq: AtomicU64,
    in_flight: AtomicBool,
    counters: Counters,
}

impl Reconciler {
    pub fn new(api: Arc<dyn InventoryApi>, renderer: Arc<dyn DashboardRenderer>) -> Self {
        Self {
            api,
            renderer,
            baseline: Mutex::new(RenderBaseline::default()),
            next_seq: AtomicU64::new(0),
            in_flight: AtomicBool::new(false),
            counters: Counters::default(),
        }
    }

    /// Copy of the current baseline
    pub async fn baseline(&self) -> RenderBaseline {
        self.baseline.lock().await.clone()
    }

    pub async fn stats(&self) -> ReconcileStats {
        let baseline = self.baseline.lock().await;
        ReconcileStats {
            cycles_started: self.counters.started.load(Ordering::Relaxed),
            cycles_applied: self.counters.applied.load(Ordering::Relaxed),
            cycles_failed: self.counters.failed.load(Ordering::Relaxed),
            cycles_stale: self.counters.stale.load(Ordering::Relaxed),
            ticks_skipped: self.counters.skipped.load(Ordering::Relaxed),
            last_success_at: baseline.last_success_at,
            error_shown: baseline.error_shown,
        }
    }

    /// Run one cycle to completion
    ///
    /// The sequence number is taken before the fetch. Once the fetch returns,
    /// the result is applied only if no later-started cycle has applied first.
    pub async fn run_cycle(&self) -> CycleResult {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.started.fetch_add(1, Ordering::Relaxed);
        debug!(seq, "Reconciliation cycle started");

        let fetched = self.api.fetch_items().await;

        let mut baseline = self.baseline.lock().await;
        if seq <= baseline.applied_seq {
            debug!(seq, applied_seq = baseline.applied_seq, "Discarding stale cycle result");
            self.counters.stale.fetch_add(1, Ordering::Relaxed);
            return CycleResult::Stale;
        }
        baseline.applied_seq = seq;

        match fetched {
            Ok(raw) => {
                let outcome = self.apply(&mut baseline, &raw);
                self.counters.applied.fetch_add(1, Ordering::Relaxed);
                CycleResult::Applied(outcome)
            }
            Err(e) => {
                let message = format!("{}: {}", LOAD_FAILURE_PREFIX, e);
                error!(seq, "{}", message);
                render_step("report_error", self.renderer.report_error(&message));
                baseline.events = None;
                baseline.occupancy = None;
                baseline.error_shown = true;
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                CycleResult::Failed(message)
            }
        }
    }

    fn apply(&self, baseline: &mut RenderBaseline, raw: &Value) -> CycleOutcome {
        let normalized = normalize_items(raw);

        let trend_changed = events_changed(
            Some(normalized.as_slice()),
            baseline.events.as_deref(),
            SortKey::ItemId,
        );

        let occupancy = if normalized.is_empty() {
            Vec::new()
        } else {
            derive_occupancy(&normalized)
        };

        let table_changed = events_changed(
            Some(occupancy.as_slice()),
            baseline.occupancy.as_deref(),
            SortKey::ShelfLocation,
        );

        if baseline.error_shown {
            render_step("clear_error", self.renderer.clear_error());
            baseline.error_shown = false;
        }

        if table_changed {
            render_step("table", self.renderer.render_table(&occupancy));
            render_step(
                "category_breakdown",
                self.renderer
                    .render_category_breakdown(&category_breakdown(&occupancy)),
            );
            render_step(
                "shelf_occupancy",
                self.renderer
                    .render_shelf_occupancy_bars(&shelf_occupancy(&occupancy)),
            );
            render_step(
                "shelf_simulation",
                self.renderer
                    .render_shelf_simulation(&occupied_locations(&occupancy)),
            );
        }

        if trend_changed {
            render_step("trend", self.renderer.render_trend(&inbound_trend(&normalized)));
        }

        debug!(
            events = normalized.len(),
            occupied = occupancy.len(),
            trend_changed,
            table_changed,
            "Reconciliation cycle applied"
        );

        if trend_changed {
            baseline.events = Some(normalized);
        }
        if table_changed {
            baseline.occupancy = Some(occupancy);
        }
        baseline.last_success_at = Some(Utc::now());

        CycleOutcome {
            trend_changed,
            table_changed,
        }
    }

    /// Tick every `period` until `shutdown` is cancelled
    ///
    /// Cancellation stops new cycles from being scheduled; cycles already
    /// running finish on their own.
    pub async fn run(
        self: Arc<Self>,
        period: Duration,
        policy: OverlapPolicy,
        shutdown: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            period_ms = period.as_millis() as u64,
            policy = %policy,
            "Reconciliation loop started"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Reconciliation loop stopped");
                    break;
                }
                _ = ticker.tick() => self.dispatch(policy),
            }
        }
    }

    fn dispatch(self: &Arc<Self>, policy: OverlapPolicy) {
        match policy {
            OverlapPolicy::Sequenced => {
                let reconciler = Arc::clone(self);
                tokio::spawn(async move {
                    reconciler.run_cycle().await;
                });
            }
            OverlapPolicy::Skip => {
                let Some(guard) = InFlightGuard::try_acquire(self) else {
                    self.counters.skipped.fetch_add(1, Ordering::Relaxed);
                    debug!("Previous cycle still running, skipping tick");
                    return;
                };
                tokio::spawn(async move {
                    guard.reconciler.run_cycle().await;
                });
            }
        }
    }
}

/// Holds the in-flight flag for the skip policy; released on drop
struct InFlightGuard {
    reconciler: Arc<Reconciler>,
}

impl InFlightGuard {
    fn try_acquire(reconciler: &Arc<Reconciler>) -> Option<Self> {
        reconciler
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                reconciler: Arc::clone(reconciler),
            })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.reconciler.in_flight.store(false, Ordering::Release);
    }
}

fn render_step(step: &str, result: Result<(), RenderError>) {
    if let Err(e) = result {
        warn!(step, "Render step failed: {}", e);
    }
}
