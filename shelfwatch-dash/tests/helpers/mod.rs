//! Test doubles for shelfwatch-dash integration tests
//!
//! - ScriptedApi: an InventoryApi that replays a queue of fetch results
//! - RecordingRenderer: a DashboardRenderer that records every signal

#![allow(dead_code)]

use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use shelfwatch_common::aggregates::{CategoryBreakdown, ShelfOccupancy, TrendSeries};
use shelfwatch_common::InventoryEvent;
use shelfwatch_dash::client::{ChatResponse, FetchError, InventoryApi};
use shelfwatch_dash::render::{DashboardRenderer, RenderError};
use tokio::sync::Notify;

/// Three records: item 1 in and out of A1, item 2 into B2
pub fn scenario() -> Value {
    json!([
        {"itemId": "1", "shelfLocation": "A1", "isIssued": false, "timestamp": "2024-01-01T00:00:00Z", "itemType": "Box"},
        {"itemId": "1", "shelfLocation": "A1", "isIssued": true, "timestamp": "2024-01-02T00:00:00Z", "itemType": "Box"},
        {"itemId": "2", "shelfLocation": "B2", "isIssued": false, "timestamp": "2024-01-03T00:00:00Z", "itemType": "Crate"}
    ])
}

/// One scripted fetch result
pub enum Step {
    Items(Value),
    Fail(FetchError),
    /// Wait for the notify, then return the items
    Gated(Value, Arc<Notify>),
}

/// InventoryApi that replays scripted fetch results in order
///
/// Once the script is exhausted every fetch returns `fallback`.
pub struct ScriptedApi {
    steps: Mutex<VecDeque<Step>>,
    fallback: Value,
    calls: AtomicUsize,
    chat_reply: Result<ChatResponse, FetchError>,
}

impl ScriptedApi {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            fallback: json!([]),
            calls: AtomicUsize::new(0),
            chat_reply: Ok(ChatResponse {
                response: Some("There are 3 items in stock.".to_string()),
                completion: None,
            }),
        }
    }

    pub fn repeating(items: Value) -> Self {
        Self {
            fallback: items,
            ..Self::new(Vec::new())
        }
    }

    pub fn with_chat_reply(mut self, reply: Result<ChatResponse, FetchError>) -> Self {
        self.chat_reply = reply;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InventoryApi for ScriptedApi {
    async fn fetch_items(&self) -> Result<Value, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front();

        match step {
            Some(Step::Items(items)) => Ok(items),
            Some(Step::Fail(e)) => Err(e),
            Some(Step::Gated(items, gate)) => {
                gate.notified().await;
                Ok(items)
            }
            None => Ok(self.fallback.clone()),
        }
    }

    async fn send_chat_message(&self, _text: &str) -> Result<ChatResponse, FetchError> {
        self.chat_reply.clone()
    }
}

/// One recorded render signal
#[derive(Debug, Clone, PartialEq)]
pub enum Render {
    Table(Vec<InventoryEvent>),
    Categories(CategoryBreakdown),
    Shelves(ShelfOccupancy),
    Simulation(BTreeSet<String>),
    Trend(TrendSeries),
    Error(String),
    ClearError,
}

impl Render {
    pub fn name(&self) -> &'static str {
        match self {
            Render::Table(_) => "table",
            Render::Categories(_) => "categories",
            Render::Shelves(_) => "shelves",
            Render::Simulation(_) => "simulation",
            Render::Trend(_) => "trend",
            Render::Error(_) => "error",
            Render::ClearError => "clear_error",
        }
    }
}

/// DashboardRenderer that records signals; steps named in `failing` return an
/// error instead
#[derive(Default)]
pub struct RecordingRenderer {
    calls: Mutex<Vec<Render>>,
    failing: Vec<&'static str>,
}

impl RecordingRenderer {
    pub fn failing(steps: &[&'static str]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: steps.to_vec(),
        }
    }

    /// Drain recorded signals
    pub fn take(&self) -> Vec<Render> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    pub fn names(renders: &[Render]) -> Vec<&'static str> {
        renders.iter().map(Render::name).collect()
    }

    fn record(&self, render: Render) -> Result<(), RenderError> {
        let name = render.name();
        if self.failing.contains(&name) {
            return Err(RenderError::CollaboratorMissing(name.to_string()));
        }
        self.calls.lock().unwrap().push(render);
        Ok(())
    }
}

impl DashboardRenderer for RecordingRenderer {
    fn render_table(&self, occupancy: &[InventoryEvent]) -> Result<(), RenderError> {
        self.record(Render::Table(occupancy.to_vec()))
    }

    fn render_category_breakdown(&self, breakdown: &CategoryBreakdown) -> Result<(), RenderError> {
        self.record(Render::Categories(breakdown.clone()))
    }

    fn render_shelf_occupancy_bars(&self, shelves: &ShelfOccupancy) -> Result<(), RenderError> {
        self.record(Render::Shelves(shelves.clone()))
    }

    fn render_shelf_simulation(&self, occupied: &BTreeSet<String>) -> Result<(), RenderError> {
        self.record(Render::Simulation(occupied.clone()))
    }

    fn render_trend(&self, trend: &TrendSeries) -> Result<(), RenderError> {
        self.record(Render::Trend(trend.clone()))
    }

    fn report_error(&self, message: &str) -> Result<(), RenderError> {
        self.record(Render::Error(message.to_string()))
    }

    fn clear_error(&self) -> Result<(), RenderError> {
        self.record(Render::ClearError)
    }
}
