//! Inventory API client
//!
//! Two upstream calls:
//! - `GET {base}/items`: the raw inventory event log
//! - `POST {base}/chat` with `{"query": text}`: the warehouse assistant
//!
//! Non-2xx responses become a [`FetchError`] carrying the most useful
//! human-readable message the body offers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error};

const USER_AGENT: &str = concat!("shelfwatch-dash/", env!("CARGO_PKG_VERSION"));

/// Upstream call failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Request never produced a response (connect, timeout, TLS)
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream answered with a non-success status
    #[error("{message}")]
    Http { status: u16, message: String },

    /// Response body is not valid JSON
    #[error("Invalid JSON response: {0}")]
    Parse(String),
}

/// Reply body of the chat endpoint
///
/// The assistant answers in `response`; some deployments use `completion`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion: Option<String>,
}

impl ChatResponse {
    /// Lenient extraction: non-string or empty fields count as absent
    pub fn from_value(value: &Value) -> Self {
        let text = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_str)
                .filter(|text| !text.is_empty())
                .map(str::to_string)
        };
        Self {
            response: text("response"),
            completion: text("completion"),
        }
    }

    /// Reply text, preferring `response` over `completion`
    pub fn reply_text(&self) -> Option<&str> {
        self.response.as_deref().or(self.completion.as_deref())
    }
}

/// The HTTP collaborator the reconciliation loop and chat relay depend on
#[async_trait]
pub trait InventoryApi: Send + Sync {
    /// Fetch the raw item list (opaque JSON, normalized by the caller)
    async fn fetch_items(&self) -> Result<Value, FetchError>;

    /// Forward one chat message
    async fn send_chat_message(&self, text: &str) -> Result<ChatResponse, FetchError>;
}

/// Which error-body shapes to look for when extracting a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorBodyShape {
    /// `message`, then `error`
    Items,
    /// `message`, then `error.message`, then a bare JSON string
    Chat,
}

/// Human-readable message for a failed upstream response
///
/// Falls back from the JSON fields to the raw body text to
/// `HTTP ERROR, Status: <code>`. 503 and 504 get a timeout hint appended.
pub fn extract_error_message(status: StatusCode, body: &str, shape: ErrorBodyShape) -> String {
    let from_json = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|parsed| message_from_json(&parsed, shape));

    let mut message = from_json
        .or_else(|| (!body.trim().is_empty()).then(|| body.to_string()))
        .unwrap_or_else(|| format!("HTTP ERROR, Status: {}", status.as_u16()));

    if status == StatusCode::SERVICE_UNAVAILABLE || status == StatusCode::GATEWAY_TIMEOUT {
        message.push_str(" (request may have timed out)");
    }
    message
}

fn message_from_json(parsed: &Value, shape: ErrorBodyShape) -> Option<String> {
    let non_empty = |value: Option<&Value>| {
        value
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    };

    if let Some(message) = non_empty(parsed.get("message")) {
        return Some(message);
    }

    match shape {
        ErrorBodyShape::Items => non_empty(parsed.get("error")),
        ErrorBodyShape::Chat => non_empty(parsed.get("error").and_then(|e| e.get("message")))
            .or_else(|| non_empty(Some(parsed))),
    }
}

/// reqwest-backed [`InventoryApi`]
pub struct HttpInventoryClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpInventoryClient {
    /// Create a client for `base_url` (no trailing slash needed)
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Read a response as JSON; an empty body reads as `{}`
    async fn read_json(
        response: reqwest::Response,
        shape: ErrorBodyShape,
    ) -> Result<Value, FetchError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                message: extract_error_message(status, &body, shape),
            });
        }

        if body.trim().is_empty() {
            return Ok(json!({}));
        }

        serde_json::from_str(&body).map_err(|e| FetchError::Parse(e.to_string()))
    }
}

#[async_trait]
impl InventoryApi for HttpInventoryClient {
    async fn fetch_items(&self) -> Result<Value, FetchError> {
        let url = format!("{}/items", self.base_url);
        debug!(url = %url, "Fetching inventory items");

        let response = self.http_client.get(&url).send().await.map_err(|e| {
            error!(url = %url, "Fetch error: {}", e);
            FetchError::Network(e.to_string())
        })?;

        Self::read_json(response, ErrorBodyShape::Items)
            .await
            .inspect_err(|e| error!(url = %url, "Fetch error: {}", e))
    }

    async fn send_chat_message(&self, text: &str) -> Result<ChatResponse, FetchError> {
        let url = format!("{}/chat", self.base_url);
        debug!(url = %url, chars = text.chars().count(), "Sending chat message");

        let response = self
            .http_client
            .post(&url)
            .json(&json!({ "query": text }))
            .send()
            .await
            .map_err(|e| {
                error!(url = %url, "POST error: {}", e);
                FetchError::Network(e.to_string())
            })?;

        let body = Self::read_json(response, ErrorBodyShape::Chat)
            .await
            .inspect_err(|e| error!(url = %url, "POST error: {}", e))?;

        Ok(ChatResponse::from_value(&body))
    }
}
