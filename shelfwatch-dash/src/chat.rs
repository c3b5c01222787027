//! Chat relay to the warehouse assistant
//!
//! Forwards one message at a time and keeps the transcript. Upstream failures
//! become system messages in the transcript, not errors.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::client::InventoryApi;

pub const GREETING: &str =
    "Hello! How can I help you? (e.g. How many items are currently in stock?)";

/// Reply used when the assistant answers with neither `response` nor `completion`
pub const FALLBACK_REPLY: &str = "Sorry, I can't process your request right now.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatSender {
    User,
    Agent,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: ChatSender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    fn new(sender: ChatSender, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Rejected before anything is sent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("Message is empty")]
    Empty,

    #[error("Another message is still being sent")]
    Busy,
}

pub struct ChatRelay {
    api: Arc<dyn InventoryApi>,
    transcript: Mutex<Vec<ChatMessage>>,
    sending: AtomicBool,
}

impl ChatRelay {
    /// New relay whose transcript starts with the assistant's greeting
    pub fn new(api: Arc<dyn InventoryApi>) -> Self {
        Self {
            api,
            transcript: Mutex::new(vec![ChatMessage::new(ChatSender::Agent, GREETING)]),
            sending: AtomicBool::new(false),
        }
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        self.lock_transcript().clone()
    }

    /// Send `text` to the assistant and return the message that answers it
    ///
    /// The answer is the agent's reply, or a system message if the upstream
    /// call failed. Both are appended to the transcript after the user's
    /// message. Only one send may be in flight.
    pub async fn send(&self, text: &str) -> Result<ChatMessage, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::Empty);
        }

        let Some(_sending) = SendingGuard::try_acquire(&self.sending) else {
            debug!("Chat send rejected, previous message in flight");
            return Err(ChatError::Busy);
        };

        self.push(ChatMessage::new(ChatSender::User, text));
        info!(chars = text.chars().count(), "Forwarding chat message");

        let reply = match self.api.send_chat_message(text).await {
            Ok(response) => ChatMessage::new(
                ChatSender::Agent,
                response.reply_text().unwrap_or(FALLBACK_REPLY),
            ),
            Err(e) => {
                error!("Chat error: {}", e);
                ChatMessage::new(
                    ChatSender::System,
                    format!("Error communicating with the assistant: {}", e),
                )
            }
        };

        self.push(reply.clone());
        Ok(reply)
    }

    fn push(&self, message: ChatMessage) {
        self.lock_transcript().push(message);
    }

    fn lock_transcript(&self) -> MutexGuard<'_, Vec<ChatMessage>> {
        self.transcript
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Clears the sending flag on drop, including when the request is abandoned
struct SendingGuard<'a>(&'a AtomicBool);

impl<'a> SendingGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ChatResponse, FetchError};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use tokio::sync::Notify;

    struct CannedApi {
        reply: Result<ChatResponse, FetchError>,
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl InventoryApi for CannedApi {
        async fn fetch_items(&self) -> Result<Value, FetchError> {
            Ok(json!([]))
        }

        async fn send_chat_message(&self, _text: &str) -> Result<ChatResponse, FetchError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.reply.clone()
        }
    }

    fn relay(reply: Result<ChatResponse, FetchError>) -> ChatRelay {
        ChatRelay::new(Arc::new(CannedApi { reply, gate: None }))
    }

    #[test]
    fn test_transcript_starts_with_greeting() {
        let history = relay(Ok(ChatResponse::default())).history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].sender, ChatSender::Agent);
        assert_eq!(history[0].text, GREETING);
    }

    #[tokio::test]
    async fn test_agent_reply() {
        let relay = relay(Ok(ChatResponse {
            response: None,
            completion: Some("42 items".to_string()),
        }));

        let reply = relay.send("  how many?  ").await.unwrap();
        assert_eq!(reply.sender, ChatSender::Agent);
        assert_eq!(reply.text, "42 items");

        let history = relay.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[1].sender, ChatSender::User);
        assert_eq!(history[1].text, "how many?");
    }

    #[tokio::test]
    async fn test_empty_reply_uses_fallback() {
        let relay = relay(Ok(ChatResponse::default()));
        let reply = relay.send("hi").await.unwrap();
        assert_eq!(reply.text, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn test_failure_becomes_system_message() {
        let relay = relay(Err(FetchError::Http {
            status: 502,
            message: "Model overloaded".to_string(),
        }));

        let reply = relay.send("hi").await.unwrap();
        assert_eq!(reply.sender, ChatSender::System);
        assert_eq!(reply.text, "Error communicating with the assistant: Model overloaded");

        // A failed send does not block the next one
        assert!(relay.send("again").await.is_ok());
    }

    #[tokio::test]
    async fn test_blank_message_rejected() {
        let relay = relay(Ok(ChatResponse::default()));
        assert_eq!(relay.send("   ").await, Err(ChatError::Empty));
        assert_eq!(relay.history().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_send_rejected() {
        let gate = Arc::new(Notify::new());
        let relay = Arc::new(ChatRelay::new(Arc::new(CannedApi {
            reply: Ok(ChatResponse {
                response: Some("done".to_string()),
                completion: None,
            }),
            gate: Some(Arc::clone(&gate)),
        })));

        let first = {
            let relay = Arc::clone(&relay);
            tokio::spawn(async move { relay.send("first").await })
        };
        while relay.history().len() < 2 {
            tokio::task::yield_now().await;
        }

        assert_eq!(relay.send("second").await, Err(ChatError::Busy));

        gate.notify_one();
        let reply = first.await.unwrap().unwrap();
        assert_eq!(reply.text, "done");
    }
}
