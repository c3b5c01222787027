//! Chat relay endpoints

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::chat::{ChatError, ChatMessage};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub query: String,
}

/// POST /api/chat
///
/// Returns the assistant's reply, or a system message when the assistant
/// could not be reached. Both are 200; only a rejected send is an HTTP error.
pub async fn post_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatMessage>, ChatError> {
    state.chat.send(&request.query).await.map(Json)
}

/// GET /api/chat/history
pub async fn get_chat_history(State(state): State<AppState>) -> Json<Vec<ChatMessage>> {
    Json(state.chat.history())
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = match self {
            ChatError::Empty => StatusCode::BAD_REQUEST,
            ChatError::Busy => StatusCode::CONFLICT,
        };

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
