// src/api/types.rs

use serde::{Deserialize, Serialize};

use crate::chat::{SessionState, Turn};

/// Form body posted by the chat page.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatForm {
    #[serde(default)]
    pub message: String,
}

/// Request body for posting a message through the JSON API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

/// Response for session creation.
#[derive(Debug, Serialize)]
pub struct SessionCreatedResponse {
    pub session_id: String,
    pub state: SessionState,
}

/// A session's state and full transcript, in order.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: String,
    pub state: SessionState,
    pub turns: Vec<Turn>,
}

/// Outcome of one submitted message.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub session_id: String,
    /// Blank input; nothing was appended.
    pub ignored: bool,
    pub fallback: bool,
    pub reply: Option<Turn>,
    /// Failure category when `fallback` is true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    pub transcript_len: usize,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
