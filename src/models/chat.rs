use chrono::Local;
use serde::{ Serialize, Deserialize };
use std::fmt;

pub const DISPLAY_TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// The gateway keeps its system prompt at the head of the history.
    System,
}

impl Role {
    /// Short label shown next to a message bubble.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "U",
            Role::Assistant | Role::System => "AI",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::stamped(Role::User, content.into())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::stamped(Role::Assistant, content.into())
    }

    fn stamped(role: Role, content: String) -> Self {
        Self {
            role,
            content,
            timestamp: Some(now_display()),
        }
    }

    /// Timestamp to show for this message; messages from the gateway may not carry one.
    pub fn display_timestamp(&self) -> String {
        self.timestamp.clone().unwrap_or_else(now_display)
    }
}

pub fn now_display() -> String {
    Local::now().format(DISPLAY_TIME_FORMAT).to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatHistoryResponse {
    pub history: Vec<Message>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessageRequest {
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessageResponse {
    pub reply: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatResetResponse {
    pub status: String,
}

/// Error body the gateway (and the router) attach to failed responses.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
}
