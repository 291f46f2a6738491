use async_trait::async_trait;
use log::{ debug, warn };
use reqwest::{ Client as HttpClient, StatusCode };
use thiserror::Error;

use crate::models::chat::{
    ChatHistoryResponse,
    ChatMessageRequest,
    ChatMessageResponse,
    ChatResetResponse,
    ErrorResponse,
    Message,
};

pub const HISTORY_ROUTE: &str = "/chat/history";
pub const SEND_ROUTE: &str = "/chat/";
pub const RESET_ROUTE: &str = "/chat/reset";

const HISTORY_FAILED: &str = "Failed to fetch chat history";
const SEND_FAILED: &str = "Failed to send message";
const RESET_FAILED: &str = "Failed to reset chat history";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")] Transport(#[source] reqwest::Error),
    #[error("{message}")] Status {
        status: StatusCode,
        message: String,
    },
    #[error("unexpected response body: {0}")] Decode(#[source] reqwest::Error),
}

impl ApiError {
    /// Short text shown to the user when this failure is surfaced.
    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// The three operations the chat gateway exposes.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn fetch_history(&self) -> Result<Vec<Message>, ApiError>;

    async fn send_message(&self, text: &str) -> Result<String, ApiError>;

    async fn reset_history(&self) -> Result<String, ApiError>;
}

#[derive(Clone)]
pub struct HttpChatApi {
    http: HttpClient,
    base_url: String,
}

impl HttpChatApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(HttpClient::new(), base_url)
    }

    pub fn with_client(http: HttpClient, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn fetch_history(&self) -> Result<Vec<Message>, ApiError> {
        let url = self.url(HISTORY_ROUTE);
        debug!("GET {}", url);
        let resp = self.http.get(&url).send().await.map_err(ApiError::Transport)?;

        if !resp.status().is_success() {
            warn!("History fetch returned {}", resp.status());
            return Err(ApiError::Status {
                status: resp.status(),
                message: HISTORY_FAILED.to_string(),
            });
        }

        let body = resp.json::<ChatHistoryResponse>().await.map_err(ApiError::Decode)?;
        Ok(body.history)
    }

    async fn send_message(&self, text: &str) -> Result<String, ApiError> {
        let url = self.url(SEND_ROUTE);
        debug!("POST {} ({} chars)", url, text.len());
        let req = ChatMessageRequest { message: text.to_string() };
        let resp = self.http
            .post(&url)
            .json(&req)
            .send().await
            .map_err(ApiError::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .json::<ErrorResponse>().await
                .ok()
                .and_then(|body| body.error)
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| SEND_FAILED.to_string());
            warn!("Send returned {}: {}", status, message);
            return Err(ApiError::Status { status, message });
        }

        let body = resp.json::<ChatMessageResponse>().await.map_err(ApiError::Decode)?;
        Ok(body.reply)
    }

    async fn reset_history(&self) -> Result<String, ApiError> {
        let url = self.url(RESET_ROUTE);
        debug!("POST {}", url);
        let resp = self.http.post(&url).send().await.map_err(ApiError::Transport)?;

        if !resp.status().is_success() {
            warn!("Reset returned {}", resp.status());
            return Err(ApiError::Status {
                status: resp.status(),
                message: RESET_FAILED.to_string(),
            });
        }

        let body = resp.json::<ChatResetResponse>().await.map_err(ApiError::Decode)?;
        Ok(body.status)
    }
}
