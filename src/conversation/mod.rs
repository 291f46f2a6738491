use log::{ info, warn };

use crate::api::{ ApiError, ChatApi };
use crate::models::chat::Message;

const HISTORY_ERROR_TITLE: &str = "Failed to load history";
const ERROR_TITLE: &str = "Error";
const SUCCESS_TITLE: &str = "Success";
pub const RESET_DONE: &str = "Chat history was reset";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewState {
    Idle,
    LoadingHistory,
    Sending,
    Resetting,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    Error,
    Success,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub kind: NotificationKind,
}

impl Notification {
    fn error(title: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
            kind: NotificationKind::Error,
        }
    }

    fn success(description: impl Into<String>) -> Self {
        Self {
            title: SUCCESS_TITLE.to_string(),
            description: description.into(),
            kind: NotificationKind::Success,
        }
    }
}

/// A user message that has been optimistically appended but not yet settled.
#[derive(Debug)]
pub struct PendingSend {
    text: String,
    snapshot: Vec<Message>,
}

impl PendingSend {
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Client-held mirror of the gateway's conversation log.
///
/// Each operation is split into a `begin_*` phase that runs before the
/// network call and a `settle_*` phase that applies its outcome, so a caller
/// driving its own event loop can issue the call in between. The async
/// drivers (`mount`, `submit`, `reset`, `refresh`) run both phases against a
/// [`ChatApi`].
#[derive(Debug)]
pub struct Conversation {
    messages: Vec<Message>,
    state: ViewState,
    notifications: Vec<Notification>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            state: ViewState::Idle,
            notifications: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state != ViewState::Idle
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn latest_notification(&self) -> Option<&Notification> {
        self.notifications.last()
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub fn begin_load(&mut self) -> bool {
        if self.is_busy() {
            return false;
        }
        self.state = ViewState::LoadingHistory;
        true
    }

    pub fn settle_load(&mut self, result: Result<Vec<Message>, ApiError>) {
        self.apply_refresh(result);
        self.state = ViewState::Idle;
    }

    /// Overwrites the cache with the gateway's history. Does not touch the view state.
    pub fn apply_refresh(&mut self, result: Result<Vec<Message>, ApiError>) {
        match result {
            Ok(history) => {
                self.messages = history;
            }
            Err(e) => {
                warn!("History fetch failed: {}", e);
                self.notifications.push(Notification::error(HISTORY_ERROR_TITLE, e.message()));
            }
        }
    }

    /// Appends the user's message before the gateway has answered.
    ///
    /// Returns `None` without touching the cache when the trimmed input is
    /// empty or another operation is in flight.
    pub fn begin_send(&mut self, input: &str) -> Option<PendingSend> {
        let text = input.trim();
        if text.is_empty() || self.is_busy() {
            return None;
        }

        let snapshot = self.messages.clone();
        self.messages.push(Message::user(text));
        self.state = ViewState::Sending;

        Some(PendingSend {
            text: text.to_string(),
            snapshot,
        })
    }

    pub fn settle_send(&mut self, pending: PendingSend, result: Result<String, ApiError>) {
        match result {
            Ok(reply) => {
                self.messages.push(Message::assistant(reply));
            }
            Err(e) => {
                warn!("Send failed, rolling back: {}", e);
                self.messages = pending.snapshot;
                self.notifications.push(Notification::error(ERROR_TITLE, e.message()));
            }
        }
        self.state = ViewState::Idle;
    }

    pub fn begin_reset(&mut self) -> bool {
        if self.is_busy() {
            return false;
        }
        self.state = ViewState::Resetting;
        true
    }

    pub fn settle_reset(&mut self, result: Result<String, ApiError>) {
        match result {
            Ok(status) => {
                info!("History reset: {}", status);
                self.messages.clear();
                self.notifications.push(Notification::success(RESET_DONE));
            }
            Err(e) => {
                warn!("Reset failed: {}", e);
                self.notifications.push(Notification::error(ERROR_TITLE, e.message()));
            }
        }
        self.state = ViewState::Idle;
    }

    pub async fn mount(&mut self, api: &dyn ChatApi) {
        if !self.begin_load() {
            return;
        }
        let result = api.fetch_history().await;
        self.settle_load(result);
    }

    pub async fn refresh(&mut self, api: &dyn ChatApi) {
        let result = api.fetch_history().await;
        self.apply_refresh(result);
    }

    /// Returns whether a send was issued.
    pub async fn submit(&mut self, api: &dyn ChatApi, input: &str) -> bool {
        let Some(pending) = self.begin_send(input) else {
            return false;
        };
        let result = api.send_message(pending.text()).await;
        self.settle_send(pending, result);
        self.refresh(api).await;
        true
    }

    pub async fn reset(&mut self, api: &dyn ChatApi) -> bool {
        if !self.begin_reset() {
            return false;
        }
        let result = api.reset_history().await;
        self.settle_reset(result);
        self.refresh(api).await;
        true
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::models::chat::Role;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::sync::Mutex;

    /// In-memory gateway that records calls and can be told to fail.
    #[derive(Default)]
    pub struct FakeGateway {
        pub history: Mutex<Vec<Message>>,
        pub send_error: Mutex<Option<String>>,
        pub fail_history: Mutex<bool>,
        /// Number of upcoming history fetches that fail before they succeed again.
        pub history_failures: Mutex<usize>,
        pub fail_reset: Mutex<bool>,
        pub calls: Mutex<Vec<&'static str>>,
    }

    impl FakeGateway {
        pub fn with_history(history: Vec<Message>) -> Self {
            let gw = Self::default();
            *gw.history.lock().unwrap() = history;
            gw
        }

        pub fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        fn failure(message: &str) -> ApiError {
            ApiError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: message.to_string(),
            }
        }
    }

    #[async_trait]
    impl ChatApi for FakeGateway {
        async fn fetch_history(&self) -> Result<Vec<Message>, ApiError> {
            self.calls.lock().unwrap().push("history");
            if *self.fail_history.lock().unwrap() {
                return Err(Self::failure("Failed to fetch chat history"));
            }
            {
                let mut remaining = self.history_failures.lock().unwrap();
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(Self::failure("Failed to fetch chat history"));
                }
            }
            Ok(self.history.lock().unwrap().clone())
        }

        async fn send_message(&self, text: &str) -> Result<String, ApiError> {
            self.calls.lock().unwrap().push("send");
            if let Some(e) = self.send_error.lock().unwrap().clone() {
                return Err(Self::failure(&e));
            }
            let reply = format!("echo: {}", text);
            let mut history = self.history.lock().unwrap();
            history.push(Message { role: Role::User, content: text.to_string(), timestamp: None });
            history.push(Message { role: Role::Assistant, content: reply.clone(), timestamp: None });
            Ok(reply)
        }

        async fn reset_history(&self) -> Result<String, ApiError> {
            self.calls.lock().unwrap().push("reset");
            if *self.fail_reset.lock().unwrap() {
                return Err(Self::failure("Failed to reset chat history"));
            }
            self.history.lock().unwrap().clear();
            Ok("Conversation history reset.".to_string())
        }
    }
}
