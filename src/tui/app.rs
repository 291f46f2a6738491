use crossterm::event::{ KeyCode, KeyEvent, KeyModifiers };

use crate::api::ApiError;
use crate::conversation::{ Conversation, Notification, PendingSend };
use crate::models::chat::Message;

const THROBBER: [char; 8] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧'];

/// Actions that need async handling (returned from handle_key)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Submit,
    Reset,
}

/// Outcome of a gateway call, delivered back to the event loop.
#[derive(Debug)]
pub enum Settlement {
    History(Result<Vec<Message>, ApiError>),
    /// A follow-up history fetch, tagged with the generation it was issued under.
    Refresh(u64, Result<Vec<Message>, ApiError>),
    Sent(Result<String, ApiError>),
    Reset(Result<String, ApiError>),
}

pub struct App {
    pub conversation: Conversation,
    pub input: String,
    pub notice: Option<Notification>,
    pub scroll_offset: usize,
    pub throbber_frame: usize,
    pending: Option<PendingSend>,
    refresh_generation: u64,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            conversation: Conversation::new(),
            input: String::new(),
            notice: None,
            scroll_offset: 0,
            throbber_frame: 0,
            pending: None,
            refresh_generation: 0,
        }
    }

    pub fn tick(&mut self) {
        self.throbber_frame = (self.throbber_frame + 1) % THROBBER.len();
    }

    pub fn throbber_char(&self) -> char {
        THROBBER[self.throbber_frame]
    }

    /// Input and actions are locked while any call is in flight.
    pub fn is_locked(&self) -> bool {
        self.conversation.is_busy()
    }

    pub fn can_submit(&self) -> bool {
        !self.is_locked() && !self.input.trim().is_empty()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Action> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => Some(Action::Quit),
            KeyCode::Char('c') if ctrl => Some(Action::Quit),
            KeyCode::Char('r') if ctrl => {
                if self.is_locked() { None } else { Some(Action::Reset) }
            }
            KeyCode::Enter => {
                if self.can_submit() { Some(Action::Submit) } else { None }
            }
            KeyCode::Up | KeyCode::PageUp => {
                self.scroll_offset = self.scroll_offset.saturating_add(1);
                None
            }
            KeyCode::Down | KeyCode::PageDown => {
                self.scroll_offset = self.scroll_offset.saturating_sub(1);
                None
            }
            _ if self.is_locked() => None,
            KeyCode::Backspace => {
                self.input.pop();
                None
            }
            KeyCode::Char(c) if !ctrl => {
                self.input.push(c);
                None
            }
            _ => None,
        }
    }

    /// Starts a send from the current input; returns the text to post.
    pub fn begin_submit(&mut self) -> Option<String> {
        let pending = self.conversation.begin_send(&self.input)?;
        let text = pending.text().to_string();
        self.pending = Some(pending);
        self.input.clear();
        self.notice = None;
        self.scroll_offset = 0;
        // Refreshes already in flight predate this message.
        self.refresh_generation += 1;
        Some(text)
    }

    pub fn begin_reset(&mut self) -> bool {
        if !self.conversation.begin_reset() {
            return false;
        }
        self.notice = None;
        true
    }

    /// Starts a new refresh generation; only its result will be applied.
    pub fn issue_refresh(&mut self) -> u64 {
        self.refresh_generation += 1;
        self.refresh_generation
    }

    /// Applies a settled call. Returns true when a history refresh should follow.
    pub fn settle(&mut self, settlement: Settlement) -> bool {
        let refresh = match settlement {
            Settlement::History(result) => {
                self.conversation.settle_load(result);
                false
            }
            Settlement::Refresh(generation, result) => {
                if generation == self.refresh_generation {
                    self.conversation.apply_refresh(result);
                } else {
                    log::debug!(
                        "Dropping stale refresh (generation {}, current {})",
                        generation,
                        self.refresh_generation
                    );
                }
                false
            }
            Settlement::Sent(result) => {
                match self.pending.take() {
                    Some(pending) => self.conversation.settle_send(pending, result),
                    None => log::warn!("Send settled with nothing pending"),
                }
                true
            }
            Settlement::Reset(result) => {
                self.conversation.settle_reset(result);
                true
            }
        };

        if let Some(latest) = self.conversation.take_notifications().pop() {
            self.notice = Some(latest);
        }
        self.scroll_offset = 0;
        refresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{ NotificationKind, ViewState };
    use crate::models::chat::Role;
    use reqwest::StatusCode;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn msg(role: Role, content: &str) -> Message {
        Message { role, content: content.to_string(), timestamp: None }
    }

    fn contents(app: &App) -> Vec<(Role, String)> {
        app.conversation
            .messages()
            .iter()
            .map(|m| (m.role, m.content.clone()))
            .collect()
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_typing_and_submit() {
        let mut app = App::new();
        assert_eq!(app.handle_key(key(KeyCode::Enter)), None);

        type_text(&mut app, "hellp");
        app.handle_key(key(KeyCode::Backspace));
        type_text(&mut app, "o");
        assert_eq!(app.input, "hello");
        assert_eq!(app.handle_key(key(KeyCode::Enter)), Some(Action::Submit));

        assert_eq!(app.begin_submit().as_deref(), Some("hello"));
        assert!(app.input.is_empty());
        assert_eq!(app.conversation.state(), ViewState::Sending);
        assert_eq!(app.conversation.messages().len(), 1);
    }

    #[test]
    fn test_input_locked_while_sending() {
        let mut app = App::new();
        type_text(&mut app, "first");
        app.begin_submit().unwrap();

        type_text(&mut app, "more");
        assert!(app.input.is_empty());
        assert_eq!(app.handle_key(ctrl('r')), None);
        assert_eq!(app.handle_key(key(KeyCode::Enter)), None);
        assert_eq!(app.handle_key(key(KeyCode::Esc)), Some(Action::Quit));
    }

    #[test]
    fn test_send_settlement_requests_refresh() {
        let mut app = App::new();
        type_text(&mut app, "hello");
        app.begin_submit().unwrap();

        assert!(app.settle(Settlement::Sent(Ok("hi there".into()))));
        let roles: Vec<Role> = app.conversation.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
        assert!(!app.is_locked());
        assert!(app.notice.is_none());
    }

    #[test]
    fn test_failed_send_shows_notice() {
        let mut app = App::new();
        type_text(&mut app, "hello");
        app.begin_submit().unwrap();

        let err = ApiError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "rate limited".into(),
        };
        app.settle(Settlement::Sent(Err(err)));
        assert!(app.conversation.messages().is_empty());
        let notice = app.notice.as_ref().unwrap();
        assert_eq!(notice.description, "rate limited");
        assert_eq!(notice.kind, NotificationKind::Error);
    }

    #[test]
    fn test_reset_flow() {
        let mut app = App::new();
        app.settle(Settlement::History(Ok(vec![Message::user("hi")])));
        assert_eq!(app.handle_key(ctrl('r')), Some(Action::Reset));
        assert!(app.begin_reset());
        assert!(!app.begin_reset());
        assert!(app.settle(Settlement::Reset(Ok("ok".into()))));
        assert!(app.conversation.messages().is_empty());
        assert_eq!(app.notice.as_ref().unwrap().kind, NotificationKind::Success);
    }

    #[test]
    fn test_stale_refresh_keeps_optimistic_message() {
        let mut app = App::new();
        type_text(&mut app, "first");
        app.begin_submit().unwrap();
        assert!(app.settle(Settlement::Sent(Ok("r1".into()))));
        let first_refresh = app.issue_refresh();

        type_text(&mut app, "second");
        app.begin_submit().unwrap();
        let stale = vec![msg(Role::User, "first"), msg(Role::Assistant, "r1")];
        app.settle(Settlement::Refresh(first_refresh, Ok(stale)));
        assert_eq!(app.conversation.state(), ViewState::Sending);
        assert_eq!(
            contents(&app),
            vec![
                (Role::User, "first".to_string()),
                (Role::Assistant, "r1".to_string()),
                (Role::User, "second".to_string())
            ]
        );

        assert!(app.settle(Settlement::Sent(Ok("r2".into()))));
        assert_eq!(
            contents(&app),
            vec![
                (Role::User, "first".to_string()),
                (Role::Assistant, "r1".to_string()),
                (Role::User, "second".to_string()),
                (Role::Assistant, "r2".to_string())
            ]
        );

        let current = app.issue_refresh();
        let truth = vec![
            msg(Role::User, "first"),
            msg(Role::Assistant, "r1"),
            msg(Role::User, "second"),
            msg(Role::Assistant, "r2 from gateway")
        ];
        app.settle(Settlement::Refresh(current, Ok(truth)));
        assert_eq!(app.conversation.messages().last().unwrap().content, "r2 from gateway");
    }

    #[test]
    fn test_superseded_refresh_is_dropped() {
        let mut app = App::new();
        app.settle(Settlement::History(Ok(vec![msg(Role::User, "a")])));
        assert!(app.begin_reset());
        app.settle(Settlement::Reset(Ok("ok".into())));
        let older = app.issue_refresh();
        let newer = app.issue_refresh();

        app.settle(Settlement::Refresh(newer, Ok(vec![])));
        app.settle(Settlement::Refresh(older, Ok(vec![msg(Role::User, "a")])));
        assert!(app.conversation.messages().is_empty());
    }

    #[test]
    fn test_throbber_wraps() {
        let mut app = App::new();
        for _ in 0..THROBBER.len() {
            app.tick();
        }
        assert_eq!(app.throbber_char(), THROBBER[0]);
    }
}
