pub mod api;
pub mod cli;
pub mod conversation;
pub mod models;
pub mod router;
pub mod tui;

use api::{ ChatApi, HttpChatApi };
use cli::{ Args, Command };
use conversation::{ Conversation, NotificationKind };
use log::{ info, warn };
use models::chat::Message;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Backend URL: {}", args.backend_url);
    info!("API URL: {}", args.api_base_url());
    info!("Server Address: {}", args.server_addr);
    info!("Command: {:?}", args.command());
    info!("-------------------------");

    let api: Arc<dyn ChatApi> = Arc::new(HttpChatApi::new(args.api_base_url()));
    match args.command() {
        Command::Serve => {
            router::serve(&args.server_addr, &args.backend_url).await?;
            Ok(())
        }
        Command::Chat => tui::run(api).await,
        Command::History => {
            let mut conversation = Conversation::new();
            conversation.mount(api.as_ref()).await;
            report(&conversation)
        }
        Command::Send { message } => send_once(api.as_ref(), &message).await,
        Command::Reset => {
            let mut conversation = Conversation::new();
            conversation.reset(api.as_ref()).await;
            report(&conversation)
        }
    }
}

/// Loads the conversation, sends one message and prints the result.
///
/// A failed initial load is only a warning; the send and its refresh decide
/// the outcome.
async fn send_once(api: &dyn ChatApi, message: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut conversation = Conversation::new();
    conversation.mount(api).await;
    for note in conversation.take_notifications() {
        warn!("{}: {}", note.title, note.description);
    }

    if !conversation.submit(api, message).await {
        return Err("Message is empty".into());
    }
    report(&conversation)
}

pub fn format_message(msg: &Message) -> String {
    format!("[{}] {:>2}: {}", msg.display_timestamp(), msg.role.label(), msg.content)
}

/// Prints the conversation and its notifications; any error notification fails the command.
fn report(conversation: &Conversation) -> Result<(), Box<dyn Error + Send + Sync>> {
    for msg in conversation.messages() {
        println!("{}", format_message(msg));
    }

    let mut failure = None;
    for note in conversation.notifications() {
        match note.kind {
            NotificationKind::Success => println!("{}: {}", note.title, note.description),
            NotificationKind::Error => {
                eprintln!("{}: {}", note.title, note.description);
                failure = Some(note.description.clone());
            }
        }
    }

    match failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conversation::testing::FakeGateway;
    use models::chat::Role;

    #[test]
    fn test_format_message() {
        let msg = Message { role: Role::User, content: "hi".into(), timestamp: Some("08:30:00".into()) };
        assert_eq!(format_message(&msg), "[08:30:00]  U: hi");
        let msg = Message { role: Role::Assistant, content: "hello".into(), timestamp: Some("08:30:01".into()) };
        assert_eq!(format_message(&msg), "[08:30:01] AI: hello");
    }

    #[tokio::test]
    async fn test_send_succeeds_after_failed_initial_load() {
        let gw = FakeGateway::default();
        *gw.history_failures.lock().unwrap() = 1;
        assert!(send_once(&gw, "hello").await.is_ok());
        assert_eq!(gw.calls(), vec!["history", "send", "history"]);
    }

    #[tokio::test]
    async fn test_send_failure_fails_the_command() {
        let gw = FakeGateway::default();
        *gw.send_error.lock().unwrap() = Some("rate limited".to_string());
        let err = send_once(&gw, "hello").await.unwrap_err();
        assert_eq!(err.to_string(), "rate limited");
    }

    #[tokio::test]
    async fn test_send_blank_message_is_refused() {
        let gw = FakeGateway::default();
        assert!(send_once(&gw, "   ").await.is_err());
        assert_eq!(gw.calls(), vec!["history"]);
    }
}
