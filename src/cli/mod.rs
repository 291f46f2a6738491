use clap::{ Parser, Subcommand };

use crate::router::DEFAULT_BACKEND_URL;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Terminal client and request router for the Groq chat gateway", long_about = None)]
pub struct Args {
    /// Origin of the chat gateway that /chat requests are forwarded to.
    #[arg(long, env = "BACKEND_URL", default_value = DEFAULT_BACKEND_URL, global = true)]
    pub backend_url: String,

    /// Base URL the client sends its requests to (e.g. a running router). Defaults to BACKEND_URL.
    #[arg(long, env = "API_URL", global = true)]
    pub api_url: Option<String>,

    /// Host address and port for the router to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:3000", global = true)]
    pub server_addr: String,

    /// Write logs to this file. The interactive view stays silent without it.
    #[arg(long, env = "LOG_FILE", global = true)]
    pub log_file: Option<String>,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the request router in front of the chat gateway
    Serve,
    /// Open the interactive conversation view (default)
    Chat,
    /// Print the current conversation
    History,
    /// Send one message and print the conversation
    Send {
        /// The message to send
        message: String,
    },
    /// Clear the conversation history
    Reset,
}

/// Where log records are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSink<'a> {
    File(&'a str),
    /// The interactive view owns the terminal.
    Discard,
    Stderr,
}

impl Args {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Chat)
    }

    pub fn api_base_url(&self) -> &str {
        match self.api_url.as_deref() {
            Some(url) if !url.trim().is_empty() => url,
            _ => &self.backend_url,
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.command() == Command::Chat
    }

    pub fn log_sink(&self) -> LogSink<'_> {
        match self.log_file.as_deref() {
            Some(path) => LogSink::File(path),
            None if self.is_interactive() => LogSink::Discard,
            None => LogSink::Stderr,
        }
    }
}
