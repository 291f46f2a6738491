pub mod app;
pub mod ui;

use crate::api::ChatApi;
use app::{ Action, App, Settlement };
use crossterm::event::{ Event, EventStream, KeyEventKind };
use futures::StreamExt;
use log::{ debug, info };
use ratatui::DefaultTerminal;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{ self, UnboundedSender };

const TICK_RATE: Duration = Duration::from_millis(120);

/// Runs the interactive conversation view until the user quits.
pub async fn run(api: Arc<dyn ChatApi>) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, api).await;
    ratatui::restore();
    result
}

async fn event_loop(
    terminal: &mut DefaultTerminal,
    api: Arc<dyn ChatApi>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Settlement>();
    let mut app = App::new();
    let mut events = EventStream::new();
    let mut tick = tokio::time::interval(TICK_RATE);

    if app.conversation.begin_load() {
        spawn_history(api.clone(), tx.clone(), None);
    }

    loop {
        terminal.draw(|f| ui::render(f, &app))?;

        tokio::select! {
            _ = tick.tick() => app.tick(),
            Some(settlement) = rx.recv() => {
                if app.settle(settlement) {
                    let generation = app.issue_refresh();
                    spawn_history(api.clone(), tx.clone(), Some(generation));
                }
            }
            event = events.next() => {
                match event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        match app.handle_key(key) {
                            Some(Action::Quit) => break,
                            Some(Action::Submit) => {
                                if let Some(text) = app.begin_submit() {
                                    spawn_send(api.clone(), tx.clone(), text);
                                }
                            }
                            Some(Action::Reset) => {
                                if app.begin_reset() {
                                    spawn_reset(api.clone(), tx.clone());
                                }
                            }
                            None => {}
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                }
            }
        }
    }

    info!("Conversation view closed");
    Ok(())
}

/// Fetches history; `refresh` carries the generation of a follow-up refresh.
fn spawn_history(api: Arc<dyn ChatApi>, tx: UnboundedSender<Settlement>, refresh: Option<u64>) {
    tokio::spawn(async move {
        let result = api.fetch_history().await;
        let settlement = match refresh {
            Some(generation) => Settlement::Refresh(generation, result),
            None => Settlement::History(result),
        };
        if tx.send(settlement).is_err() {
            debug!("View closed before history settled");
        }
    });
}

fn spawn_send(api: Arc<dyn ChatApi>, tx: UnboundedSender<Settlement>, text: String) {
    tokio::spawn(async move {
        let result = api.send_message(&text).await;
        if tx.send(Settlement::Sent(result)).is_err() {
            debug!("View closed before send settled");
        }
    });
}

fn spawn_reset(api: Arc<dyn ChatApi>, tx: UnboundedSender<Settlement>) {
    tokio::spawn(async move {
        let result = api.reset_history().await;
        if tx.send(Settlement::Reset(result)).is_err() {
            debug!("View closed before reset settled");
        }
    });
}
