use ratatui::prelude::*;
use ratatui::widgets::{ Block, Borders, Paragraph };
use ratatui::Frame;

use crate::conversation::{ NotificationKind, ViewState };
use crate::models::chat::{ Message, Role };
use crate::tui::app::App;

const TITLE: &str = "Groq Chat Assistant";
const PLACEHOLDER: &str = "Type your message...";
const HINTS: &str = "Enter: send │ Ctrl+R: reset chat │ Esc: quit";
const INDENT: &str = "   ";

pub fn render(f: &mut Frame, app: &App) {
    let chunks = Layout::vertical([
        Constraint::Length(1), // Header
        Constraint::Min(1),    // Messages
        Constraint::Length(1), // Status line
        Constraint::Length(2), // Input
    ])
    .split(f.area());

    render_header(f, chunks[0], app);
    render_messages(f, chunks[1], app);
    render_status(f, chunks[2], app);
    render_input(f, chunks[3], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let reset_style = if app.is_locked() {
        Style::default().dim()
    } else {
        Style::default().bold()
    };
    let line = Line::from(vec![
        Span::styled(format!(" {} ", TITLE), Style::default().bold()),
        Span::raw(" "),
        Span::styled("[Ctrl+R Reset Chat]", reset_style),
    ]);
    let para = Paragraph::new(line).style(Style::default().fg(Color::White).bg(Color::Blue));
    f.render_widget(para, area);
}

fn bubble_lines(msg: &Message) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut content: Vec<&str> = msg.content.lines().collect();
    if content.is_empty() {
        content.push("");
    }

    match msg.role {
        Role::User => {
            let bubble = Style::default().fg(Color::White).bg(Color::Blue);
            let label = Style::default().fg(Color::Blue).bold();
            for (i, text) in content.iter().enumerate() {
                let tag = if i == 0 { msg.role.label().to_string() } else { " ".repeat(msg.role.label().len()) };
                lines.push(
                    Line::from(vec![
                        Span::styled(text.to_string(), bubble),
                        Span::raw(" "),
                        Span::styled(tag, label),
                    ]).alignment(Alignment::Right)
                );
            }
            lines.push(
                Line::from(Span::styled(msg.display_timestamp(), Style::default().dim()))
                    .alignment(Alignment::Right)
            );
        }
        Role::Assistant | Role::System => {
            let bubble = Style::default().fg(Color::Black).bg(Color::Gray);
            let label = Style::default().fg(Color::Gray).bold();
            for (i, text) in content.iter().enumerate() {
                let tag = if i == 0 { format!("{:<2}", msg.role.label()) } else { "  ".to_string() };
                lines.push(
                    Line::from(vec![
                        Span::styled(tag, label),
                        Span::raw(" "),
                        Span::styled(text.to_string(), bubble),
                    ])
                );
            }
            lines.push(
                Line::from(Span::styled(format!("{}{}", INDENT, msg.display_timestamp()), Style::default().dim()))
            );
        }
    }
    lines
}

fn render_messages(f: &mut Frame, area: Rect, app: &App) {
    let mut lines: Vec<Line> = vec![];

    if app.conversation.state() == ViewState::LoadingHistory {
        lines.push(Line::from(""));
        lines.push(
            Line::from(Span::styled(
                format!("{} Loading history...", app.throbber_char()),
                Style::default().fg(Color::Blue)
            )).alignment(Alignment::Center)
        );
        f.render_widget(Paragraph::new(lines), area);
        return;
    }

    let messages = app.conversation.messages();
    if messages.is_empty() && app.conversation.state() != ViewState::Sending {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Start a conversation", Style::default().bold())).alignment(Alignment::Center));
        lines.push(
            Line::from(Span::styled(
                "Send a message to start chatting with the Groq assistant.",
                Style::default().dim()
            )).alignment(Alignment::Center)
        );
        f.render_widget(Paragraph::new(lines), area);
        return;
    }

    for msg in messages {
        lines.extend(bubble_lines(msg));
        lines.push(Line::from(""));
    }

    // Typing indicator
    if app.conversation.state() == ViewState::Sending {
        lines.push(
            Line::from(vec![
                Span::styled("AI", Style::default().fg(Color::DarkGray).bold()),
                Span::raw(" "),
                Span::styled(format!(" {} ", app.throbber_char()), Style::default().bg(Color::Gray)),
            ])
        );
    }

    // scroll_offset=0 shows the newest lines, higher values scroll up
    let total_lines = lines.len() as u16;
    let max_scroll = total_lines.saturating_sub(area.height);
    let actual_scroll = max_scroll.saturating_sub(app.scroll_offset as u16);

    f.render_widget(Paragraph::new(lines).scroll((actual_scroll, 0)), area);
}

fn render_status(f: &mut Frame, area: Rect, app: &App) {
    let line = match &app.notice {
        Some(notice) => {
            let style = match notice.kind {
                NotificationKind::Error => Style::default().red(),
                NotificationKind::Success => Style::default().green(),
            };
            Line::from(vec![
                Span::styled(format!(" {}: ", notice.title), style.bold()),
                Span::styled(notice.description.clone(), style),
            ])
        }
        None => {
            let state = match app.conversation.state() {
                ViewState::Idle => "",
                ViewState::LoadingHistory => "loading │ ",
                ViewState::Sending => "sending │ ",
                ViewState::Resetting => "resetting │ ",
            };
            Line::from(Span::styled(format!(" {}{}", state, HINTS), Style::default().dim()))
        }
    };
    f.render_widget(Paragraph::new(line), area);
}

fn render_input(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);

    let (text, style) = if app.input.is_empty() {
        (PLACEHOLDER.to_string(), Style::default().dim())
    } else if app.is_locked() {
        (app.input.clone(), Style::default().dim())
    } else {
        (app.input.clone(), Style::default())
    };

    let prompt_style = if app.can_submit() { Style::default().bold() } else { Style::default().dim() };
    let line = Line::from(vec![Span::styled("❯ ", prompt_style), Span::styled(text, style)]);
    f.render_widget(Paragraph::new(line).block(block), area);

    if !app.is_locked() {
        let x = inner.x + 2 + (app.input.chars().count() as u16);
        f.set_cursor_position(Position::new(x.min(inner.right().saturating_sub(1)), inner.y));
    }
}
