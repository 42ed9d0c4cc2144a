use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Frame,
};

use crate::models::{DeliveryStatus, MessageRole, TabType};
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Chat tabs
            Constraint::Min(0),    // Messages
            Constraint::Length(1), // Error / status line
            Constraint::Length(3), // Input
        ])
        .split(area);

    draw_tabs(f, app, chunks[0]);
    draw_messages(f, app, chunks[1]);
    draw_status(f, app, chunks[2]);
    draw_input(f, app, chunks[3]);
}

fn draw_tabs(f: &mut Frame, app: &App, area: Rect) {
    let active = app.store.active_tab();
    let titles: Vec<Line> = app
        .tab_badges
        .iter()
        .map(|badge| {
            let marker = if badge.unresolved { " •" } else { "" };
            Line::from(format!("{} ({}){}", badge.tab.label(), badge.count, marker))
        })
        .collect();
    let selected = TabType::ALL.iter().position(|t| *t == active).unwrap_or(0);

    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL))
        .select(selected)
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(tabs, area);
}

fn draw_messages(f: &mut Frame, app: &App, area: Rect) {
    let tab = app.store.active_tab();
    let mut lines: Vec<Line> = Vec::new();

    for message in app.store.messages(tab) {
        let (who, color) = match message.role {
            MessageRole::User => ("You", Color::Cyan),
            MessageRole::Assistant => ("Tutor", Color::Green),
        };
        let status = match message.status {
            DeliveryStatus::Pending => Span::styled(" sending…", Style::default().fg(Color::DarkGray)),
            DeliveryStatus::Failed => Span::styled(" failed, press r", Style::default().fg(Color::Red)),
            DeliveryStatus::Sent => Span::raw(""),
        };
        lines.push(Line::from(vec![
            Span::styled(
                format!("{} ", message.timestamp.format("%H:%M")),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled(who, Style::default().fg(color).add_modifier(Modifier::BOLD)),
            status,
        ]));
        for text in message.content.lines() {
            lines.push(Line::from(format!("  {}", text)));
        }
        lines.push(Line::from(""));
    }

    // Keep the newest messages in view
    let visible = area.height.saturating_sub(2) as usize;
    let skip = lines.len().saturating_sub(visible);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", tab.label()))
        .title_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(lines.into_iter().skip(skip).collect::<Vec<_>>())
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn draw_status(f: &mut Frame, app: &App, area: Rect) {
    let line = if let Some(notice) = &app.notice {
        Line::from(Span::styled(notice.as_str(), Style::default().fg(Color::Yellow)))
    } else if let Some(error) = app.store.error(app.store.active_tab()) {
        Line::from(Span::styled(error, Style::default().fg(Color::Red)))
    } else if app.loading {
        Line::from(Span::styled("Waiting for the tutor…", Style::default().fg(Color::DarkGray)))
    } else {
        Line::from("")
    };
    f.render_widget(Paragraph::new(line), area);
}

fn draw_input(f: &mut Frame, app: &App, area: Rect) {
    let (text, style) = if app.input_mode {
        (format!("{}█", app.input), Style::default().fg(Color::White))
    } else if app.input.is_empty() {
        ("Press i to type a message".to_string(), Style::default().fg(Color::DarkGray))
    } else {
        (app.input.clone(), Style::default().fg(Color::Gray))
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Message ")
        .border_style(if app.input_mode {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        });

    f.render_widget(Paragraph::new(text).style(style).block(block), area);
}
