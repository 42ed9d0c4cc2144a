use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use super::widgets::{chat, dashboard, tracks};
use super::{App, View};

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // View bar
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Help bar
        ])
        .split(f.area());

    draw_views(f, app, chunks[0]);
    draw_content(f, app, chunks[1]);
    draw_help_bar(f, app, chunks[2]);
}

fn draw_views(f: &mut Frame, app: &App, area: Rect) {
    let titles = vec!["Dashboard", "Chat", "Tracks"];
    let selected = match app.view {
        View::Dashboard => 0,
        View::Chat => 1,
        View::Tracks => 2,
    };

    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title(" Tutor "))
        .select(selected)
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    f.render_widget(tabs, area);
}

fn draw_content(f: &mut Frame, app: &App, area: Rect) {
    match app.view {
        View::Dashboard => dashboard::draw(f, app, area),
        View::Chat => chat::draw(f, app, area),
        View::Tracks => tracks::draw(f, app, area),
    }
}

fn key(text: &str) -> Span<'_> {
    Span::styled(text, Style::default().fg(Color::Cyan))
}

fn draw_help_bar(f: &mut Frame, app: &App, area: Rect) {
    let help_text = if app.input_mode {
        vec![
            key("<CR>"),
            Span::raw(" Send  "),
            key("<Esc>"),
            Span::raw(" Stop typing"),
        ]
    } else {
        let mut spans = vec![key("h/l"), Span::raw(" Views  ")];

        match app.view {
            View::Dashboard => {
                spans.extend(vec![key("^r"), Span::raw(" Refresh  ")]);
            }
            View::Chat => {
                spans.extend(vec![
                    key("1-4/<Tab>"),
                    Span::raw(" Chat tab  "),
                    key("i"),
                    Span::raw(" Type  "),
                    key("r"),
                    Span::raw(" Retry  "),
                    key("<Esc>"),
                    Span::raw(" Dismiss  "),
                    key("^r"),
                    Span::raw(" Reload  "),
                ]);
            }
            View::Tracks => {
                spans.extend(vec![key("j/k"), Span::raw(" Nav  ")]);
            }
        }

        spans.extend(vec![key("q"), Span::raw(" Quit")]);
        spans
    };

    let help = Paragraph::new(Line::from(help_text)).style(Style::default().bg(Color::DarkGray));

    f.render_widget(help, area);
}
