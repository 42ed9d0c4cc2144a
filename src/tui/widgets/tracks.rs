use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::display::{format_duration, progress_bar, truncate};
use crate::models::TrackStatus;
use crate::progress;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    draw_list(f, app, chunks[0]);
    draw_detail(f, app, chunks[1]);
}

fn status_color(status: TrackStatus) -> Color {
    match status {
        TrackStatus::NotStarted => Color::DarkGray,
        TrackStatus::InProgress => Color::Yellow,
        TrackStatus::Completed => Color::Green,
    }
}

fn draw_list(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .tracks
        .items
        .iter()
        .filter_map(|id| app.store.track(id))
        .map(|track| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<18}", truncate(&track.track_id, 16)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    progress_bar(track.overall_progress, 10),
                    Style::default().fg(Color::Green),
                ),
                Span::styled(
                    format!(" {:>3}%", track.overall_progress),
                    Style::default().fg(status_color(track.status)),
                ),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Tracks ")
                .title_style(Style::default().fg(Color::Cyan)),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.tracks.selected);
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_detail(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Detail ")
        .title_style(Style::default().fg(Color::Cyan));

    let Some(track) = app.selected_track().and_then(|id| app.store.track(id)) else {
        let hint = Paragraph::new("No tracks yet. Enroll with `tutor track enroll`.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(hint, area);
        return;
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                track.track_id.clone(),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {}", track.status.label()),
                Style::default().fg(status_color(track.status)),
            ),
        ]),
        Line::from(format!(
            "{} of {} lessons, {} studied",
            track.completed_lessons.len(),
            track.total_lessons,
            format_duration(track.time_spent_ms)
        )),
    ];

    let forecast = match progress::predicted_completion(app.store, &track.track_id) {
        Ok(p) if p.days_remaining == 0 => {
            format!("Finished {}", p.estimated_completion.format("%b %d"))
        }
        Ok(p) => format!(
            "On pace to finish {} ({} days)",
            p.estimated_completion.format("%b %d"),
            p.days_remaining
        ),
        Err(_) => "Not enough activity to forecast yet".to_string(),
    };
    lines.push(Line::from(Span::styled(forecast, Style::default().fg(Color::Cyan))));

    let insights = progress::strengths_and_weaknesses(app.store, app.progress_config());
    if insights.strengths.iter().any(|s| s.track_id == track.track_id) {
        lines.push(Line::from(Span::styled("Strength", Style::default().fg(Color::Green))));
    } else if insights.weaknesses.iter().any(|w| w.track_id == track.track_id) {
        lines.push(Line::from(Span::styled(
            "Needs review",
            Style::default().fg(Color::Red),
        )));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Lessons",
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )));
    for lesson in app.store.lessons_for(&track.track_id) {
        let score = lesson
            .average_score()
            .map(|s| format!("avg {:.0}", s))
            .unwrap_or_default();
        let mut spans = vec![
            Span::styled(
                format!("{:<16}", truncate(&lesson.lesson_id, 14)),
                Style::default().fg(Color::White),
            ),
            Span::styled(
                format!("{:>3}% ", lesson.percentage),
                Style::default().fg(if lesson.completed_at.is_some() {
                    Color::Green
                } else {
                    Color::Yellow
                }),
            ),
            Span::styled(score, Style::default().fg(Color::Cyan)),
        ];
        if !lesson.bookmarks.is_empty() {
            spans.push(Span::styled(
                format!("  [{}]", lesson.bookmarks.join(", ")),
                Style::default().fg(Color::Magenta),
            ));
        }
        lines.push(Line::from(spans));
    }

    f.render_widget(Paragraph::new(lines).block(block), area);
}
