use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph},
    Frame,
};

use crate::display::{format_duration, progress_bar, truncate};
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Overall gauge
            Constraint::Length(9), // Stats + milestones row
            Constraint::Min(0),    // Weekly + achievements row
        ])
        .split(area);

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[2]);

    draw_overall(f, app, chunks[0]);
    draw_stats(f, app, top[0]);
    draw_milestones(f, app, top[1]);
    draw_weeks(f, app, bottom[0]);
    draw_achievements(f, app, bottom[1]);
}

fn draw_overall(f: &mut Frame, app: &App, area: Rect) {
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" Overall Progress "))
        .gauge_style(Style::default().fg(Color::Green))
        .percent(app.summary.overall_progress as u16);
    f.render_widget(gauge, area);
}

fn stat_line(label: &str, value: String, color: Color) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{}: ", label), Style::default().fg(Color::Gray)),
        Span::styled(value, Style::default().fg(color)),
    ])
}

fn draw_stats(f: &mut Frame, app: &App, area: Rect) {
    let s = &app.summary;
    let streak_color = if s.current_streak > 0 {
        Color::Yellow
    } else {
        Color::White
    };

    let text = vec![
        Line::from(vec![
            Span::styled("Tracks: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", s.tracks_enrolled),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        stat_line("Completed", s.tracks_completed.to_string(), Color::Green),
        stat_line("Lessons", s.lessons_completed.to_string(), Color::White),
        stat_line("Streak", format!("{} days", s.current_streak), streak_color),
        stat_line("Study time", format_duration(s.total_time_ms), Color::Cyan),
        stat_line("Points", s.achievement_points.to_string(), Color::Magenta),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Stats ")
        .title_style(Style::default().fg(Color::Cyan));

    f.render_widget(Paragraph::new(text).block(block), area);
}

fn draw_milestones(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .milestones
        .iter()
        .map(|m| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<18}", truncate(&m.track_id, 16)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(progress_bar(m.current, 10), Style::default().fg(Color::Green)),
                Span::styled(
                    format!(" {}% -> {}% ", m.current, m.target),
                    Style::default().fg(Color::Yellow),
                ),
                Span::styled(
                    format!("({} lessons)", m.lessons_remaining),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Next Milestones ")
        .title_style(Style::default().fg(Color::Yellow));

    f.render_widget(List::new(items).block(block), area);
}

fn draw_weeks(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .weeks
        .iter()
        .rev()
        .take(6)
        .map(|w| {
            let score = w
                .average_score
                .map(|s| format!("{:.0}", s))
                .unwrap_or_else(|| "-".to_string());
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<10}", w.week_start.format("%b %d")),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    format!("{:>3} lessons  ", w.lessons_completed),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("{:>7}  ", format_duration(w.time_spent_ms)),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(format!("avg {}", score), Style::default().fg(Color::Yellow)),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Weekly Activity ")
        .title_style(Style::default().fg(Color::Magenta));

    f.render_widget(List::new(items).block(block), area);
}

fn draw_achievements(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .store
        .achievements()
        .iter()
        .rev()
        .map(|a| {
            let color = match a.rarity {
                crate::models::Rarity::Common => Color::White,
                crate::models::Rarity::Rare => Color::Cyan,
                crate::models::Rarity::Epic => Color::Magenta,
                crate::models::Rarity::Legendary => Color::Yellow,
            };
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<8}", a.earned_at.format("%b %d")),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(a.title.clone(), Style::default().fg(color)),
                Span::styled(
                    format!(" +{}", a.points),
                    Style::default().fg(Color::Green),
                ),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Achievements ")
        .title_style(Style::default().fg(Color::Green));

    f.render_widget(List::new(items).block(block), area);
}
