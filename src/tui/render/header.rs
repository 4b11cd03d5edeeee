use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Sparkline};

use crate::model::ticket::Status;
use crate::ops::burndown::WINDOW_DAYS;
use crate::tui::app::App;
use crate::tui::header::HistoryStatus;

use super::helpers::spans_width;

/// Rows taken by the header when visible
pub const HEADER_HEIGHT: u16 = 4;

/// Width of the burndown column
const CHART_WIDTH: u16 = 30;

/// Render ticket stats, key hints and the burndown sparkline
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(CHART_WIDTH)])
        .split(area);

    render_stats(frame, app, chunks[0]);
    render_burndown(frame, app, chunks[1]);
}

fn render_stats(frame: &mut Frame, app: &App, area: Rect) {
    let theme = app.theme();
    let bg = theme.background;
    let stats = &app.header.stats;

    let title = Line::from(vec![
        Span::styled(
            " tiki ",
            Style::default()
                .fg(theme.purple)
                .bg(bg)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(
                " {} tickets  {} active  {} pts",
                stats.total, stats.active, stats.active_points
            ),
            Style::default().fg(theme.text).bg(bg),
        ),
    ]);

    let mut counts: Vec<Span> = vec![Span::styled(" ", Style::default().bg(bg))];
    for status in Status::ALL {
        counts.push(Span::styled(
            format!(" {} {} ", status.label(), stats.count(status)),
            Style::default().fg(theme.status_color(status)).bg(bg),
        ));
    }

    // Key hints, cut at the first one that no longer fits
    let registry = app.registry();
    let width = area.width as usize;
    let mut hints: Vec<Span> = vec![Span::styled(" ", Style::default().bg(bg))];
    for action in registry.header_actions() {
        let key = Span::styled(
            format!(" {}", action.binding()),
            Style::default().fg(theme.highlight).bg(bg),
        );
        let label = Span::styled(
            format!(" {} ", action.label),
            Style::default().fg(theme.dim).bg(bg),
        );
        if spans_width(&hints) + spans_width(&[key.clone(), label.clone()]) > width {
            break;
        }
        hints.push(key);
        hints.push(label);
    }

    let paragraph = Paragraph::new(vec![title, Line::from(counts), Line::from(hints)])
        .style(Style::default().bg(bg));
    frame.render_widget(paragraph, area);
}

fn render_burndown(frame: &mut Frame, app: &App, area: Rect) {
    let theme = app.theme();
    let bg = theme.background;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(area);

    let caption = match &app.header.history {
        HistoryStatus::Loading => "burndown: loading\u{2026}".to_string(),
        HistoryStatus::Failed(_) => "burndown: unavailable".to_string(),
        HistoryStatus::Ready(_) => format!(
            "burndown {}d, {} moves",
            WINDOW_DAYS,
            app.header.event_count()
        ),
    };
    frame.render_widget(
        Paragraph::new(caption).style(Style::default().fg(theme.dim).bg(bg)),
        chunks[0],
    );

    let series = app.header.series();
    if !series.is_empty() {
        let sparkline = Sparkline::default()
            .data(&series)
            .style(Style::default().fg(theme.cyan).bg(bg));
        frame.render_widget(sparkline, chunks[1]);
    }
}
