use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::tui::app::App;
use crate::tui::views::View;

use super::helpers::spans_width;

/// Render the plugin tabs with a separator line below
pub fn render_tab_bar(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // tabs
            Constraint::Length(1), // separator
        ])
        .split(area);

    let sep_cols = render_tabs(frame, app, chunks[0]);
    render_separator(frame, app, chunks[1], &sep_cols);
}

/// Render tabs and return the column positions of each separator character.
fn render_tabs(frame: &mut Frame, app: &App, area: Rect) -> Vec<usize> {
    let theme = app.theme();
    let bg = theme.background;
    let mut spans: Vec<Span> = Vec::new();
    let mut sep_cols: Vec<usize> = Vec::new();
    let sep = Span::styled("\u{2502}", Style::default().fg(theme.dim).bg(bg));

    spans.push(Span::styled(" ", Style::default().bg(bg)));
    spans.push(Span::styled("\u{25B6}", Style::default().fg(theme.purple).bg(bg)));
    spans.push(Span::styled(" ", Style::default().bg(bg)));

    for plugin in &app.ctx.plugins.plugins {
        let is_current = plugin.name.eq_ignore_ascii_case(app.current_plugin());
        spans.push(Span::styled(
            format!(" {} ", plugin.name),
            tab_style(app, is_current),
        ));
        sep_cols.push(spans_width(&spans));
        spans.push(sep.clone());
    }

    let tabs = Paragraph::new(Line::from(spans)).style(Style::default().bg(bg));
    frame.render_widget(tabs, area);
    sep_cols
}

/// Indicator text for the right end of the separator: view mode and search
fn board_indicator(app: &App) -> Vec<Span<'static>> {
    let theme = app.theme();
    let bg = theme.background;
    let View::Board(board) = &app.view else {
        return Vec::new();
    };
    let mut spans = Vec::new();
    if let Some(query) = board.config().search().query() {
        spans.push(Span::styled("search: ", Style::default().fg(theme.purple).bg(bg)));
        spans.push(Span::styled(
            query.to_string(),
            Style::default().fg(theme.text_bright).bg(bg),
        ));
        spans.push(Span::styled(" ", Style::default().bg(bg)));
    }
    spans.push(Span::styled(
        board.config().view_mode().as_str(),
        Style::default().fg(theme.dim).bg(bg),
    ));
    spans
}

fn render_separator(frame: &mut Frame, app: &App, area: Rect, sep_cols: &[usize]) {
    let width = area.width as usize;
    let bg = app.theme().background;
    let dim = app.theme().dim;

    let indicator = board_indicator(app);
    let indicator_width = spans_width(&indicator);
    // One space before the indicator, one after
    let separator_end = if indicator.is_empty() {
        width
    } else {
        width.saturating_sub(indicator_width + 2)
    };

    let mut sep_text = String::with_capacity(separator_end * 3);
    for col in 0..separator_end {
        if sep_cols.contains(&col) {
            sep_text.push('\u{2534}');
        } else {
            sep_text.push('\u{2500}');
        }
    }
    let mut spans = vec![Span::styled(sep_text, Style::default().fg(dim).bg(bg))];
    if !indicator.is_empty() && separator_end > 0 {
        spans.push(Span::styled(" ", Style::default().bg(bg)));
        spans.extend(indicator);
        spans.push(Span::styled(" ", Style::default().bg(bg)));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(bg)),
        area,
    );
}

/// Style for a tab: highlighted if current, normal otherwise
fn tab_style(app: &App, is_current: bool) -> Style {
    let theme = app.theme();
    if is_current {
        Style::default()
            .fg(theme.text_bright)
            .bg(theme.selection_bg)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.text).bg(theme.background)
    }
}
