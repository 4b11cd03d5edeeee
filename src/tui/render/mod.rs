pub mod board;
pub mod detail;
pub mod doc;
pub mod edit;
pub mod header;
mod helpers;
pub mod status_row;
pub mod tab_bar;
#[cfg(test)]
pub mod test_helpers;

use chrono::Utc;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::Style;
use ratatui::widgets::Block;

use super::app::App;
use super::theme::Theme;
use super::views::{DocView, View};

/// Draw the whole screen: header, tabs, active view and status row
pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    // Background fill
    let bg_style = Style::default().bg(app.theme().background);
    frame.render_widget(Block::default().style(bg_style), area);

    // Layout: header | tab bar (2 rows) | content | status row (1 row)
    let header_height = if app.header.visible {
        header::HEADER_HEIGHT
    } else {
        0
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(header_height),
            Constraint::Length(2), // tab bar + separator
            Constraint::Min(1),    // content area
            Constraint::Length(1), // status row
        ])
        .split(area);

    if app.header.visible {
        header::render_header(frame, app, chunks[0]);
    }
    tab_bar::render_tab_bar(frame, app, chunks[1]);

    let now = Utc::now();
    let theme = &app.ctx.theme;
    match &mut app.view {
        View::Board(v) => board::render_board(frame, v, theme, now, chunks[2]),
        View::Detail(v) => detail::render_detail(frame, v, theme, chunks[2]),
        View::Edit(v) => edit::render_edit(frame, v, theme, chunks[2]),
        View::Doc(v) => doc::render_doc(frame, v, theme, chunks[2]),
    }

    status_row::render_status_row(frame, app, chunks[3]);
}

/// Layout for the standalone document viewer: text and a status row
pub fn render_viewer(frame: &mut Frame, view: &mut DocView, theme: &Theme) {
    let area = frame.area();
    frame.render_widget(Block::default().style(Style::default().bg(theme.background)), area);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);
    doc::render_doc(frame, view, theme, chunks[0]);
    let name = view.name().to_string();
    status_row::render_viewer_status(frame, &name, theme, chunks[1]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ticket::Status;
    use test_helpers::{render_app, render_to_string, seed_ticket, test_app};

    #[test]
    fn full_screen_has_header_tabs_and_board() {
        let (_dir, mut app) = test_app();
        let out = render_app(&mut app);
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].contains("tiki"));
        assert!(lines[0].contains("0 tickets"));
        assert!(lines[3 + 1].contains("Kanban"));
        assert!(out.contains("Backlog (0)"));
    }

    #[test]
    fn hidden_header_moves_tabs_to_top() {
        let (_dir, mut app) = test_app();
        app.header.toggle();
        let visible = app.header.visible;
        let out = render_app(&mut app);
        let first = out.lines().next().unwrap_or_default();
        assert_eq!(first.contains("Kanban"), !visible);
    }

    #[test]
    fn status_message_in_last_row() {
        let (_dir, mut app) = test_app();
        app.status = Some(crate::tui::app::StatusMessage {
            text: "saved TIKI-ABC123".into(),
            is_error: false,
        });
        let out = render_app(&mut app);
        assert!(out.lines().last().unwrap_or_default().contains("saved TIKI-ABC123"));
    }

    #[test]
    fn seeded_ticket_lands_in_its_lane() {
        let (_dir, mut app) = test_app();
        seed_ticket(&mut app, "Write docs", Status::Ready);
        let out = render_app(&mut app);
        assert!(out.contains("Ready (1)"), "{}", out);
        assert!(out.contains("Write docs"));
        assert!(out.contains("Backlog (0)"));
    }

    #[test]
    fn viewer_shows_name_and_text() {
        let mut view = DocView::new("notes.md", "hello world".into());
        let out = render_to_string(50, 4, |frame, _| {
            render_viewer(frame, &mut view, &Theme::dark())
        });
        assert!(out.starts_with(" hello world"));
        assert!(out.contains("notes.md"));
        assert!(out.contains("q quit"));
    }
}
