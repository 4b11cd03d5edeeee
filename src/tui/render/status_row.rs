use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::tui::app::App;
use crate::tui::theme::Theme;
use crate::tui::views::View;
use crate::tui::views::board::BoardInput;

use super::helpers::push_right_hint;

const CURSOR: &str = "\u{258C}";

/// Prompt line with a cursor and a right-aligned hint
fn prompt_line(prompt: String, hint: &str, theme: &Theme, width: usize) -> Line<'static> {
    let bg = theme.background;
    let mut spans = vec![
        Span::styled(prompt, Style::default().fg(theme.text_bright).bg(bg)),
        Span::styled(CURSOR, Style::default().fg(theme.highlight).bg(bg)),
    ];
    push_right_hint(&mut spans, hint, width, Style::default().fg(theme.dim).bg(bg), bg);
    Line::from(spans)
}

/// Render the status row (bottom of screen)
pub fn render_status_row(frame: &mut Frame, app: &App, area: Rect) {
    let theme = app.theme();
    let bg = theme.background;
    let width = area.width as usize;

    let prompt = match &app.view {
        View::Board(board) => match board.input() {
            BoardInput::Search(query) => Some(prompt_line(
                format!("/{}", query),
                "Enter search  Esc cancel",
                theme,
                width,
            )),
            BoardInput::ConfirmDelete(id) => Some(Line::from(Span::styled(
                format!("delete {}? y to confirm, any other key cancels", id),
                Style::default().fg(theme.red).bg(bg),
            ))),
            BoardInput::None => None,
        },
        View::Detail(detail) => detail.comment_input().map(|comment| {
            prompt_line(
                format!("comment: {}", comment),
                "Enter add  Esc cancel",
                theme,
                width,
            )
        }),
        _ => None,
    };
    let line = prompt.unwrap_or_else(|| match &app.status {
        Some(status) => {
            let color = if status.is_error { theme.red } else { theme.text };
            Line::from(Span::styled(
                status.text.clone(),
                Style::default().fg(color).bg(bg),
            ))
        }
        None => Line::from(Span::styled(" ".repeat(width), Style::default().bg(bg))),
    });

    let paragraph = Paragraph::new(line).style(Style::default().bg(bg));
    frame.render_widget(paragraph, area);
}

/// Status row for the standalone document viewer
pub fn render_viewer_status(frame: &mut Frame, name: &str, theme: &Theme, area: Rect) {
    let bg = theme.background;
    let mut spans = vec![Span::styled(
        format!(" {}", name),
        Style::default().fg(theme.text_bright).bg(bg),
    )];
    push_right_hint(
        &mut spans,
        "j/k scroll  PgUp/PgDn page  q quit ",
        area.width as usize,
        Style::default().fg(theme.dim).bg(bg),
        bg,
    );
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(bg)),
        area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::app::StatusMessage;
    use crate::tui::render::test_helpers::{render_to_string, test_app};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    #[test]
    fn search_prompt_replaces_status() {
        let (_dir, mut app) = test_app();
        app.status = Some(StatusMessage {
            text: "old news".into(),
            is_error: false,
        });
        app.handle_key(KeyEvent::new(KeyCode::Char('/'), KeyModifiers::NONE));
        app.handle_key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE));

        let out = render_to_string(60, 1, |frame, area| render_status_row(frame, &app, area));
        assert!(out.starts_with("/x"));
        assert!(out.contains("Esc cancel"));
        assert!(!out.contains("old news"));
    }

    #[test]
    fn error_status_is_shown() {
        let (_dir, mut app) = test_app();
        app.status = Some(StatusMessage {
            text: "could not save".into(),
            is_error: true,
        });
        let out = render_to_string(60, 1, |frame, area| render_status_row(frame, &app, area));
        assert_eq!(out, "could not save");
    }
}
