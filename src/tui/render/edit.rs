use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::tui::theme::Theme;
use crate::tui::views::EditView;
use crate::tui::views::edit::{EditField, FieldKind};

use super::helpers::wrap_plain;

const LABEL_WIDTH: usize = 12;
const CURSOR: &str = "\u{258C}";

/// Display value of a field in the draft
fn field_value(view: &EditView, field: EditField) -> String {
    let draft = view.draft();
    match field {
        EditField::Title => draft.title.clone(),
        EditField::Status => draft.status.label().to_string(),
        EditField::Type => draft.ticket_type.as_str().to_string(),
        EditField::Priority => draft.priority.to_string(),
        EditField::Assignee => draft.assignee.clone(),
        EditField::Points => draft.points.to_string(),
        EditField::Description => draft.body.clone(),
    }
}

/// Form with one row per field; the description fills the rest
pub fn render_edit(frame: &mut Frame, view: &EditView, theme: &Theme, area: Rect) {
    let bg = theme.background;
    let width = area.width as usize;
    let mut lines: Vec<Line> = Vec::new();

    let heading = if view.is_new() {
        " New ticket".to_string()
    } else {
        format!(" Edit {}", view.ticket_id())
    };
    lines.push(Line::from(Span::styled(
        heading,
        Style::default()
            .fg(theme.text_bright)
            .add_modifier(Modifier::BOLD),
    )));
    if view.in_conflict() {
        lines.push(Line::from(Span::styled(
            " changed on disk: Ctrl-S overwrites, Ctrl-R reloads",
            Style::default().fg(theme.red),
        )));
    } else {
        lines.push(Line::default());
    }

    for field in EditField::ALL {
        let focused = view.focus() == field;
        let label_style = if focused {
            Style::default().fg(theme.highlight).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.dim)
        };
        let value_style = if focused {
            Style::default().fg(theme.text_bright).bg(theme.selection_bg)
        } else {
            Style::default().fg(theme.text)
        };
        let label = Span::styled(
            format!(" {:<width$}", field.label(), width = LABEL_WIDTH),
            label_style,
        );
        let value = field_value(view, field);

        match field.kind() {
            FieldKind::Multiline => {
                lines.push(Line::from(label));
                let body_width = width.saturating_sub(3);
                let mut body = wrap_plain(&value, body_width);
                if body.is_empty() {
                    body.push(String::new());
                }
                let last = body.len() - 1;
                for (i, l) in body.into_iter().enumerate() {
                    let mut spans = vec![Span::raw("   "), Span::styled(l, value_style)];
                    if focused && i == last {
                        spans.push(Span::styled(CURSOR, Style::default().fg(theme.highlight)));
                    }
                    lines.push(Line::from(spans));
                }
            }
            kind => {
                let mut spans = vec![label];
                if field == EditField::Assignee && value.is_empty() {
                    spans.push(Span::styled("Unassigned", Style::default().fg(theme.dim)));
                } else if kind == FieldKind::Enum || kind == FieldKind::Integer {
                    spans.push(Span::styled(format!("\u{2039} {} \u{203A}", value), value_style));
                } else {
                    spans.push(Span::styled(value, value_style));
                }
                if focused && matches!(kind, FieldKind::Text | FieldKind::Completion) {
                    spans.push(Span::styled(CURSOR, Style::default().fg(theme.highlight)));
                }
                lines.push(Line::from(spans));
            }
        }
    }

    frame.render_widget(Paragraph::new(lines).style(Style::default().bg(bg)), area);
}
