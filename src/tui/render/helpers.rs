use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::util::unicode;

/// Compute total display width of a slice of spans
pub(super) fn spans_width(spans: &[Span]) -> usize {
    spans
        .iter()
        .map(|s| unicode::display_width(&s.content))
        .sum()
}

/// Append `hint` flush right when it fits after the existing spans
pub(super) fn push_right_hint<'a>(
    spans: &mut Vec<Span<'a>>,
    hint: &str,
    width: usize,
    hint_style: Style,
    bg: Color,
) {
    let content_width = spans_width(spans);
    let hint_width = unicode::display_width(hint);
    if content_width + hint_width < width {
        let padding = width - content_width - hint_width;
        spans.push(Span::styled(" ".repeat(padding), Style::default().bg(bg)));
        spans.push(Span::styled(hint.to_string(), hint_style));
    }
}

/// Wrap plain text to `width` cells, keeping blank lines and each line's
/// leading indentation
pub(super) fn wrap_plain(text: &str, width: usize) -> Vec<String> {
    let mut out = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            out.push(String::new());
            continue;
        }
        let indent = &line[..line.len() - trimmed.len()];
        let indent_width = unicode::display_width(indent).min(width / 2);
        let prefix = " ".repeat(indent_width);
        for wrapped in unicode::wrap_to_width(trimmed, width.saturating_sub(indent_width), usize::MAX) {
            out.push(format!("{}{}", prefix, wrapped));
        }
    }
    out
}

/// Clamp a scroll offset so the last page stays full
pub(super) fn clamp_scroll(scroll: usize, total: usize, height: usize) -> usize {
    scroll.min(total.saturating_sub(height))
}

/// Styled lines for wrapped text starting at `scroll`
pub(super) fn visible_lines(lines: &[String], scroll: usize, height: usize, style: Style) -> Vec<Line<'static>> {
    lines
        .iter()
        .skip(scroll)
        .take(height)
        .map(|l| Line::from(Span::styled(l.clone(), style)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_plain_keeps_blank_lines_and_indent() {
        let text = "first line here\n\n  indented words wrap";
        assert_eq!(
            wrap_plain(text, 10),
            vec!["first line", "here", "", "  indented", "  words", "  wrap"]
        );
    }

    #[test]
    fn clamp_scroll_keeps_last_page() {
        assert_eq!(clamp_scroll(50, 20, 5), 15);
        assert_eq!(clamp_scroll(3, 20, 5), 3);
        assert_eq!(clamp_scroll(3, 2, 5), 0);
    }
}
