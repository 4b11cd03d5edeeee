use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::Paragraph;

use crate::tui::theme::Theme;
use crate::tui::views::DocView;

use super::helpers::{clamp_scroll, visible_lines, wrap_plain};

/// Document text, wrapped and scrolled
pub fn render_doc(frame: &mut Frame, view: &mut DocView, theme: &Theme, area: Rect) {
    let width = area.width.saturating_sub(2) as usize;
    let height = area.height as usize;
    let lines: Vec<String> = wrap_plain(view.text(), width)
        .into_iter()
        .map(|l| format!(" {}", l))
        .collect();
    view.scroll = clamp_scroll(view.scroll, lines.len(), height);
    let visible = visible_lines(&lines, view.scroll, height, Style::default().fg(theme.text));
    frame.render_widget(
        Paragraph::new(visible).style(Style::default().bg(theme.background)),
        area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::actions::ActionId;
    use crate::tui::render::test_helpers::render_to_string;

    #[test]
    fn scrolled_document() {
        let text: String = (1..=30).map(|i| format!("line {}\n", i)).collect();
        let mut view = DocView::new("doc", text);
        view.handle_action(&ActionId::PageDown);
        let out = render_to_string(40, 5, |frame, area| {
            render_doc(frame, &mut view, &Theme::dark(), area);
        });
        assert_eq!(out, " line 11\n line 12\n line 13\n line 14\n line 15");

        view.scroll = 99;
        let out = render_to_string(40, 5, |frame, area| {
            render_doc(frame, &mut view, &Theme::dark(), area);
        });
        assert!(out.ends_with(" line 30"));
        assert_eq!(view.scroll, 25);
    }
}
