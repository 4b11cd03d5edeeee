use chrono::Utc;
use ratatui::Terminal;
use ratatui::backend::TestBackend;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use tempfile::TempDir;

use crate::model::ticket::{Status, Ticket};
use crate::tui::app::App;
use crate::tui::context::test_support::temp_context;

pub const TERM_W: u16 = 80;
pub const TERM_H: u16 = 24;

/// Plain text of a buffer, one line per row, trailing blanks trimmed
pub fn buffer_text(buf: &Buffer) -> String {
    let w = buf.area.width as usize;
    let lines: Vec<String> = buf
        .content
        .chunks(w)
        .map(|row| {
            let s: String = row.iter().map(|cell| cell.symbol()).collect();
            s.trim_end().to_string()
        })
        .collect();
    let end = lines
        .iter()
        .rposition(|l| !l.is_empty())
        .map_or(0, |i| i + 1);
    lines[..end].join("\n")
}

/// Draw into a `w`x`h` test terminal and return the text
pub fn render_to_string<F>(w: u16, h: u16, f: F) -> String
where
    F: FnOnce(&mut ratatui::Frame, Rect),
{
    let mut terminal = Terminal::new(TestBackend::new(w, h)).unwrap();
    terminal.draw(|frame| f(frame, frame.area())).unwrap();
    buffer_text(terminal.backend().buffer())
}

/// An app over an empty temp project backed by the in-memory VCS fake.
/// Keep the `TempDir` alive for the test's duration.
pub fn test_app() -> (TempDir, App) {
    let (dir, ctx) = temp_context();
    let app = App::new(ctx).unwrap();
    (dir, app)
}

/// Create a ticket through the store and let the boards pick it up
pub fn seed_ticket(app: &mut App, title: &str, status: Status) -> Ticket {
    let mut draft = Ticket::template(app.ctx.store.max_points(), Utc::now());
    draft.title = title.to_string();
    draft.status = status;
    let ticket = app.ctx.store.create(draft).unwrap();
    app.tick();
    ticket
}

/// Full screen at the default terminal size
pub fn render_app(app: &mut App) -> String {
    render_to_string(TERM_W, TERM_H, |frame, _| super::render(frame, app))
}
