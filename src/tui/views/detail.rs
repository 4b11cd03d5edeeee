use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::model::ticket::Ticket;
use crate::tui::actions::ActionId;
use crate::tui::context::AppContext;
use crate::tui::params::NavFrame;
use crate::util::unicode::pop_grapheme;

use super::{NavCommand, Outcome};

/// Read-only view of one ticket with its comments
pub struct DetailView {
    ticket_id: String,
    ticket: Option<Ticket>,
    pub scroll: usize,
    /// Comment being typed, if any
    comment: Option<String>,
}

impl DetailView {
    pub fn new(ticket_id: &str, ctx: &AppContext) -> Self {
        DetailView {
            ticket_id: ticket_id.to_string(),
            ticket: ctx.store.get(ticket_id),
            scroll: 0,
            comment: None,
        }
    }

    pub fn ticket_id(&self) -> &str {
        &self.ticket_id
    }

    /// `None` once the ticket has been deleted out from under the view
    pub fn ticket(&self) -> Option<&Ticket> {
        self.ticket.as_ref()
    }

    pub fn comment_input(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn is_capturing(&self) -> bool {
        self.comment.is_some()
    }

    pub fn refresh(&mut self, ctx: &AppContext) {
        self.ticket = ctx.store.get(&self.ticket_id);
    }

    pub fn handle_action(&mut self, id: &ActionId) -> Outcome {
        match id {
            ActionId::ScrollUp => self.scroll = self.scroll.saturating_sub(1),
            ActionId::ScrollDown => self.scroll += 1,
            ActionId::EditTicket if self.ticket.is_some() => {
                return Outcome::Navigate(NavCommand::Push(NavFrame::edit(
                    &self.ticket_id,
                    None,
                    None,
                )));
            }
            ActionId::AddComment if self.ticket.is_some() => self.comment = Some(String::new()),
            _ => return Outcome::Ignored,
        }
        Outcome::Handled
    }

    pub fn handle_input(&mut self, key: KeyEvent, ctx: &AppContext) -> Option<Outcome> {
        let comment = self.comment.as_mut()?;
        if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
            return Some(Outcome::Handled);
        }
        match key.code {
            KeyCode::Char(c) => comment.push(c),
            KeyCode::Backspace => pop_grapheme(comment),
            KeyCode::Esc => self.comment = None,
            KeyCode::Enter => {
                let body = comment.trim().to_string();
                self.comment = None;
                if body.is_empty() {
                    return Some(Outcome::Handled);
                }
                let author = ctx.store.current_user().to_string();
                return Some(match ctx.store.add_comment(&self.ticket_id, &author, &body) {
                    Ok(()) => {
                        self.refresh(ctx);
                        Outcome::Status("comment added".to_string())
                    }
                    Err(e) => Outcome::Error(e.to_string()),
                });
            }
            _ => {}
        }
        Some(Outcome::Handled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::context::test_support::temp_context;
    use chrono::Utc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn seeded(ctx: &AppContext) -> Ticket {
        let mut t = Ticket::template(10, Utc::now());
        t.title = "Flaky test".into();
        ctx.store.create(t).unwrap()
    }

    #[test]
    fn missing_ticket_ignores_edit() {
        let (_dir, ctx) = temp_context();
        let mut view = DetailView::new("TIKI-NOPE01", &ctx);
        assert!(view.ticket().is_none());
        assert_eq!(view.handle_action(&ActionId::EditTicket), Outcome::Ignored);
        assert_eq!(view.handle_action(&ActionId::AddComment), Outcome::Ignored);
    }

    #[test]
    fn typing_a_comment_saves_it() {
        let (_dir, ctx) = temp_context();
        let t = seeded(&ctx);
        let mut view = DetailView::new(&t.id, &ctx);

        view.handle_action(&ActionId::AddComment);
        assert!(view.is_capturing());
        for c in "seen it twice".chars() {
            view.handle_input(key(KeyCode::Char(c)), &ctx);
        }
        let outcome = view.handle_input(key(KeyCode::Enter), &ctx).unwrap();
        assert_eq!(outcome, Outcome::Status("comment added".into()));
        assert!(!view.is_capturing());

        let comments = &view.ticket().unwrap().comments;
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].author, "tester");
        assert_eq!(comments[0].body, "seen it twice");
    }

    #[test]
    fn blank_or_cancelled_comment_is_dropped() {
        let (_dir, ctx) = temp_context();
        let t = seeded(&ctx);
        let mut view = DetailView::new(&t.id, &ctx);

        view.handle_action(&ActionId::AddComment);
        view.handle_input(key(KeyCode::Char(' ')), &ctx);
        view.handle_input(key(KeyCode::Enter), &ctx);

        view.handle_action(&ActionId::AddComment);
        view.handle_input(key(KeyCode::Char('x')), &ctx);
        view.handle_input(key(KeyCode::Esc), &ctx);

        assert!(ctx.store.get(&t.id).unwrap().comments.is_empty());
    }

    #[test]
    fn scroll_and_edit() {
        let (_dir, ctx) = temp_context();
        let t = seeded(&ctx);
        let mut view = DetailView::new(&t.id, &ctx);
        view.handle_action(&ActionId::ScrollUp);
        assert_eq!(view.scroll, 0);
        view.handle_action(&ActionId::ScrollDown);
        assert_eq!(view.scroll, 1);
        assert_eq!(
            view.handle_action(&ActionId::EditTicket),
            Outcome::Navigate(NavCommand::Push(NavFrame::edit(&t.id, None, None)))
        );
        assert_eq!(view.handle_action(&ActionId::Back), Outcome::Ignored);
    }
}
