use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::info;

use crate::io::store::StoreError;
use crate::model::plugin::KeyBinding;
use crate::model::ticket::{MAX_PRIORITY, MIN_PRIORITY, Ticket, TicketType};
use crate::ops::ticket_ops::{next_status, prev_status};
use crate::tui::actions::{Action, ActionId, ActionRegistry, edit_field_registry};
use crate::tui::context::AppContext;
use crate::tui::params::NavFrame;
use crate::util::unicode::pop_grapheme;

use super::{NavCommand, Outcome};

/// Editable ticket fields, in tab order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditField {
    Title,
    Status,
    Type,
    Priority,
    Assignee,
    Points,
    Description,
}

/// How a field takes input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Enum,
    Integer,
    /// Free text with Up/Down cycling through known values
    Completion,
    Multiline,
}

impl EditField {
    pub const ALL: [EditField; 7] = [
        EditField::Title,
        EditField::Status,
        EditField::Type,
        EditField::Priority,
        EditField::Assignee,
        EditField::Points,
        EditField::Description,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EditField::Title => "title",
            EditField::Status => "status",
            EditField::Type => "type",
            EditField::Priority => "priority",
            EditField::Assignee => "assignee",
            EditField::Points => "points",
            EditField::Description => "description",
        }
    }

    pub fn parse(s: &str) -> Option<EditField> {
        EditField::ALL.into_iter().find(|f| f.as_str() == s)
    }

    pub fn label(self) -> &'static str {
        match self {
            EditField::Title => "Title",
            EditField::Status => "Status",
            EditField::Type => "Type",
            EditField::Priority => "Priority",
            EditField::Assignee => "Assignee",
            EditField::Points => "Points",
            EditField::Description => "Description",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            EditField::Title => FieldKind::Text,
            EditField::Status | EditField::Type => FieldKind::Enum,
            EditField::Priority | EditField::Points => FieldKind::Integer,
            EditField::Assignee => FieldKind::Completion,
            EditField::Description => FieldKind::Multiline,
        }
    }

    fn position(self) -> usize {
        EditField::ALL.iter().position(|f| *f == self).unwrap_or(0)
    }

    /// Next field in tab order, wrapping to the first
    pub fn next(self) -> EditField {
        EditField::ALL[(self.position() + 1) % EditField::ALL.len()]
    }

    pub fn prev(self) -> EditField {
        let len = EditField::ALL.len();
        EditField::ALL[(self.position() + len - 1) % len]
    }
}

/// Step through `values` from `current` by one, stopping at either end
fn step<T: Copy + PartialEq>(values: &[T], current: T, forward: bool) -> T {
    let Some(i) = values.iter().position(|v| *v == current) else {
        return current;
    };
    let next = if forward {
        (i + 1).min(values.len() - 1)
    } else {
        i.saturating_sub(1)
    };
    values[next]
}

/// Form over a draft ticket. Nothing reaches the store until a save.
pub struct EditView {
    /// Empty until a new ticket is first saved
    ticket_id: String,
    draft: Ticket,
    focus: EditField,
    /// Set when the last save hit a concurrent modification on disk
    conflict: bool,
    assignees: Vec<String>,
    max_points: u32,
}

impl EditView {
    pub fn from_params(
        ticket_id: &str,
        draft: Option<Ticket>,
        focus: Option<EditField>,
        ctx: &AppContext,
        now: DateTime<Utc>,
    ) -> Result<Self, String> {
        let draft = match draft {
            Some(draft) => draft,
            None if ticket_id.is_empty() => Ticket::template(ctx.max_points(), now),
            None => ctx
                .store
                .get(ticket_id)
                .ok_or_else(|| format!("ticket {} not found", ticket_id))?,
        };
        Ok(EditView {
            ticket_id: ticket_id.to_string(),
            draft,
            focus: focus.unwrap_or(EditField::Title),
            conflict: false,
            assignees: ctx.store.assignees(),
            max_points: ctx.max_points(),
        })
    }

    pub fn ticket_id(&self) -> &str {
        &self.ticket_id
    }

    pub fn draft(&self) -> &Ticket {
        &self.draft
    }

    pub fn focus(&self) -> EditField {
        self.focus
    }

    pub fn in_conflict(&self) -> bool {
        self.conflict
    }

    pub fn is_new(&self) -> bool {
        self.ticket_id.is_empty()
    }

    pub fn frame(&self) -> NavFrame {
        NavFrame::edit(&self.ticket_id, Some(self.draft.clone()), Some(self.focus))
    }

    pub fn registry(&self) -> ActionRegistry {
        let mut registry = edit_field_registry(self.focus);
        let reload = if self.conflict {
            Action::new(ActionId::Reload, KeyBinding::ctrl('r'), "reload")
        } else {
            Action::hidden(ActionId::Reload, KeyBinding::ctrl('r'), "reload")
        };
        registry.register(reload);
        registry
    }

    /// Text entry for the focused field. Keys with Ctrl or Alt, and keys
    /// the field does not use, fall through to the bindings.
    pub fn handle_input(&mut self, key: KeyEvent) -> Option<Outcome> {
        if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
            return None;
        }
        let kind = self.focus.kind();
        match (kind, key.code) {
            (FieldKind::Enum, _) => None,
            (FieldKind::Integer, KeyCode::Char(c)) => {
                let digit = c.to_digit(10)?;
                self.set_number(digit);
                Some(Outcome::Handled)
            }
            (FieldKind::Integer, _) => None,
            (_, KeyCode::Char(c)) => {
                self.text_mut()?.push(c);
                Some(Outcome::Handled)
            }
            (_, KeyCode::Backspace) => {
                pop_grapheme(self.text_mut()?);
                Some(Outcome::Handled)
            }
            (FieldKind::Multiline, KeyCode::Enter) => {
                self.draft.body.push('\n');
                Some(Outcome::Handled)
            }
            (_, KeyCode::Enter) => {
                self.focus = self.focus.next();
                Some(Outcome::Handled)
            }
            _ => None,
        }
    }

    fn text_mut(&mut self) -> Option<&mut String> {
        match self.focus {
            EditField::Title => Some(&mut self.draft.title),
            EditField::Assignee => Some(&mut self.draft.assignee),
            EditField::Description => Some(&mut self.draft.body),
            _ => None,
        }
    }

    fn set_number(&mut self, digit: u32) {
        match self.focus {
            EditField::Priority => {
                let p = u8::try_from(digit).unwrap_or(MAX_PRIORITY);
                self.draft.priority = p.clamp(MIN_PRIORITY, MAX_PRIORITY);
            }
            EditField::Points => {
                // Typing "1" then "0" gives 10 when the maximum allows it
                let combined = self.draft.points * 10 + digit;
                self.draft.points = if (1..=self.max_points).contains(&combined) {
                    combined
                } else {
                    digit.clamp(1, self.max_points.max(1))
                };
            }
            _ => {}
        }
    }

    pub fn handle_action(&mut self, id: &ActionId, ctx: &AppContext) -> Outcome {
        match id {
            ActionId::NextField => {
                self.focus = self.focus.next();
                Outcome::Handled
            }
            ActionId::PrevField => {
                self.focus = self.focus.prev();
                Outcome::Handled
            }
            ActionId::NextValue => {
                self.cycle(true);
                Outcome::Handled
            }
            ActionId::PrevValue => {
                self.cycle(false);
                Outcome::Handled
            }
            ActionId::Save => match self.save(ctx) {
                Ok(()) => Outcome::Status(format!("saved {}", self.ticket_id)),
                Err(message) => Outcome::Error(message),
            },
            ActionId::QuickSave => match self.save(ctx) {
                Ok(()) => Outcome::Navigate(NavCommand::Pop),
                Err(message) => Outcome::Error(message),
            },
            ActionId::Cancel => Outcome::Navigate(NavCommand::Pop),
            ActionId::Reload if self.conflict => match ctx.store.reload(&self.ticket_id) {
                Ok(ticket) => {
                    self.draft = ticket;
                    self.conflict = false;
                    Outcome::Status(format!("reloaded {} from disk", self.ticket_id))
                }
                Err(e) => Outcome::Error(e.to_string()),
            },
            _ => Outcome::Ignored,
        }
    }

    /// Move the focused field's value one step. Enumerations stop at
    /// their ends instead of wrapping.
    fn cycle(&mut self, forward: bool) {
        match self.focus {
            EditField::Status => {
                let next = if forward {
                    next_status(self.draft.status)
                } else {
                    prev_status(self.draft.status)
                };
                if let Some(status) = next {
                    self.draft.status = status;
                }
            }
            EditField::Type => {
                self.draft.ticket_type = step(&TicketType::ALL, self.draft.ticket_type, forward);
            }
            EditField::Priority => {
                let p = self.draft.priority;
                self.draft.priority = if forward {
                    p.saturating_add(1).min(MAX_PRIORITY)
                } else {
                    p.saturating_sub(1).max(MIN_PRIORITY)
                };
            }
            EditField::Points => {
                let p = self.draft.points;
                let max = self.max_points.max(1);
                self.draft.points = if forward {
                    p.saturating_add(1).min(max)
                } else {
                    p.saturating_sub(1).max(1)
                };
            }
            EditField::Assignee => self.cycle_assignee(forward),
            EditField::Title | EditField::Description => {}
        }
    }

    fn cycle_assignee(&mut self, forward: bool) {
        if self.assignees.is_empty() {
            return;
        }
        let current = self
            .assignees
            .iter()
            .position(|a| a.eq_ignore_ascii_case(self.draft.assignee.trim()));
        let next = match (current, forward) {
            (None, true) => 0,
            (None, false) => return,
            (Some(i), true) => (i + 1).min(self.assignees.len() - 1),
            (Some(i), false) => i.saturating_sub(1),
        };
        self.draft.assignee = self.assignees[next].clone();
    }

    /// Create or update from the draft. After a conflict, a second save
    /// overwrites whatever is on disk.
    fn save(&mut self, ctx: &AppContext) -> Result<(), String> {
        if self.draft.title.trim().is_empty() {
            return Err("title is required".to_string());
        }
        let result = if self.is_new() {
            ctx.store.create(self.draft.clone())
        } else {
            if self.conflict {
                let mtime = ctx.store.disk_mtime(&self.ticket_id).map_err(|e| e.to_string())?;
                self.draft.loaded_mtime = Some(mtime);
            }
            ctx.store.update(self.draft.clone())
        };
        match result {
            Ok(saved) => {
                if self.conflict {
                    info!(id = %saved.id, "overwrote ticket changed on disk");
                }
                self.ticket_id = saved.id.clone();
                self.draft = saved;
                self.conflict = false;
                Ok(())
            }
            Err(StoreError::Conflict { id }) => {
                self.conflict = true;
                Err(format!(
                    "{} changed on disk: Ctrl-S to overwrite, Ctrl-R to reload",
                    id
                ))
            }
            Err(e) => Err(e.to_string()),
        }
    }
}
