use crate::model::plugin::TicketAction;
use crate::model::ticket::{Status, Ticket, normalize_points};

/// Outcome of applying an action to a ticket in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// The ticket changed and should be saved
    Changed,
    /// The action was a no-op for this ticket
    Unchanged,
    /// The action is not a field update (navigation, delete, create)
    NotAFieldUpdate,
}

/// Apply a field-update action to a ticket.
///
/// Non-field actions (`Delete`, `OpenDetail`, `OpenEdit`, `NewTicket`) are
/// left to the caller and report [`Applied::NotAFieldUpdate`].
pub fn apply_action(ticket: &mut Ticket, action: &TicketAction, max_points: u32) -> Applied {
    let changed = match action {
        TicketAction::SetStatus(s) => set_field(&mut ticket.status, *s),
        TicketAction::SetType(t) => set_field(&mut ticket.ticket_type, *t),
        TicketAction::AddTag(tag) => ticket.add_tag(tag),
        TicketAction::RemoveTag(tag) => ticket.remove_tag(tag),
        TicketAction::SetPriority(p) => set_field(&mut ticket.priority, *p),
        TicketAction::SetPoints(p) => {
            let clamped = normalize_points(i64::from(*p), max_points);
            set_field(&mut ticket.points, clamped)
        }
        TicketAction::Delete
        | TicketAction::OpenDetail
        | TicketAction::OpenEdit
        | TicketAction::NewTicket => return Applied::NotAFieldUpdate,
    };
    if changed {
        Applied::Changed
    } else {
        Applied::Unchanged
    }
}

fn set_field<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

/// Next status in workflow order, if any
pub fn next_status(status: Status) -> Option<Status> {
    let idx = Status::ALL.iter().position(|s| *s == status)?;
    Status::ALL.get(idx + 1).copied()
}

/// Previous status in workflow order, if any
pub fn prev_status(status: Status) -> Option<Status> {
    let idx = Status::ALL.iter().position(|s| *s == status)?;
    idx.checked_sub(1).and_then(|i| Status::ALL.get(i).copied())
}
