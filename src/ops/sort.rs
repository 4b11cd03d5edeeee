use std::cmp::Ordering;

use crate::model::plugin::{SortDirection, SortField, SortRule};
use crate::model::ticket::Ticket;

fn compare_field(a: &Ticket, b: &Ticket, field: SortField) -> Ordering {
    match field {
        SortField::Priority => a.priority.cmp(&b.priority),
        SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortField::Status => a.status.cmp(&b.status),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::Points => a.points.cmp(&b.points),
    }
}

/// Compare two tickets by a multi-key rule list, falling back to id so the
/// order is total and stable across refreshes
pub fn compare(a: &Ticket, b: &Ticket, rules: &[SortRule]) -> Ordering {
    for rule in rules {
        let ord = compare_field(a, b, rule.field);
        let ord = match rule.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.id.cmp(&b.id)
}

/// Sort tickets in place
pub fn sort_tickets(tickets: &mut [Ticket], rules: &[SortRule]) {
    tickets.sort_by(|a, b| compare(a, b, rules));
}
