use chrono::{DateTime, Duration, Utc};

use crate::model::filter::FilterExpr;
use crate::model::ticket::Ticket;

/// Inputs a filter may read besides the ticket itself.
///
/// `now` is sampled once per board refresh so every lane of a refresh sees
/// the same clock.
#[derive(Debug, Clone)]
pub struct FilterContext {
    pub now: DateTime<Utc>,
    pub current_user: String,
}

impl FilterContext {
    pub fn new(now: DateTime<Utc>, current_user: impl Into<String>) -> Self {
        FilterContext {
            now,
            current_user: current_user.into(),
        }
    }
}

/// Evaluate a filter against one ticket
pub fn matches(expr: &FilterExpr, ticket: &Ticket, ctx: &FilterContext) -> bool {
    match expr {
        FilterExpr::True => true,
        FilterExpr::Status(s) => ticket.status == *s,
        FilterExpr::Tag(t) => ticket.has_tag(t),
        FilterExpr::Type(t) => ticket.ticket_type == *t,
        FilterExpr::Priority(op, n) => op.apply(i64::from(ticket.priority), *n),
        FilterExpr::Points(op, n) => op.apply(i64::from(ticket.points), *n),
        FilterExpr::Assignee(a) => ticket.assignee.eq_ignore_ascii_case(a),
        FilterExpr::AgeDays(op, n) => op.apply((ctx.now - ticket.created_at).num_days(), *n),
        // A window too wide for the clock covers every ticket
        FilterExpr::UpdatedWithinDays(n) => {
            *n >= 0
                && Duration::try_days(*n)
                    .is_none_or(|window| ctx.now - ticket.updated_at <= window)
        }
        FilterExpr::Me => {
            !ctx.current_user.is_empty() && ticket.assignee.eq_ignore_ascii_case(&ctx.current_user)
        }
        FilterExpr::And(items) => items.iter().all(|e| matches(e, ticket, ctx)),
        FilterExpr::Or(items) => items.iter().any(|e| matches(e, ticket, ctx)),
        FilterExpr::Not(inner) => !matches(inner, ticket, ctx),
    }
}

/// Keep the tickets a filter accepts, preserving input order
pub fn apply<'a, I>(expr: &FilterExpr, tickets: I, ctx: &FilterContext) -> Vec<Ticket>
where
    I: IntoIterator<Item = &'a Ticket>,
{
    tickets
        .into_iter()
        .filter(|t| matches(expr, t, ctx))
        .cloned()
        .collect()
}
