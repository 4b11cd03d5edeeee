use crate::model::plugin::{SortField, SortRule};
use crate::model::ticket::Ticket;
use crate::ops::sort::compare;

/// A ticket that matched a search query
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub ticket: Ticket,
    /// Relevance; reserved, always 1.0 for now
    pub score: f32,
}

/// Whether a ticket's title or body contains the lowercase query
pub fn ticket_matches(ticket: &Ticket, query_lower: &str) -> bool {
    query_lower.is_empty()
        || ticket.title.to_lowercase().contains(query_lower)
        || ticket.body.to_lowercase().contains(query_lower)
}

/// Case-insensitive substring search over title and body.
///
/// `pre_filter` narrows the candidate set before the text match. Results
/// are ordered by priority ascending, then title, then id.
pub fn search_tickets<'a, I>(
    tickets: I,
    query: &str,
    pre_filter: Option<&dyn Fn(&Ticket) -> bool>,
) -> Vec<SearchResult>
where
    I: IntoIterator<Item = &'a Ticket>,
{
    let query_lower = query.trim().to_lowercase();
    let mut results: Vec<SearchResult> = tickets
        .into_iter()
        .filter(|t| pre_filter.is_none_or(|f| f(t)))
        .filter(|t| ticket_matches(t, &query_lower))
        .map(|t| SearchResult {
            ticket: t.clone(),
            score: 1.0,
        })
        .collect();

    let order = [
        SortRule::asc(SortField::Priority),
        SortRule::asc(SortField::Title),
    ];
    results.sort_by(|a, b| compare(&a.ticket, &b.ticket, &order));
    results
}
