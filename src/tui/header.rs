use crate::model::ticket::{Status, Ticket};
use crate::ops::burndown::History;

/// Ticket counts shown next to the burndown
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketStats {
    pub total: usize,
    /// Counts in `Status::ALL` order
    pub by_status: [usize; 5],
    pub active: usize,
    /// Sum of points over active tickets
    pub active_points: u32,
}

impl TicketStats {
    pub fn from_tickets(tickets: &[Ticket]) -> Self {
        let mut stats = TicketStats {
            total: tickets.len(),
            ..Default::default()
        };
        for ticket in tickets {
            if let Some(i) = Status::ALL.iter().position(|s| *s == ticket.status) {
                stats.by_status[i] += 1;
            }
            if ticket.status.is_active() {
                stats.active += 1;
                stats.active_points += ticket.points;
            }
        }
        stats
    }

    pub fn count(&self, status: Status) -> usize {
        Status::ALL
            .iter()
            .position(|s| *s == status)
            .map_or(0, |i| self.by_status[i])
    }
}

/// Where the burndown is in its background build
#[derive(Debug, Clone, Default, PartialEq)]
pub enum HistoryStatus {
    #[default]
    Loading,
    Ready(History),
    Failed(String),
}

/// Data behind the header strip. Owned by the UI thread and fed by the
/// UI scheduler.
#[derive(Debug, Clone)]
pub struct HeaderModel {
    pub visible: bool,
    pub stats: TicketStats,
    pub history: HistoryStatus,
}

impl HeaderModel {
    pub fn new(visible: bool) -> Self {
        HeaderModel {
            visible,
            stats: TicketStats::default(),
            history: HistoryStatus::Loading,
        }
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    pub fn refresh_stats(&mut self, tickets: &[Ticket]) {
        self.stats = TicketStats::from_tickets(tickets);
    }

    pub fn set_history(&mut self, history: History) {
        self.history = HistoryStatus::Ready(history);
    }

    pub fn set_failed(&mut self, message: String) {
        self.history = HistoryStatus::Failed(message);
    }

    /// Mark a rebuild in progress, keeping the last good history on screen
    pub fn mark_loading(&mut self) {
        if !matches!(self.history, HistoryStatus::Ready(_)) {
            self.history = HistoryStatus::Loading;
        }
    }

    /// Remaining-active samples for the sparkline; empty until built
    pub fn series(&self) -> Vec<u64> {
        match &self.history {
            HistoryStatus::Ready(h) => h.series(),
            _ => Vec::new(),
        }
    }

    /// Number of status transitions in the window
    pub fn event_count(&self) -> usize {
        match &self.history {
            HistoryStatus::Ready(h) => h.events.len(),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ticket(status: Status, points: u32) -> Ticket {
        let mut t = Ticket::template(10, Utc::now());
        t.status = status;
        t.points = points;
        t
    }

    #[test]
    fn stats_count_active_points() {
        let tickets = vec![
            ticket(Status::Backlog, 8),
            ticket(Status::Ready, 3),
            ticket(Status::InProgress, 2),
            ticket(Status::Done, 5),
            ticket(Status::Review, 1),
        ];
        let stats = TicketStats::from_tickets(&tickets);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.active, 3);
        assert_eq!(stats.active_points, 6);
        assert_eq!(stats.count(Status::Done), 1);
    }

    #[test]
    fn loading_keeps_previous_history() {
        let mut header = HeaderModel::new(true);
        assert!(header.series().is_empty());
        header.set_history(History::default());
        header.mark_loading();
        assert!(matches!(header.history, HistoryStatus::Ready(_)));

        header.set_failed("git exploded".into());
        header.mark_loading();
        assert_eq!(header.history, HistoryStatus::Loading);
    }
}
