use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::model::ticket::Status;

/// Length of the trailing history window
pub const WINDOW_DAYS: i64 = 14;

/// Samples per day
const BUCKETS_PER_DAY: i64 = 2;

/// One recorded state of a ticket file at a commit. `status` is `None`
/// when the file did not exist (deleted) at that commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusVersion {
    pub ticket_id: String,
    pub commit: String,
    pub timestamp: DateTime<Utc>,
    pub status: Option<Status>,
}

/// A status change observed inside the window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransition {
    pub ticket_id: String,
    pub timestamp: DateTime<Utc>,
    pub commit: String,
    pub from: Option<Status>,
    pub to: Option<Status>,
}

impl StatusTransition {
    /// +1 when entering active work, -1 when leaving it, 0 otherwise
    pub fn active_delta(&self) -> i64 {
        is_active(self.to) - is_active(self.from)
    }
}

fn is_active(status: Option<Status>) -> i64 {
    i64::from(status.is_some_and(Status::is_active))
}

/// Remaining active tickets at the close of a half-day bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurndownPoint {
    pub bucket_start: DateTime<Utc>,
    pub remaining: i64,
}

/// Result of replaying the ticket directory's history
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    pub window_start: Option<DateTime<Utc>>,
    pub events: Vec<StatusTransition>,
    pub points: Vec<BurndownPoint>,
}

impl History {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Remaining counts only, for sparkline rendering
    pub fn series(&self) -> Vec<u64> {
        self.points
            .iter()
            .map(|p| p.remaining.max(0) as u64)
            .collect()
    }
}

/// Start of the window that ends at `now`
pub fn window_start(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now - Duration::days(days)
}

/// Replay versions per ticket.
///
/// Returns each ticket's status at `window_start` (from its last version at
/// or before that instant) and the transitions inside the window, ordered by
/// time.
pub fn replay(
    versions: &[StatusVersion],
    window_start: DateTime<Utc>,
) -> (BTreeMap<String, Option<Status>>, Vec<StatusTransition>) {
    let mut by_ticket: BTreeMap<&str, Vec<&StatusVersion>> = BTreeMap::new();
    for v in versions {
        by_ticket.entry(v.ticket_id.as_str()).or_default().push(v);
    }

    let mut baseline = BTreeMap::new();
    let mut events = Vec::new();
    for (ticket_id, mut list) in by_ticket {
        list.sort_by_key(|v| v.timestamp);
        let mut prev: Option<Status> = None;
        let mut at_start: Option<Status> = None;
        for v in list {
            if v.timestamp <= window_start {
                prev = v.status;
                at_start = v.status;
                continue;
            }
            if v.status != prev {
                events.push(StatusTransition {
                    ticket_id: ticket_id.to_string(),
                    timestamp: v.timestamp,
                    commit: v.commit.clone(),
                    from: prev,
                    to: v.status,
                });
            }
            prev = v.status;
        }
        // Tickets with versions only inside the window were absent at its start
        baseline.insert(ticket_id.to_string(), at_start);
    }

    events.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.ticket_id.cmp(&b.ticket_id))
    });
    (baseline, events)
}

/// Sample the remaining-active count at the close of each half-day bucket,
/// so the last sample is the window's end. A sample includes every event
/// with `timestamp <= sample time`.
pub fn burndown(
    window_start: DateTime<Utc>,
    days: i64,
    baseline: &BTreeMap<String, Option<Status>>,
    events: &[StatusTransition],
) -> Vec<BurndownPoint> {
    let initial: i64 = baseline.values().map(|s| is_active(*s)).sum();
    let step = Duration::hours(24 / BUCKETS_PER_DAY);

    let mut points = Vec::with_capacity((days * BUCKETS_PER_DAY) as usize);
    let mut running = initial;
    let mut next_event = 0;
    for k in 0..days * BUCKETS_PER_DAY {
        let bucket_start = window_start + step * k as i32;
        let at = bucket_start + step;
        while next_event < events.len() && events[next_event].timestamp <= at {
            running += events[next_event].active_delta();
            next_event += 1;
        }
        points.push(BurndownPoint {
            bucket_start,
            remaining: running,
        });
    }
    points
}

/// Replay and sample in one step for the standard window ending at `now`
pub fn build_history(versions: &[StatusVersion], now: DateTime<Utc>) -> History {
    let start = window_start(now, WINDOW_DAYS);
    let (baseline, events) = replay(versions, start);
    let points = burndown(start, WINDOW_DAYS, &baseline, &events);
    History {
        window_start: Some(start),
        events,
        points,
    }
}
