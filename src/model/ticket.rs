use std::fmt;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of every generated ticket identifier
pub const ID_PREFIX: &str = "TIKI-";

/// Number of random characters after the prefix
pub const ID_SUFFIX_LEN: usize = 6;

/// Priority assigned when the stored value is missing or out of range
pub const DEFAULT_PRIORITY: u8 = 3;

pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 5;

/// Workflow status of a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Backlog,
    Ready,
    InProgress,
    Review,
    Done,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Backlog,
        Status::Ready,
        Status::InProgress,
        Status::Review,
        Status::Done,
    ];

    /// The canonical on-disk spelling
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Backlog => "backlog",
            Status::Ready => "ready",
            Status::InProgress => "in_progress",
            Status::Review => "review",
            Status::Done => "done",
        }
    }

    /// Human-readable label for headers and lanes
    pub fn label(self) -> &'static str {
        match self {
            Status::Backlog => "Backlog",
            Status::Ready => "Ready",
            Status::InProgress => "In Progress",
            Status::Review => "Review",
            Status::Done => "Done",
        }
    }

    /// Resolve a status string, accepting the common aliases.
    /// Returns `None` for anything unrecognized.
    pub fn from_alias(s: &str) -> Option<Status> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "backlog" => Some(Status::Backlog),
            "todo" | "open" | "ready" => Some(Status::Ready),
            "in_progress" | "in-progress" | "inprogress" | "in progress" => {
                Some(Status::InProgress)
            }
            "review" | "in_review" | "in-review" | "in review" => Some(Status::Review),
            "done" | "closed" | "completed" => Some(Status::Done),
            _ => None,
        }
    }

    /// Lenient normalization used when loading files: unknown → backlog
    pub fn normalize(s: &str) -> Status {
        Status::from_alias(s).unwrap_or(Status::Backlog)
    }

    /// Whether the status counts toward remaining work in the burndown
    pub fn is_active(self) -> bool {
        matches!(self, Status::Ready | Status::InProgress | Status::Review)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of work a ticket describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketType {
    Story,
    Bug,
    Spike,
    Epic,
}

impl TicketType {
    pub const ALL: [TicketType; 4] = [
        TicketType::Story,
        TicketType::Bug,
        TicketType::Spike,
        TicketType::Epic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TicketType::Story => "story",
            TicketType::Bug => "bug",
            TicketType::Spike => "spike",
            TicketType::Epic => "epic",
        }
    }

    pub fn parse(s: &str) -> Option<TicketType> {
        match s.trim().to_lowercase().as_str() {
            "story" => Some(TicketType::Story),
            "bug" => Some(TicketType::Bug),
            "spike" => Some(TicketType::Spike),
            "epic" => Some(TicketType::Epic),
            _ => None,
        }
    }

    /// Lenient normalization used when loading files: unknown → story
    pub fn normalize(s: &str) -> TicketType {
        TicketType::parse(s).unwrap_or(TicketType::Story)
    }
}

impl fmt::Display for TicketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A comment appended to a ticket during the session (not persisted)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub body: String,
}

/// A ticket with its frontmatter fields and file bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    /// Canonical uppercase identifier, e.g. `TIKI-A1B2C3`
    pub id: String,
    pub title: String,
    /// Markdown body following the frontmatter
    pub body: String,
    pub ticket_type: TicketType,
    pub status: Status,
    /// Tags in first-seen order, no duplicates
    pub tags: Vec<String>,
    pub assignee: String,
    /// 1 (highest) through 5
    pub priority: u8,
    /// 0 means not estimated
    pub points: u32,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub comments: Vec<Comment>,

    // --- File tracking ---
    /// File modification time observed at the last load or save.
    /// `None` for tickets that have never touched disk.
    #[serde(skip)]
    pub loaded_mtime: Option<SystemTime>,
}

impl Ticket {
    /// A blank ticket template with the defaults used by the "new ticket" flow
    pub fn template(max_points: u32, now: DateTime<Utc>) -> Self {
        Ticket {
            id: String::new(),
            title: String::new(),
            body: String::new(),
            ticket_type: TicketType::Story,
            status: Status::Backlog,
            tags: Vec::new(),
            assignee: String::new(),
            priority: DEFAULT_PRIORITY,
            points: default_points(max_points),
            created_at: now,
            created_by: String::new(),
            updated_at: now,
            comments: Vec::new(),
            loaded_mtime: None,
        }
    }

    /// File name for this ticket: lowercase id plus `.md`
    pub fn file_name(&self) -> String {
        file_name_for_id(&self.id)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Add a tag if not already present. Returns true if the set changed.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.has_tag(tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    /// Remove a tag (case-insensitive). Returns true if the set changed.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| !t.eq_ignore_ascii_case(tag));
        self.tags.len() != before
    }

    /// Clamp priority and points into range and dedupe tags, the same way
    /// the loader does for values read from disk
    pub fn normalize(&mut self, max_points: u32) {
        self.priority = normalize_priority(i64::from(self.priority));
        self.points = normalize_points(i64::from(self.points), max_points);
        self.tags = dedupe_tags(std::mem::take(&mut self.tags));
        self.id = self.id.to_uppercase();
    }
}

impl PartialEq for Ticket {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.title == other.title
            && self.body == other.body
            && self.ticket_type == other.ticket_type
            && self.status == other.status
            && self.tags == other.tags
            && self.assignee == other.assignee
            && self.priority == other.priority
            && self.points == other.points
    }
}

impl Eq for Ticket {}

/// Points assigned to a ticket that has no valid estimate
pub fn default_points(max_points: u32) -> u32 {
    max_points / 2
}

/// Priority outside 1..=5 becomes the default
pub fn normalize_priority(value: i64) -> u8 {
    if (i64::from(MIN_PRIORITY)..=i64::from(MAX_PRIORITY)).contains(&value) {
        value as u8
    } else {
        DEFAULT_PRIORITY
    }
}

/// Points outside 1..=max_points become `max_points / 2`
pub fn normalize_points(value: i64, max_points: u32) -> u32 {
    if value >= 1 && value <= i64::from(max_points) {
        value as u32
    } else {
        default_points(max_points)
    }
}

/// Remove empty and duplicate (case-insensitive) tags, keeping first-seen order
pub fn dedupe_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if tag.is_empty() || out.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
            continue;
        }
        out.push(tag);
    }
    out
}

/// Canonical identifier for a file stem: `tiki-abc123` → `TIKI-ABC123`
pub fn id_from_stem(stem: &str) -> String {
    stem.to_uppercase()
}

/// File name for an identifier: `TIKI-ABC123` → `tiki-abc123.md`
pub fn file_name_for_id(id: &str) -> String {
    format!("{}.md", id.to_lowercase())
}

/// Whether `id` matches the default `TIKI-XXXXXX` shape (case-insensitive)
pub fn is_default_id_shape(id: &str) -> bool {
    let upper = id.to_uppercase();
    match upper.strip_prefix(ID_PREFIX) {
        Some(rest) => {
            rest.len() == ID_SUFFIX_LEN
                && rest.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_aliases() {
        assert_eq!(Status::normalize("todo"), Status::Ready);
        assert_eq!(Status::normalize("OPEN"), Status::Ready);
        assert_eq!(Status::normalize("in progress"), Status::InProgress);
        assert_eq!(Status::normalize("in-progress"), Status::InProgress);
        assert_eq!(Status::normalize("inprogress"), Status::InProgress);
        assert_eq!(Status::normalize("closed"), Status::Done);
        assert_eq!(Status::normalize("completed"), Status::Done);
        assert_eq!(Status::normalize("whatever"), Status::Backlog);
        assert_eq!(Status::from_alias("whatever"), None);
    }

    #[test]
    fn active_statuses() {
        assert!(!Status::Backlog.is_active());
        assert!(Status::Ready.is_active());
        assert!(Status::InProgress.is_active());
        assert!(Status::Review.is_active());
        assert!(!Status::Done.is_active());
    }

    #[test]
    fn type_normalization() {
        assert_eq!(TicketType::normalize("Bug"), TicketType::Bug);
        assert_eq!(TicketType::normalize("feature"), TicketType::Story);
    }

    #[test]
    fn priority_bounds() {
        assert_eq!(normalize_priority(0), 3);
        assert_eq!(normalize_priority(6), 3);
        assert_eq!(normalize_priority(1), 1);
        assert_eq!(normalize_priority(5), 5);
    }

    #[test]
    fn points_bounds() {
        assert_eq!(normalize_points(-1, 10), 5);
        assert_eq!(normalize_points(0, 10), 5);
        assert_eq!(normalize_points(11, 10), 5);
        assert_eq!(normalize_points(10, 10), 10);
        assert_eq!(normalize_points(1, 10), 1);
    }

    #[test]
    fn id_and_file_name_derive_from_each_other() {
        assert_eq!(file_name_for_id("TIKI-AB12CD"), "tiki-ab12cd.md");
        assert_eq!(id_from_stem("tiki-ab12cd"), "TIKI-AB12CD");
        assert!(is_default_id_shape("tiki-ab12cd"));
        assert!(!is_default_id_shape("TIKI-AB12"));
        assert!(!is_default_id_shape("BUG-AB12CD"));
    }

    #[test]
    fn tags_dedupe_case_insensitive() {
        let tags = dedupe_tags(vec!["ui".into(), "UI".into(), "".into(), " api ".into()]);
        assert_eq!(tags, vec!["ui".to_string(), "api".to_string()]);
    }

    #[test]
    fn template_defaults() {
        let t = Ticket::template(10, Utc::now());
        assert_eq!(t.status, Status::Backlog);
        assert_eq!(t.priority, 3);
        assert_eq!(t.points, 5);
        assert!(t.loaded_mtime.is_none());
    }

    #[test]
    fn add_and_remove_tag() {
        let mut t = Ticket::template(10, Utc::now());
        assert!(t.add_tag("now"));
        assert!(!t.add_tag("NOW"));
        assert!(t.remove_tag("Now"));
        assert!(t.tags.is_empty());
    }
}
