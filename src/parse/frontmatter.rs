use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::model::ticket::{
    Status, Ticket, TicketType, dedupe_tags, normalize_points, normalize_priority,
};

/// The line that opens and closes the frontmatter block
const DELIMITER: &str = "---";

/// Error type for ticket file parsing
#[derive(Debug, thiserror::Error)]
pub enum FrontmatterError {
    #[error("missing frontmatter delimiters")]
    MissingDelimiters,
    #[error("frontmatter is not a mapping")]
    NotAMapping,
    #[error("missing required field: title")]
    MissingTitle,
    #[error("invalid yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// A parsed ticket plus non-fatal problems found while normalizing it
#[derive(Debug, Clone)]
pub struct ParsedTicket {
    pub ticket: Ticket,
    pub warnings: Vec<String>,
}

/// Split a ticket file into its YAML block and markdown body.
pub fn split_frontmatter(text: &str) -> Result<(&str, &str), FrontmatterError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text.split_inclusive('\n');
    let first = lines.next().ok_or(FrontmatterError::MissingDelimiters)?;
    if first.trim_end() != DELIMITER {
        return Err(FrontmatterError::MissingDelimiters);
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if line.trim_end() == DELIMITER {
            let yaml = &text[yaml_start..offset];
            let body = &text[offset + line.len()..];
            return Ok((yaml, body));
        }
        offset += line.len();
    }
    Err(FrontmatterError::MissingDelimiters)
}

/// Parse a ticket file.
///
/// `id` comes from the file name; an `id` key inside the frontmatter is
/// ignored (a warning is returned when it disagrees). `file_time` seeds the
/// timestamps until the store enriches them from version control.
pub fn parse_ticket(
    text: &str,
    id: &str,
    max_points: u32,
    file_time: DateTime<Utc>,
) -> Result<ParsedTicket, FrontmatterError> {
    let (yaml, body) = split_frontmatter(text)?;
    let doc: Value = if yaml.trim().is_empty() {
        Value::Mapping(Mapping::new())
    } else {
        serde_yaml::from_str(yaml)?
    };
    let map = match doc {
        Value::Mapping(m) => m,
        Value::Null => Mapping::new(),
        _ => return Err(FrontmatterError::NotAMapping),
    };

    let mut warnings = Vec::new();

    if let Some(embedded) = field(&map, "id").and_then(scalar_string)
        && !embedded.eq_ignore_ascii_case(id)
    {
        warnings.push(format!(
            "frontmatter id {} ignored, using {} from file name",
            embedded, id
        ));
    }

    let title = field(&map, "title")
        .and_then(scalar_string)
        .ok_or(FrontmatterError::MissingTitle)?;

    let ticket_type = field(&map, "type")
        .and_then(scalar_string)
        .map(|s| TicketType::normalize(&s))
        .unwrap_or(TicketType::Story);

    let status = field(&map, "status")
        .and_then(scalar_string)
        .map(|s| Status::normalize(&s))
        .unwrap_or(Status::Backlog);

    let tags = match field(&map, "tags") {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => match parse_tags(value) {
            Some(tags) => tags,
            None => {
                warnings.push("tags must be a list of non-empty strings; ignoring".to_string());
                Vec::new()
            }
        },
    };

    let assignee = field(&map, "assignee")
        .and_then(scalar_string)
        .unwrap_or_default();

    let priority = field(&map, "priority")
        .and_then(scalar_int)
        .map(normalize_priority)
        .unwrap_or_else(|| normalize_priority(0));

    let points = field(&map, "points")
        .and_then(scalar_int)
        .map(|p| normalize_points(p, max_points))
        .unwrap_or_else(|| normalize_points(0, max_points));

    let ticket = Ticket {
        id: id.to_uppercase(),
        title,
        body: body.trim_end_matches(['\n', '\r']).to_string(),
        ticket_type,
        status,
        tags,
        assignee,
        priority,
        points,
        created_at: file_time,
        created_by: String::new(),
        updated_at: file_time,
        comments: Vec::new(),
        loaded_mtime: None,
    };

    Ok(ParsedTicket { ticket, warnings })
}

/// Read just the status out of a ticket file, used when replaying history
pub fn parse_status(text: &str) -> Option<Status> {
    let (yaml, _) = split_frontmatter(text).ok()?;
    let doc: Value = serde_yaml::from_str(yaml).ok()?;
    let map = doc.as_mapping()?;
    Some(
        field(map, "status")
            .and_then(scalar_string)
            .map(|s| Status::normalize(&s))
            .unwrap_or(Status::Backlog),
    )
}

fn field<'a>(map: &'a Mapping, key: &str) -> Option<&'a Value> {
    map.get(key)
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn scalar_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Tags must be a sequence of non-empty strings; any other shape is rejected
fn parse_tags(value: &Value) -> Option<Vec<String>> {
    let seq = value.as_sequence()?;
    let mut tags = Vec::with_capacity(seq.len());
    for item in seq {
        match item {
            Value::String(s) if !s.trim().is_empty() => tags.push(s.clone()),
            _ => return None,
        }
    }
    Some(dedupe_tags(tags))
}

/// Frontmatter keys in their fixed on-disk order
#[derive(Serialize)]
struct FrontmatterOut<'a> {
    title: &'a str,
    #[serde(rename = "type")]
    ticket_type: &'a str,
    status: &'a str,
    tags: Vec<&'a str>,
    assignee: &'a str,
    priority: u8,
    points: u32,
}

/// Serialize a ticket to its file contents: frontmatter, separator, body,
/// trailing newline. Tags are written sorted.
pub fn serialize_ticket(ticket: &Ticket) -> String {
    let mut tags: Vec<&str> = ticket.tags.iter().map(|t| t.as_str()).collect();
    tags.sort_unstable();
    let out = FrontmatterOut {
        title: &ticket.title,
        ticket_type: ticket.ticket_type.as_str(),
        status: ticket.status.as_str(),
        tags,
        assignee: &ticket.assignee,
        priority: ticket.priority,
        points: ticket.points,
    };
    // Serializing a struct of strings and integers cannot fail
    let yaml = serde_yaml::to_string(&out).unwrap_or_default();
    format!("{}\n{}{}\n{}\n", DELIMITER, yaml, DELIMITER, ticket.body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn parses_full_frontmatter() {
        let text = "---\ntitle: Fix crash\ntype: bug\nstatus: in progress\ntags: [ui, api]\nassignee: sam\npriority: 1\npoints: 3\n---\nSteps to reproduce\n";
        let parsed = parse_ticket(text, "tiki-abc123", 10, now()).unwrap();
        let t = parsed.ticket;
        assert_eq!(t.id, "TIKI-ABC123");
        assert_eq!(t.title, "Fix crash");
        assert_eq!(t.ticket_type, TicketType::Bug);
        assert_eq!(t.status, Status::InProgress);
        assert_eq!(t.tags, vec!["ui".to_string(), "api".to_string()]);
        assert_eq!(t.assignee, "sam");
        assert_eq!(t.priority, 1);
        assert_eq!(t.points, 3);
        assert_eq!(t.body, "Steps to reproduce");
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn tags_true_yields_empty_set() {
        let text = "---\ntitle: Odd tags\ntags: true\npriority: 2\n---\nbody\n";
        let parsed = parse_ticket(text, "tiki-aaaaaa", 10, now()).unwrap();
        assert!(parsed.ticket.tags.is_empty());
        assert_eq!(parsed.ticket.ticket_type, TicketType::Story);
        assert_eq!(parsed.ticket.priority, 2);
        assert_eq!(parsed.warnings.len(), 1);
    }

    #[test]
    fn tags_with_non_string_item_yield_empty_set() {
        let text = "---\ntitle: T\ntags: [a, 3, b]\n---\n";
        let parsed = parse_ticket(text, "tiki-aaaaaa", 10, now()).unwrap();
        assert!(parsed.ticket.tags.is_empty());
    }

    #[test]
    fn out_of_range_priority_and_points() {
        let text = "---\ntitle: T\npriority: 0\npoints: -4\n---\n";
        let t = parse_ticket(text, "tiki-aaaaaa", 10, now()).unwrap().ticket;
        assert_eq!(t.priority, 3);
        assert_eq!(t.points, 5);

        let text = "---\ntitle: T\npriority: 6\npoints: 99\n---\n";
        let t = parse_ticket(text, "tiki-aaaaaa", 10, now()).unwrap().ticket;
        assert_eq!(t.priority, 3);
        assert_eq!(t.points, 5);
    }

    #[test]
    fn embedded_id_is_ignored_with_warning() {
        let text = "---\nid: TIKI-ZZZZZZ\ntitle: T\n---\n";
        let parsed = parse_ticket(text, "tiki-abc123", 10, now()).unwrap();
        assert_eq!(parsed.ticket.id, "TIKI-ABC123");
        assert_eq!(parsed.warnings.len(), 1);

        let text = "---\nid: tiki-abc123\ntitle: T\n---\n";
        let parsed = parse_ticket(text, "tiki-abc123", 10, now()).unwrap();
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn missing_delimiters_is_error() {
        assert!(matches!(
            parse_ticket("title: T\n", "tiki-aaaaaa", 10, now()),
            Err(FrontmatterError::MissingDelimiters)
        ));
        assert!(matches!(
            parse_ticket("---\ntitle: T\n", "tiki-aaaaaa", 10, now()),
            Err(FrontmatterError::MissingDelimiters)
        ));
    }

    #[test]
    fn missing_title_is_error() {
        assert!(matches!(
            parse_ticket("---\nstatus: ready\n---\n", "tiki-aaaaaa", 10, now()),
            Err(FrontmatterError::MissingTitle)
        ));
    }

    #[test]
    fn malformed_yaml_is_error() {
        assert!(matches!(
            parse_ticket("---\ntitle: [unclosed\n---\n", "tiki-aaaaaa", 10, now()),
            Err(FrontmatterError::Yaml(_))
        ));
    }

    #[test]
    fn serializes_in_fixed_order_with_sorted_tags() {
        let mut t = Ticket::template(10, now());
        t.id = "TIKI-ABC123".into();
        t.title = "Fix crash".into();
        t.tags = vec!["zeta".into(), "alpha".into()];
        t.body = "Body text".into();
        let out = serialize_ticket(&t);

        assert!(out.starts_with("---\ntitle: Fix crash\ntype: story\nstatus: backlog\ntags:\n"));
        let alpha = out.find("alpha").unwrap();
        let zeta = out.find("zeta").unwrap();
        assert!(alpha < zeta);
        let assignee = out.find("assignee:").unwrap();
        let priority = out.find("priority: 3").unwrap();
        let points = out.find("points: 5").unwrap();
        assert!(zeta < assignee && assignee < priority && priority < points);
        assert!(out.ends_with("---\nBody text\n"));
    }

    #[test]
    fn save_then_load_is_normalize() {
        let mut t = Ticket::template(10, now());
        t.id = "TIKI-ABC123".into();
        t.title = "yes".into(); // YAML-ambiguous scalar
        t.status = Status::Review;
        t.tags = vec!["b".into(), "a".into()];
        t.assignee = "alex".into();
        t.priority = 2;
        t.points = 8;
        t.body = "# Heading\n\n- item\n---\nnot a delimiter inside body".into();

        let text = serialize_ticket(&t);
        let loaded = parse_ticket(&text, "tiki-abc123", 10, now()).unwrap().ticket;

        let mut expected = t.clone();
        expected.tags.sort();
        assert_eq!(loaded, expected);
    }

    #[test]
    fn parse_status_only() {
        let text = "---\ntitle: T\nstatus: closed\n---\n";
        assert_eq!(parse_status(text), Some(Status::Done));
        assert_eq!(parse_status("no frontmatter"), None);
    }
}
