use serde_yaml::Value;
use tracing::error;

use crate::model::workflow::VIEWS_KEY;

/// Built-in plugins. User workflow files override these by name.
/// `tiki init` writes this document as the starter `workflow.yaml`.
pub const DEFAULT_WORKFLOW_YAML: &str = r#"views:
  - name: Kanban
    key: F1
    type: tiki
    default: true
    view: compact
    sort: [priority, title]
    lanes:
      - name: Backlog
        filter: status=backlog
        action: status=backlog
      - name: Ready
        filter: status=ready
        action: status=ready
      - name: In Progress
        filter: status=in_progress
        action: status=in_progress
      - name: Review
        filter: status=review
        action: status=review
      - name: Done
        filter: status=done
        action: status=done
  - name: Docs
    key: F2
    type: doki
    fetcher: file
    url: index.md
  - name: Backlog
    key: F3
    type: tiki
    view: compact
    lanes:
      - name: Backlog
        columns: 3
        filter: status=backlog
    actions:
      - key: b
        label: Bug
        action: type=bug
      - key: r
        label: Ready
        action: status=ready
  - name: Recent
    key: F4
    type: tiki
    view: expanded
    sort: ["updated:desc"]
    lanes:
      - name: Recent
        columns: 2
        filter: updated<=7d
  - name: Roadmap
    key: F5
    type: tiki
    view: expanded
    lanes:
      - name: Now
        filter: tag=now
        action: tags+=now
      - name: Next
        filter: tag=next
        action: tags+=next
      - name: Later
        filter: tag=later
        action: tags+=later
  - name: Help
    key: "?"
    type: doki
    fetcher: internal
"#;

/// Text shown by the built-in Help plugin
pub const HELP_TEXT: &str = "\
# tiki

Tickets are markdown files with YAML frontmatter, one per file.

## Boards

  arrows / hjkl   move the selection inside a lane
  Tab / S-Tab     next / previous lane
  S-Left S-Right  move the ticket to the adjacent lane
  Enter           open ticket
  e               edit ticket
  n               new ticket
  d               delete ticket (y to confirm)
  /               search; Enter to run, Esc to clear
  v               toggle compact / expanded cards

## Editing

  Tab / S-Tab     next / previous field
  Up / Down       cycle status, type, priority, points, assignee
  Ctrl-S          save
  Ctrl-Enter      save and close (from the title)
  Ctrl-R          reload after a conflict
  Esc             discard changes

## Anywhere

  F1..F5          switch plugin
  ?               this help
  Esc             back
  q / Ctrl-C      quit
";

/// Embedded plugin entries as raw YAML values, in declaration order
pub fn embedded_views() -> Vec<Value> {
    let doc: Value = match serde_yaml::from_str(DEFAULT_WORKFLOW_YAML) {
        Ok(doc) => doc,
        Err(e) => {
            error!("embedded workflow is invalid: {}", e);
            return Vec::new();
        }
    };
    doc.get(VIEWS_KEY)
        .and_then(Value::as_sequence)
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::workflow::PluginEntry;

    #[test]
    fn embedded_views_are_valid_entries() {
        let views = embedded_views();
        assert_eq!(views.len(), 6);
        let names: Vec<String> = views
            .into_iter()
            .map(|v| serde_yaml::from_value::<PluginEntry>(v).unwrap().name.unwrap())
            .collect();
        assert_eq!(
            names,
            vec!["Kanban", "Docs", "Backlog", "Recent", "Roadmap", "Help"]
        );
    }
}
