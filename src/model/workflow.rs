use serde::{Deserialize, Serialize};

/// Top-level key holding the plugin list in `workflow.yaml`
pub const VIEWS_KEY: &str = "views";

/// One entry of the `views` list as written by the user.
///
/// Every field is optional so an entry can override only part of an
/// embedded or earlier plugin with the same name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub default: Option<bool>,
    #[serde(default)]
    pub view: Option<String>,
    #[serde(default)]
    pub sort: Option<SortSpec>,
    #[serde(default)]
    pub lanes: Option<Vec<LaneEntry>>,
    #[serde(default)]
    pub actions: Option<Vec<ActionEntry>>,
    #[serde(default)]
    pub fetcher: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// Accepted for compatibility with older files; colors are not modeled
    #[serde(default, skip_serializing)]
    pub foreground: Option<String>,
    #[serde(default, skip_serializing)]
    pub background: Option<String>,
}

/// `sort:` accepts either a list of specs or one comma-separated string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortSpec {
    List(Vec<String>),
    Inline(String),
}

impl SortSpec {
    pub fn tokens(&self) -> Vec<String> {
        match self {
            SortSpec::List(items) => items.clone(),
            SortSpec::Inline(s) => s.split(',').map(|p| p.trim().to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaneEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub columns: Option<i64>,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionEntry {
    pub key: String,
    #[serde(default)]
    pub label: Option<String>,
    pub action: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_entry_with_lanes() {
        let yaml = r#"
name: Kanban
key: F1
lanes:
  - name: Ready
    columns: 2
    filter: status=ready
    action: status=ready
actions:
  - key: b
    label: Bug
    action: type=bug
"#;
        let entry: PluginEntry = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(entry.name.as_deref(), Some("Kanban"));
        let lanes = entry.lanes.unwrap();
        assert_eq!(lanes[0].columns, Some(2));
        assert_eq!(entry.actions.unwrap()[0].action, "type=bug");
    }

    #[test]
    fn sort_spec_forms() {
        let list: SortSpec = serde_yaml::from_str("[priority, 'title:desc']").unwrap();
        assert_eq!(list.tokens(), vec!["priority", "title:desc"]);
        let inline: SortSpec = serde_yaml::from_str("'priority, title:desc'").unwrap();
        assert_eq!(inline.tokens(), vec!["priority", "title:desc"]);
    }

    #[test]
    fn unknown_entry_field_is_rejected() {
        let err = serde_yaml::from_str::<PluginEntry>("name: X\nbogus: 1\n");
        assert!(err.is_err());
    }
}
