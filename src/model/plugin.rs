use std::fmt;
use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyModifiers};
use serde::{Deserialize, Serialize};

use crate::model::filter::FilterExpr;
use crate::model::ticket::{Status, TicketType};

/// Whether a plugin shows tickets in lanes or a markdown document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginKind {
    /// Lane board over tickets
    Tiki,
    /// Markdown document
    Doki,
}

/// How densely a board draws its cards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Compact,
    Expanded,
}

impl ViewMode {
    pub fn toggled(self) -> ViewMode {
        match self {
            ViewMode::Compact => ViewMode::Expanded,
            ViewMode::Expanded => ViewMode::Compact,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ViewMode::Compact => "compact",
            ViewMode::Expanded => "expanded",
        }
    }

    pub fn parse(s: &str) -> Option<ViewMode> {
        match s.trim().to_lowercase().as_str() {
            "compact" => Some(ViewMode::Compact),
            "expanded" => Some(ViewMode::Expanded),
            _ => None,
        }
    }
}

/// A key binding: key code plus modifier mask, with the printable rune
/// broken out so lookups can ignore Shift on printable characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub rune: Option<char>,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    /// A printable key with no modifiers
    pub fn rune(c: char) -> Self {
        KeyBinding {
            code: KeyCode::Char(c),
            rune: Some(c),
            modifiers: KeyModifiers::NONE,
        }
    }

    /// A non-printable key (or a printable key with Ctrl/Alt)
    pub fn key(code: KeyCode, modifiers: KeyModifiers) -> Self {
        KeyBinding {
            code,
            rune: None,
            modifiers,
        }
    }

    pub fn ctrl(c: char) -> Self {
        KeyBinding::key(KeyCode::Char(c), KeyModifiers::CONTROL)
    }
}

impl fmt::Display for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(c) = self.rune {
            return write!(f, "{}", c);
        }
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            f.write_str("Ctrl-")?;
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            f.write_str("Alt-")?;
        }
        if self.modifiers.contains(KeyModifiers::SHIFT) {
            f.write_str("Shift-")?;
        }
        match self.code {
            KeyCode::F(n) => write!(f, "F{}", n),
            KeyCode::Char(c) => write!(f, "{}", c.to_ascii_uppercase()),
            KeyCode::Enter => f.write_str("Enter"),
            KeyCode::Esc => f.write_str("Esc"),
            KeyCode::Tab => f.write_str("Tab"),
            KeyCode::BackTab => f.write_str("BackTab"),
            KeyCode::Up => f.write_str("Up"),
            KeyCode::Down => f.write_str("Down"),
            KeyCode::Left => f.write_str("Left"),
            KeyCode::Right => f.write_str("Right"),
            KeyCode::Backspace => f.write_str("Backspace"),
            KeyCode::Delete => f.write_str("Delete"),
            KeyCode::Home => f.write_str("Home"),
            KeyCode::End => f.write_str("End"),
            KeyCode::PageUp => f.write_str("PgUp"),
            KeyCode::PageDown => f.write_str("PgDn"),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Sortable ticket fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Priority,
    Title,
    Status,
    UpdatedAt,
    CreatedAt,
    Points,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One key of a multi-key sort
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortRule {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortRule {
    pub fn asc(field: SortField) -> Self {
        SortRule {
            field,
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: SortField) -> Self {
        SortRule {
            field,
            direction: SortDirection::Desc,
        }
    }
}

/// Sort applied when a plugin does not specify one
pub fn default_sort() -> Vec<SortRule> {
    vec![
        SortRule::asc(SortField::Priority),
        SortRule::asc(SortField::Title),
    ]
}

/// Something a shortcut or lane can do to the selected ticket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketAction {
    SetStatus(Status),
    SetType(TicketType),
    AddTag(String),
    RemoveTag(String),
    SetPriority(u8),
    SetPoints(u32),
    Delete,
    OpenDetail,
    OpenEdit,
    NewTicket,
}

impl TicketAction {
    /// Whether the action edits fields of an existing ticket in place
    pub fn is_field_update(&self) -> bool {
        matches!(
            self,
            TicketAction::SetStatus(_)
                | TicketAction::SetType(_)
                | TicketAction::AddTag(_)
                | TicketAction::RemoveTag(_)
                | TicketAction::SetPriority(_)
                | TicketAction::SetPoints(_)
        )
    }
}

/// A lane of a board plugin
#[derive(Debug, Clone, PartialEq)]
pub struct Lane {
    pub name: String,
    /// Grid width, always >= 1
    pub columns: usize,
    pub filter: FilterExpr,
    /// Applied when a ticket is moved into this lane
    pub action: Option<TicketAction>,
}

/// A plugin-declared shortcut on the selected ticket
#[derive(Debug, Clone, PartialEq)]
pub struct ShortcutAction {
    pub key: KeyBinding,
    pub label: String,
    pub action: TicketAction,
}

/// Where a plugin definition came from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PluginSource {
    /// Workflow file that last defined or overrode the plugin; `None` when embedded
    pub path: Option<PathBuf>,
    /// Index in that file's `views` array
    pub index: Option<usize>,
}

/// Where a document plugin gets its text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocFetcher {
    /// Text embedded in the workflow entry
    Internal,
    /// Markdown file relative to the project config directory
    File,
}

/// A fully validated plugin, immutable after startup
#[derive(Debug, Clone, PartialEq)]
pub struct PluginDescriptor {
    pub name: String,
    pub activation_key: KeyBinding,
    pub source: PluginSource,
    pub kind: PluginKind,
    pub default: bool,
    pub lanes: Vec<Lane>,
    pub sort: Vec<SortRule>,
    pub view_mode: ViewMode,
    pub actions: Vec<ShortcutAction>,
    pub fetcher: Option<DocFetcher>,
    pub text: Option<String>,
    pub url: Option<String>,
}

impl PluginDescriptor {
    pub fn is_board(&self) -> bool {
        self.kind == PluginKind::Tiki
    }

    pub fn lane(&self, idx: usize) -> Option<&Lane> {
        self.lanes.get(idx)
    }

    /// Position of the first lane whose action sets the given status
    pub fn lane_for_status(&self, status: Status) -> Option<usize> {
        self.lanes
            .iter()
            .position(|l| l.action == Some(TicketAction::SetStatus(status)))
    }
}
