use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::model::plugin::{KeyBinding, PluginDescriptor};
use crate::tui::views::edit::{EditField, FieldKind};

/// Stable identifier of something a key can trigger
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionId {
    // Global
    Quit,
    Back,
    Refresh,
    ToggleHeader,
    ActivatePlugin(String),

    // Board
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    NextLane,
    PrevLane,
    MoveTicketLeft,
    MoveTicketRight,
    Search,
    ClearSearch,
    ToggleViewMode,
    OpenDetail,
    EditTicket,
    NewTicket,
    DeleteTicket,
    /// Plugin shortcut, by position in the plugin's `actions`
    Shortcut(usize),

    // Detail and document
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
    AddComment,

    // Edit
    NextField,
    PrevField,
    Save,
    QuickSave,
    Cancel,
    NextValue,
    PrevValue,
    Reload,
}

/// A key bound to an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub id: ActionId,
    pub key: KeyCode,
    /// Printable character for rune bindings; looked up ignoring Shift
    pub rune: Option<char>,
    pub modifiers: KeyModifiers,
    pub label: String,
    /// Whether the key hint appears in the status row
    pub show_in_header: bool,
}

impl Action {
    pub fn new(id: ActionId, binding: KeyBinding, label: &str) -> Self {
        Action {
            id,
            key: binding.code,
            rune: binding.rune,
            modifiers: binding.modifiers,
            label: label.to_string(),
            show_in_header: true,
        }
    }

    /// Same as [`Action::new`] but left out of the key hints
    pub fn hidden(id: ActionId, binding: KeyBinding, label: &str) -> Self {
        Action {
            show_in_header: false,
            ..Action::new(id, binding, label)
        }
    }

    pub fn binding(&self) -> KeyBinding {
        KeyBinding {
            code: self.key,
            rune: self.rune,
            modifiers: self.modifiers,
        }
    }

    fn conflicts_with(&self, other: &Action) -> bool {
        match (self.rune, other.rune) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.key == other.key && self.modifiers == other.modifiers,
            _ => false,
        }
    }
}

/// Ordered set of key bindings with lookup tables for key events
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    actions: Vec<Action>,
    by_key: HashMap<(KeyCode, KeyModifiers), usize>,
    by_rune: HashMap<char, usize>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_actions(actions: impl IntoIterator<Item = Action>) -> Self {
        let mut registry = ActionRegistry::new();
        for action in actions {
            registry.register(action);
        }
        registry
    }

    /// Add a binding. A binding for the same key replaces the earlier one
    /// in place.
    pub fn register(&mut self, action: Action) {
        match self.actions.iter().position(|a| a.conflicts_with(&action)) {
            Some(idx) => self.actions[idx] = action,
            None => self.actions.push(action),
        }
        self.reindex();
    }

    fn reindex(&mut self) {
        self.by_key.clear();
        self.by_rune.clear();
        for (i, action) in self.actions.iter().enumerate() {
            match action.rune {
                Some(c) => {
                    self.by_rune.insert(c, i);
                }
                None => {
                    self.by_key.insert((action.key, action.modifiers), i);
                }
            }
        }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Actions whose key hints are shown, in registration order
    pub fn header_actions(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter(|a| a.show_in_header)
    }

    /// Find the action bound to a key event.
    ///
    /// Printable characters typed with at most Shift go through the rune
    /// table; everything else needs an exact key and modifier match.
    pub fn match_event(&self, event: &KeyEvent) -> Option<&Action> {
        if let KeyCode::Char(c) = event.code
            && event.modifiers.difference(KeyModifiers::SHIFT).is_empty()
            && let Some(&idx) = self.by_rune.get(&c)
        {
            return self.actions.get(idx);
        }
        self.by_key
            .get(&(event.code, event.modifiers))
            .and_then(|&idx| self.actions.get(idx))
    }

    /// Combine two registries. Bindings from `other` win over conflicting
    /// bindings here and take their place in the order.
    pub fn merge(&self, other: &ActionRegistry) -> ActionRegistry {
        let mut merged = self.clone();
        for action in &other.actions {
            merged.register(action.clone());
        }
        merged
    }
}

/// Normalize terminal quirks so bindings match: Shift+letter arrives as the
/// uppercase rune, and BackTab never carries Shift.
pub fn normalize_key(mut key: KeyEvent) -> KeyEvent {
    match key.code {
        KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::SHIFT) => {
            if c.is_ascii_lowercase() {
                key.code = KeyCode::Char(c.to_ascii_uppercase());
            }
        }
        KeyCode::BackTab => key.modifiers.remove(KeyModifiers::SHIFT),
        _ => {}
    }
    key
}

fn plain(code: KeyCode) -> KeyBinding {
    KeyBinding::key(code, KeyModifiers::NONE)
}

fn shifted(code: KeyCode) -> KeyBinding {
    KeyBinding::key(code, KeyModifiers::SHIFT)
}

/// Bindings available in every view
pub fn global_registry(plugins: &[PluginDescriptor]) -> ActionRegistry {
    let mut registry = ActionRegistry::from_actions([
        Action::new(ActionId::Quit, KeyBinding::rune('q'), "quit"),
        Action::hidden(ActionId::Quit, KeyBinding::ctrl('c'), "quit"),
        Action::hidden(ActionId::Back, plain(KeyCode::Esc), "back"),
        Action::hidden(ActionId::Refresh, KeyBinding::ctrl('r'), "refresh"),
        Action::hidden(ActionId::ToggleHeader, KeyBinding::rune('H'), "header"),
    ]);
    for plugin in plugins {
        registry.register(Action::hidden(
            ActionId::ActivatePlugin(plugin.name.clone()),
            plugin.activation_key,
            &plugin.name,
        ));
    }
    registry
}

/// Shortcut actions declared by a plugin
pub fn plugin_registry(plugin: &PluginDescriptor) -> ActionRegistry {
    ActionRegistry::from_actions(
        plugin
            .actions
            .iter()
            .enumerate()
            .map(|(i, s)| Action::new(ActionId::Shortcut(i), s.key, &s.label)),
    )
}

pub fn board_registry() -> ActionRegistry {
    ActionRegistry::from_actions([
        Action::hidden(ActionId::MoveLeft, plain(KeyCode::Left), "left"),
        Action::hidden(ActionId::MoveRight, plain(KeyCode::Right), "right"),
        Action::hidden(ActionId::MoveUp, plain(KeyCode::Up), "up"),
        Action::hidden(ActionId::MoveDown, plain(KeyCode::Down), "down"),
        Action::hidden(ActionId::MoveLeft, KeyBinding::rune('h'), "left"),
        Action::hidden(ActionId::MoveRight, KeyBinding::rune('l'), "right"),
        Action::hidden(ActionId::MoveUp, KeyBinding::rune('k'), "up"),
        Action::hidden(ActionId::MoveDown, KeyBinding::rune('j'), "down"),
        Action::new(ActionId::NextLane, plain(KeyCode::Tab), "lane"),
        Action::hidden(ActionId::PrevLane, plain(KeyCode::BackTab), "prev lane"),
        Action::new(ActionId::MoveTicketLeft, shifted(KeyCode::Left), "move"),
        Action::hidden(ActionId::MoveTicketRight, shifted(KeyCode::Right), "move"),
        Action::new(ActionId::Search, KeyBinding::rune('/'), "search"),
        Action::hidden(ActionId::ClearSearch, plain(KeyCode::Esc), "clear"),
        Action::new(ActionId::ToggleViewMode, KeyBinding::rune('v'), "view"),
        Action::new(ActionId::OpenDetail, plain(KeyCode::Enter), "open"),
        Action::new(ActionId::EditTicket, KeyBinding::rune('e'), "edit"),
        Action::new(ActionId::NewTicket, KeyBinding::rune('n'), "new"),
        Action::new(ActionId::DeleteTicket, KeyBinding::rune('d'), "delete"),
    ])
}

pub fn detail_registry() -> ActionRegistry {
    ActionRegistry::from_actions([
        Action::new(ActionId::EditTicket, KeyBinding::rune('e'), "edit"),
        Action::new(ActionId::AddComment, KeyBinding::rune('c'), "comment"),
        Action::hidden(ActionId::ScrollUp, plain(KeyCode::Up), "up"),
        Action::hidden(ActionId::ScrollDown, plain(KeyCode::Down), "down"),
        Action::hidden(ActionId::ScrollUp, KeyBinding::rune('k'), "up"),
        Action::hidden(ActionId::ScrollDown, KeyBinding::rune('j'), "down"),
        Action::new(ActionId::Back, plain(KeyCode::Esc), "back"),
    ])
}

pub fn doc_registry() -> ActionRegistry {
    ActionRegistry::from_actions([
        Action::hidden(ActionId::ScrollUp, plain(KeyCode::Up), "up"),
        Action::hidden(ActionId::ScrollDown, plain(KeyCode::Down), "down"),
        Action::hidden(ActionId::ScrollUp, KeyBinding::rune('k'), "up"),
        Action::hidden(ActionId::ScrollDown, KeyBinding::rune('j'), "down"),
        Action::new(ActionId::PageUp, plain(KeyCode::PageUp), "page up"),
        Action::new(ActionId::PageDown, plain(KeyCode::PageDown), "page down"),
    ])
}

/// Bindings for the edit view while `field` has focus
pub fn edit_field_registry(field: EditField) -> ActionRegistry {
    let mut registry = ActionRegistry::from_actions([
        Action::new(ActionId::NextField, plain(KeyCode::Tab), "next"),
        Action::hidden(ActionId::PrevField, plain(KeyCode::BackTab), "prev"),
        Action::new(ActionId::Save, KeyBinding::ctrl('s'), "save"),
        Action::new(ActionId::Cancel, plain(KeyCode::Esc), "cancel"),
    ]);
    if field == EditField::Title {
        registry.register(Action::new(
            ActionId::QuickSave,
            KeyBinding::key(KeyCode::Enter, KeyModifiers::CONTROL),
            "save & close",
        ));
        registry.register(Action::hidden(
            ActionId::QuickSave,
            KeyBinding::key(KeyCode::Enter, KeyModifiers::ALT),
            "save & close",
        ));
    }
    match field.kind() {
        FieldKind::Enum | FieldKind::Integer => {
            registry.register(Action::new(ActionId::NextValue, plain(KeyCode::Down), "next value"));
            registry.register(Action::hidden(ActionId::PrevValue, plain(KeyCode::Up), "prev value"));
        }
        FieldKind::Completion => {
            registry.register(Action::new(ActionId::NextValue, plain(KeyCode::Down), "complete"));
            registry.register(Action::hidden(ActionId::PrevValue, plain(KeyCode::Up), "complete"));
        }
        FieldKind::Text | FieldKind::Multiline => {}
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventKind;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        let mut event = KeyEvent::new(code, modifiers);
        event.kind = KeyEventKind::Press;
        event
    }

    fn char_key(c: char) -> KeyEvent {
        press(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn quick_search() -> ActionRegistry {
        ActionRegistry::from_actions([Action::new(
            ActionId::Shortcut(0),
            KeyBinding::rune('q'),
            "QuickSearch",
        )])
    }

    #[test]
    fn plugin_binding_shadows_global_on_board() {
        let global = global_registry(&[]);
        let board = global.merge(&quick_search()).merge(&board_registry());
        let action = board.match_event(&char_key('q')).unwrap();
        assert_eq!(action.id, ActionId::Shortcut(0));
        assert_eq!(action.label, "QuickSearch");
    }

    #[test]
    fn detail_view_keeps_global_binding() {
        let detail = global_registry(&[]).merge(&detail_registry());
        assert_eq!(
            detail.match_event(&char_key('q')).map(|a| &a.id),
            Some(&ActionId::Quit)
        );
    }

    #[test]
    fn merge_replaces_in_place_and_appends_new() {
        let a = ActionRegistry::from_actions([
            Action::new(ActionId::Quit, KeyBinding::rune('q'), "quit"),
            Action::new(ActionId::Search, KeyBinding::rune('/'), "search"),
        ]);
        let b = ActionRegistry::from_actions([
            Action::new(ActionId::NewTicket, KeyBinding::rune('n'), "new"),
            Action::new(ActionId::Shortcut(0), KeyBinding::rune('q'), "quick"),
        ]);
        let merged = a.merge(&b);
        let ids: Vec<&ActionId> = merged.actions().iter().map(|a| &a.id).collect();
        assert_eq!(
            ids,
            vec![&ActionId::Shortcut(0), &ActionId::Search, &ActionId::NewTicket]
        );
    }

    #[test]
    fn rune_lookup_ignores_shift_only() {
        let registry = ActionRegistry::from_actions([Action::new(
            ActionId::Search,
            KeyBinding::rune('?'),
            "help",
        )]);
        assert!(registry.match_event(&press(KeyCode::Char('?'), KeyModifiers::SHIFT)).is_some());
        assert!(registry.match_event(&press(KeyCode::Char('?'), KeyModifiers::CONTROL)).is_none());
    }

    #[test]
    fn modifier_mismatch_never_matches() {
        let registry = board_registry();
        let left = registry.match_event(&press(KeyCode::Left, KeyModifiers::NONE)).unwrap();
        assert_eq!(left.id, ActionId::MoveLeft);
        let moved = registry.match_event(&press(KeyCode::Left, KeyModifiers::SHIFT)).unwrap();
        assert_eq!(moved.id, ActionId::MoveTicketLeft);
        assert!(registry.match_event(&press(KeyCode::Left, KeyModifiers::CONTROL)).is_none());
    }

    #[test]
    fn ctrl_s_is_a_key_binding() {
        let registry = edit_field_registry(EditField::Description);
        assert_eq!(
            registry.match_event(&press(KeyCode::Char('s'), KeyModifiers::CONTROL)).map(|a| &a.id),
            Some(&ActionId::Save)
        );
        assert!(registry.match_event(&char_key('s')).is_none());
    }

    #[test]
    fn edit_field_registries() {
        let ids = |field| -> Vec<ActionId> {
            edit_field_registry(field).actions().iter().map(|a| a.id.clone()).collect()
        };
        assert_eq!(
            ids(EditField::Title),
            vec![
                ActionId::NextField,
                ActionId::PrevField,
                ActionId::Save,
                ActionId::Cancel,
                ActionId::QuickSave,
                ActionId::QuickSave,
            ]
        );
        assert!(ids(EditField::Status).contains(&ActionId::NextValue));
        assert!(ids(EditField::Points).contains(&ActionId::PrevValue));
        assert!(ids(EditField::Assignee).contains(&ActionId::NextValue));
        assert!(!ids(EditField::Description).contains(&ActionId::NextValue));
        assert!(!ids(EditField::Status).contains(&ActionId::QuickSave));
        // Deterministic
        assert_eq!(ids(EditField::Priority), ids(EditField::Priority));
    }

    #[test]
    fn normalize_shift_letters_and_backtab() {
        let key = normalize_key(press(KeyCode::Char('d'), KeyModifiers::SHIFT));
        assert_eq!(key.code, KeyCode::Char('D'));
        let key = normalize_key(press(KeyCode::BackTab, KeyModifiers::SHIFT));
        assert_eq!(key.modifiers, KeyModifiers::NONE);
    }

    #[test]
    fn header_actions_skip_hidden() {
        let registry = detail_registry();
        let labels: Vec<&str> = registry
            .header_actions()
            .map(|a| a.label.as_str())
            .collect();
        assert_eq!(labels, vec!["edit", "comment", "back"]);
    }
}
