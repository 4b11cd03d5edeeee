use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::io::atomic::atomic_write;

/// Persisted TUI state (written to .tiki-state.json)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct UiState {
    /// Plugin that was showing when the app last exited
    #[serde(default)]
    pub active_plugin: Option<String>,
    /// Per-plugin board state, keyed by plugin name
    #[serde(default)]
    pub plugins: HashMap<String, PluginUiState>,
}

/// Per-plugin board state
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PluginUiState {
    #[serde(default)]
    pub selected_lane: usize,
    /// Selected index per lane, by lane position
    #[serde(default)]
    pub lane_selection: Vec<usize>,
    /// Scroll offset per lane, in grid rows
    #[serde(default)]
    pub lane_scroll: Vec<usize>,
}

/// Read the state file; a missing or malformed file is treated as absent
pub fn read_ui_state(path: &Path) -> Option<UiState> {
    let content = fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

/// Write the state file
pub fn write_ui_state(path: &Path, state: &UiState) -> Result<(), std::io::Error> {
    let content = serde_json::to_string_pretty(state)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    atomic_write(path, content.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_and_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".doc/.tiki-state.json");
        let mut state = UiState {
            active_plugin: Some("Roadmap".into()),
            ..Default::default()
        };
        state.plugins.insert(
            "Kanban".into(),
            PluginUiState {
                selected_lane: 2,
                lane_selection: vec![0, 3, 1],
                lane_scroll: vec![0, 2, 0],
            },
        );

        write_ui_state(&path, &state).unwrap();
        assert_eq!(read_ui_state(&path), Some(state));
    }

    #[test]
    fn read_missing_file_returns_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_ui_state(&dir.path().join("nope.json")).is_none());
    }

    #[test]
    fn read_malformed_json_returns_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "not json {{{").unwrap();
        assert!(read_ui_state(&path).is_none());
    }

    #[test]
    fn serde_defaults_on_minimal_object() {
        let state: UiState = serde_json::from_str("{}").unwrap();
        assert!(state.active_plugin.is_none());
        assert!(state.plugins.is_empty());
        let p: PluginUiState = serde_json::from_str("{}").unwrap();
        assert_eq!(p.selected_lane, 0);
    }
}
