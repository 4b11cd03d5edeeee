use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::io::state::PluginUiState;
use crate::model::plugin::{PluginDescriptor, ViewMode};
use crate::tui::nav::{ListenerId, ViewLifecycle};

/// Where the selection was before a search, so Esc can put it back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSnapshot {
    /// Single-lane board
    Grid { index: usize },
    Lane { lane: usize, row: usize },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SearchState {
    #[default]
    Inactive,
    Active {
        query: String,
        /// Matching ticket ids
        results: Vec<String>,
        snapshot: SelectionSnapshot,
    },
}

impl SearchState {
    pub fn is_active(&self) -> bool {
        matches!(self, SearchState::Active { .. })
    }

    pub fn query(&self) -> Option<&str> {
        match self {
            SearchState::Active { query, .. } => Some(query),
            SearchState::Inactive => None,
        }
    }

    /// Whether a ticket passes the search; everything passes when inactive
    pub fn allows(&self, ticket_id: &str) -> bool {
        match self {
            SearchState::Active { results, .. } => results.iter().any(|r| r == ticket_id),
            SearchState::Inactive => true,
        }
    }
}

/// Selected index and scroll offset (in grid rows) of one lane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LaneCursor {
    pub index: usize,
    pub scroll: usize,
}

#[derive(Debug, Clone)]
struct RuntimeState {
    selected_lane: usize,
    lanes: Vec<LaneCursor>,
    view_mode: ViewMode,
    search: SearchState,
}

type Listener = Arc<dyn Fn() + Send + Sync>;

/// Mutable board state for one plugin. Outlives the board view so
/// selection, display mode and search survive navigation.
pub struct PluginRuntimeConfig {
    name: String,
    state: Mutex<RuntimeState>,
    listeners: Mutex<(ListenerId, BTreeMap<ListenerId, Listener>)>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl PluginRuntimeConfig {
    pub fn new(plugin: &PluginDescriptor) -> Self {
        PluginRuntimeConfig {
            name: plugin.name.clone(),
            state: Mutex::new(RuntimeState {
                selected_lane: 0,
                lanes: vec![LaneCursor::default(); plugin.lanes.len()],
                view_mode: plugin.view_mode,
                search: SearchState::Inactive,
            }),
            listeners: Mutex::new((0, BTreeMap::new())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn selected_lane(&self) -> usize {
        lock(&self.state).selected_lane
    }

    pub fn lane_count(&self) -> usize {
        lock(&self.state).lanes.len()
    }

    pub fn lane_cursor(&self, lane: usize) -> LaneCursor {
        lock(&self.state).lanes.get(lane).copied().unwrap_or_default()
    }

    pub fn select_lane(&self, lane: usize) {
        let changed = {
            let mut state = lock(&self.state);
            let changed = lane < state.lanes.len() && state.selected_lane != lane;
            if changed {
                state.selected_lane = lane;
            }
            changed
        };
        if changed {
            self.notify();
        }
    }

    pub fn set_lane_index(&self, lane: usize, index: usize) {
        let changed = {
            let mut state = lock(&self.state);
            match state.lanes.get_mut(lane) {
                Some(cursor) if cursor.index != index => {
                    cursor.index = index;
                    true
                }
                _ => false,
            }
        };
        if changed {
            self.notify();
        }
    }

    /// Record the scroll offset chosen at render time. Not a notifying change.
    pub fn set_lane_scroll(&self, lane: usize, scroll: usize) {
        if let Some(cursor) = lock(&self.state).lanes.get_mut(lane) {
            cursor.scroll = scroll;
        }
    }

    pub fn view_mode(&self) -> ViewMode {
        lock(&self.state).view_mode
    }

    pub fn set_view_mode(&self, mode: ViewMode) {
        let changed = {
            let mut state = lock(&self.state);
            let changed = state.view_mode != mode;
            state.view_mode = mode;
            changed
        };
        if changed {
            self.notify();
        }
    }

    pub fn search(&self) -> SearchState {
        lock(&self.state).search.clone()
    }

    /// Enter search with the given hits. The selection before the first
    /// search is kept so clearing restores it; a repeated search keeps the
    /// original snapshot.
    pub fn start_search(&self, query: &str, results: Vec<String>) {
        {
            let mut state = lock(&self.state);
            let snapshot = match &state.search {
                SearchState::Active { snapshot, .. } => *snapshot,
                SearchState::Inactive => snapshot_of(&state),
            };
            state.search = SearchState::Active {
                query: query.to_string(),
                results,
                snapshot,
            };
            let lane = state.selected_lane;
            if let Some(cursor) = state.lanes.get_mut(lane) {
                *cursor = LaneCursor::default();
            }
        }
        self.notify();
    }

    /// Leave search and restore the selection from before it.
    /// Returns false when no search was active.
    pub fn clear_search(&self) -> bool {
        {
            let mut state = lock(&self.state);
            let SearchState::Active { snapshot, .. } = std::mem::take(&mut state.search) else {
                return false;
            };
            let (lane, row) = match snapshot {
                SelectionSnapshot::Grid { index } => (0, index),
                SelectionSnapshot::Lane { lane, row } => (lane, row),
            };
            if lane < state.lanes.len() {
                state.selected_lane = lane;
                state.lanes[lane].index = row;
            }
        }
        self.notify();
        true
    }

    /// Apply selection and scroll saved from an earlier session. Render
    /// clamps both to what the lanes hold now.
    pub fn restore(&self, saved: &PluginUiState) {
        let mut state = lock(&self.state);
        if saved.selected_lane < state.lanes.len() {
            state.selected_lane = saved.selected_lane;
        }
        for (cursor, &index) in state.lanes.iter_mut().zip(&saved.lane_selection) {
            cursor.index = index;
        }
        for (cursor, &scroll) in state.lanes.iter_mut().zip(&saved.lane_scroll) {
            cursor.scroll = scroll;
        }
    }

    pub fn to_ui_state(&self) -> PluginUiState {
        let state = lock(&self.state);
        PluginUiState {
            selected_lane: state.selected_lane,
            lane_selection: state.lanes.iter().map(|c| c.index).collect(),
            lane_scroll: state.lanes.iter().map(|c| c.scroll).collect(),
        }
    }

    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut guard = lock(&self.listeners);
        guard.0 += 1;
        let id = guard.0;
        guard.1.insert(id, Arc::new(listener));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        lock(&self.listeners).1.remove(&id).is_some()
    }

    fn notify(&self) {
        let listeners: Vec<Listener> = lock(&self.listeners).1.values().cloned().collect();
        for listener in listeners {
            listener();
        }
    }
}

fn snapshot_of(state: &RuntimeState) -> SelectionSnapshot {
    let index = state
        .lanes
        .get(state.selected_lane)
        .map_or(0, |c| c.index);
    if state.lanes.len() == 1 {
        SelectionSnapshot::Grid { index }
    } else {
        SelectionSnapshot::Lane {
            lane: state.selected_lane,
            row: index,
        }
    }
}

impl ViewLifecycle for PluginRuntimeConfig {
    /// Coming back to a board rebuilds its lanes
    fn on_focus(&self) {
        self.notify();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::workflow_io::load_plugins;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn config(name: &str) -> PluginRuntimeConfig {
        let loaded = load_plugins(&[]);
        PluginRuntimeConfig::new(loaded.by_name(name).unwrap())
    }

    #[test]
    fn search_restores_lane_selection() {
        let cfg = config("Kanban");
        cfg.select_lane(2);
        cfg.set_lane_index(2, 4);

        cfg.start_search("login", vec!["TIKI-AAAAAA".into()]);
        assert_eq!(cfg.lane_cursor(2).index, 0);
        assert!(cfg.search().allows("TIKI-AAAAAA"));
        assert!(!cfg.search().allows("TIKI-BBBBBB"));

        cfg.select_lane(0);
        assert!(cfg.clear_search());
        assert_eq!(cfg.selected_lane(), 2);
        assert_eq!(cfg.lane_cursor(2).index, 4);
        assert!(!cfg.clear_search());
    }

    #[test]
    fn single_lane_board_snapshots_grid_index() {
        let cfg = config("Backlog");
        cfg.set_lane_index(0, 7);
        cfg.start_search("x", vec![]);
        let SearchState::Active { snapshot, .. } = cfg.search() else {
            panic!("search should be active");
        };
        assert_eq!(snapshot, SelectionSnapshot::Grid { index: 7 });
    }

    #[test]
    fn repeated_search_keeps_first_snapshot() {
        let cfg = config("Kanban");
        cfg.set_lane_index(0, 3);
        cfg.start_search("a", vec![]);
        cfg.set_lane_index(0, 1);
        cfg.start_search("ab", vec![]);
        cfg.clear_search();
        assert_eq!(cfg.lane_cursor(0).index, 3);
    }

    #[test]
    fn listeners_fire_on_changes_only() {
        let cfg = config("Kanban");
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let id = cfg.add_listener(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(id, 1);

        cfg.set_view_mode(ViewMode::Expanded);
        cfg.set_view_mode(ViewMode::Expanded);
        cfg.set_lane_scroll(0, 5);
        cfg.select_lane(99);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        assert!(cfg.remove_listener(id));
        cfg.set_view_mode(ViewMode::Compact);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn ui_state_round_trip_ignores_extra_lanes() {
        let cfg = config("Kanban");
        cfg.restore(&PluginUiState {
            selected_lane: 1,
            lane_selection: vec![2, 3, 0, 0, 0, 9, 9],
            lane_scroll: vec![0, 1],
        });
        assert_eq!(cfg.selected_lane(), 1);
        let saved = cfg.to_ui_state();
        assert_eq!(saved.lane_selection, vec![2, 3, 0, 0, 0]);
        assert_eq!(saved.lane_scroll, vec![0, 1, 0, 0, 0]);
    }

    #[test]
    fn scroll_offset_survives_a_session() {
        let cfg = config("Kanban");
        cfg.set_lane_index(1, 12);
        cfg.set_lane_scroll(1, 4);
        let saved = cfg.to_ui_state();

        let next = config("Kanban");
        next.restore(&saved);
        assert_eq!(
            next.lane_cursor(1),
            LaneCursor {
                index: 12,
                scroll: 4
            }
        );
    }
}
