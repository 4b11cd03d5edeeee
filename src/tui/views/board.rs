use std::sync::Arc;

use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::warn;

use crate::io::workflow_io::save_view_mode;
use crate::model::plugin::{PluginDescriptor, TicketAction};
use crate::model::ticket::Ticket;
use crate::ops::filter::{FilterContext, apply};
use crate::ops::sort::sort_tickets;
use crate::ops::ticket_ops::{Applied, apply_action};
use crate::tui::actions::ActionId;
use crate::tui::context::AppContext;
use crate::tui::params::NavFrame;
use crate::tui::plugin_config::PluginRuntimeConfig;
use crate::util::unicode::pop_grapheme;

use super::{NavCommand, Outcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridDirection {
    Left,
    Right,
    Up,
    Down,
}

/// Move inside a lane laid out row-major, `columns` cards wide.
/// Returns `None` when the move would leave the grid.
pub fn grid_move(index: usize, len: usize, columns: usize, dir: GridDirection) -> Option<usize> {
    let columns = columns.max(1);
    if index >= len {
        return None;
    }
    let col = index % columns;
    match dir {
        GridDirection::Left if col > 0 => Some(index - 1),
        GridDirection::Right if col + 1 < columns && index + 1 < len => Some(index + 1),
        GridDirection::Up if index >= columns => Some(index - columns),
        GridDirection::Down if index + columns < len => Some(index + columns),
        _ => None,
    }
}

/// Transient text entry on the board
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardInput {
    None,
    Search(String),
    ConfirmDelete(String),
}

/// A tiki plugin's lanes over the ticket store
pub struct BoardView {
    plugin: PluginDescriptor,
    config: Arc<PluginRuntimeConfig>,
    /// Filtered and sorted tickets per lane
    lanes: Vec<Vec<Ticket>>,
    input: BoardInput,
}

impl BoardView {
    pub fn new(
        plugin: PluginDescriptor,
        config: Arc<PluginRuntimeConfig>,
        ctx: &AppContext,
        now: DateTime<Utc>,
    ) -> Self {
        let mut view = BoardView {
            lanes: vec![Vec::new(); plugin.lanes.len()],
            plugin,
            config,
            input: BoardInput::None,
        };
        view.refresh(ctx, now);
        view
    }

    pub fn plugin(&self) -> &PluginDescriptor {
        &self.plugin
    }

    pub fn config(&self) -> &PluginRuntimeConfig {
        &self.config
    }

    pub fn lanes(&self) -> &[Vec<Ticket>] {
        &self.lanes
    }

    pub fn input(&self) -> &BoardInput {
        &self.input
    }

    pub fn is_capturing(&self) -> bool {
        self.input != BoardInput::None
    }

    pub fn selected_ticket(&self) -> Option<&Ticket> {
        let lane = self.config.selected_lane();
        let index = self.config.lane_cursor(lane).index;
        self.lanes.get(lane).and_then(|l| l.get(index))
    }

    /// Rebuild every lane from the store. `now` is sampled once for all lanes.
    pub fn refresh(&mut self, ctx: &AppContext, now: DateTime<Utc>) {
        let filter_ctx = FilterContext::new(now, ctx.store.current_user());
        let tickets = ctx.store.all();
        let search = self.config.search();
        self.lanes = self
            .plugin
            .lanes
            .iter()
            .map(|lane| {
                let mut hits = apply(&lane.filter, tickets.iter(), &filter_ctx);
                hits.retain(|t| search.allows(&t.id));
                sort_tickets(&mut hits, &self.plugin.sort);
                hits
            })
            .collect();

        for (i, lane) in self.lanes.iter().enumerate() {
            let cursor = self.config.lane_cursor(i);
            if cursor.index >= lane.len() {
                self.config.set_lane_index(i, lane.len().saturating_sub(1));
            }
        }
    }

    fn move_selection(&self, dir: GridDirection) {
        let lane = self.config.selected_lane();
        let (Some(tickets), Some(def)) = (self.lanes.get(lane), self.plugin.lane(lane)) else {
            return;
        };
        let index = self.config.lane_cursor(lane).index;
        if let Some(next) = grid_move(index, tickets.len(), def.columns, dir) {
            self.config.set_lane_index(lane, next);
        }
    }

    fn switch_lane(&self, forward: bool) {
        let lane = self.config.selected_lane();
        let next = if forward {
            lane + 1
        } else {
            match lane.checked_sub(1) {
                Some(l) => l,
                None => return,
            }
        };
        self.config.select_lane(next);
    }

    /// Move the selected ticket into the neighboring lane by running that
    /// lane's action, then follow it there
    fn move_ticket(&mut self, forward: bool, ctx: &AppContext, now: DateTime<Utc>) -> Outcome {
        let Some(ticket) = self.selected_ticket().cloned() else {
            return Outcome::Handled;
        };
        let lane = self.config.selected_lane();
        let target = if forward {
            lane + 1
        } else {
            match lane.checked_sub(1) {
                Some(l) => l,
                None => return Outcome::Handled,
            }
        };
        let Some(target_lane) = self.plugin.lane(target) else {
            return Outcome::Handled;
        };
        let Some(action) = target_lane.action.clone() else {
            return Outcome::Status(format!("lane {} has no move action", target_lane.name));
        };

        let result = match action {
            TicketAction::SetStatus(status) => ctx
                .store
                .update_status(&ticket.id, status)
                .map(|_| ())
                .map_err(|e| e.to_string()),
            other => self.run_field_action(&ticket, &other, ctx),
        };
        if let Err(message) = result {
            return Outcome::Error(message);
        }

        self.refresh(ctx, now);
        if let Some(row) = self
            .lanes
            .get(target)
            .and_then(|l| l.iter().position(|t| t.id == ticket.id))
        {
            self.config.select_lane(target);
            self.config.set_lane_index(target, row);
        }
        Outcome::Handled
    }

    fn run_field_action(
        &self,
        ticket: &Ticket,
        action: &TicketAction,
        ctx: &AppContext,
    ) -> Result<(), String> {
        let mut updated = ticket.clone();
        match apply_action(&mut updated, action, ctx.max_points()) {
            Applied::Changed => ctx
                .store
                .update(updated)
                .map(|_| ())
                .map_err(|e| e.to_string()),
            Applied::Unchanged | Applied::NotAFieldUpdate => Ok(()),
        }
    }

    fn run_ticket_action(&mut self, action: &TicketAction, ctx: &AppContext, now: DateTime<Utc>) -> Outcome {
        match action {
            TicketAction::NewTicket => {
                let mut draft = Ticket::template(ctx.max_points(), now);
                if let Some(lane_action) = self
                    .plugin
                    .lane(self.config.selected_lane())
                    .and_then(|l| l.action.as_ref())
                {
                    apply_action(&mut draft, lane_action, ctx.max_points());
                }
                Outcome::Navigate(NavCommand::Push(NavFrame::edit("", Some(draft), None)))
            }
            _ => {
                let Some(ticket) = self.selected_ticket().cloned() else {
                    return Outcome::Status("no ticket selected".to_string());
                };
                match action {
                    TicketAction::OpenDetail => {
                        Outcome::Navigate(NavCommand::Push(NavFrame::detail(&ticket.id)))
                    }
                    TicketAction::OpenEdit => {
                        Outcome::Navigate(NavCommand::Push(NavFrame::edit(&ticket.id, None, None)))
                    }
                    TicketAction::Delete => {
                        let prompt = format!("delete {}? (y/n)", ticket.id);
                        self.input = BoardInput::ConfirmDelete(ticket.id);
                        Outcome::Status(prompt)
                    }
                    field_update => match self.run_field_action(&ticket, field_update, ctx) {
                        Ok(()) => {
                            self.refresh(ctx, now);
                            Outcome::Handled
                        }
                        Err(message) => Outcome::Error(message),
                    },
                }
            }
        }
    }

    fn toggle_view_mode(&self, ctx: &AppContext) -> Outcome {
        let mode = self.config.view_mode().toggled();
        self.config.set_view_mode(mode);

        let (path, index) = match &self.plugin.source.path {
            Some(path) => (path.clone(), self.plugin.source.index),
            None => (ctx.paths.project_workflow_file(), None),
        };
        match save_view_mode(&path, &self.plugin.name, index, mode) {
            Ok(()) => Outcome::Handled,
            Err(e) => {
                warn!("could not save view mode: {}", e);
                Outcome::Error(e.to_string())
            }
        }
    }

    pub fn handle_action(&mut self, id: &ActionId, ctx: &AppContext, now: DateTime<Utc>) -> Outcome {
        match id {
            ActionId::MoveLeft => self.move_selection(GridDirection::Left),
            ActionId::MoveRight => self.move_selection(GridDirection::Right),
            ActionId::MoveUp => self.move_selection(GridDirection::Up),
            ActionId::MoveDown => self.move_selection(GridDirection::Down),
            ActionId::NextLane => self.switch_lane(true),
            ActionId::PrevLane => self.switch_lane(false),
            ActionId::MoveTicketLeft => return self.move_ticket(false, ctx, now),
            ActionId::MoveTicketRight => return self.move_ticket(true, ctx, now),
            ActionId::Search => {
                let query = self.config.search().query().unwrap_or_default().to_string();
                self.input = BoardInput::Search(query);
            }
            ActionId::ClearSearch => {
                if !self.config.clear_search() {
                    return Outcome::Navigate(NavCommand::Pop);
                }
                self.refresh(ctx, now);
            }
            ActionId::ToggleViewMode => return self.toggle_view_mode(ctx),
            ActionId::OpenDetail => return self.run_ticket_action(&TicketAction::OpenDetail, ctx, now),
            ActionId::EditTicket => return self.run_ticket_action(&TicketAction::OpenEdit, ctx, now),
            ActionId::NewTicket => return self.run_ticket_action(&TicketAction::NewTicket, ctx, now),
            ActionId::DeleteTicket => return self.run_ticket_action(&TicketAction::Delete, ctx, now),
            ActionId::Shortcut(i) => {
                let Some(shortcut) = self.plugin.actions.get(*i) else {
                    return Outcome::Ignored;
                };
                let action = shortcut.action.clone();
                return self.run_ticket_action(&action, ctx, now);
            }
            _ => return Outcome::Ignored,
        }
        Outcome::Handled
    }

    pub fn handle_input(&mut self, key: KeyEvent, ctx: &AppContext) -> Option<Outcome> {
        match &mut self.input {
            BoardInput::None => None,
            BoardInput::Search(query) => {
                if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
                    return Some(Outcome::Handled);
                }
                match key.code {
                    KeyCode::Char(c) => query.push(c),
                    KeyCode::Backspace => pop_grapheme(query),
                    KeyCode::Enter => {
                        let query = query.trim().to_string();
                        self.input = BoardInput::None;
                        return Some(self.run_search(&query, ctx));
                    }
                    KeyCode::Esc => {
                        self.input = BoardInput::None;
                        self.config.clear_search();
                    }
                    _ => {}
                }
                Some(Outcome::Handled)
            }
            BoardInput::ConfirmDelete(id) => {
                let id = id.clone();
                self.input = BoardInput::None;
                if !matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
                    return Some(Outcome::Status("delete cancelled".to_string()));
                }
                Some(match ctx.store.delete(&id) {
                    Ok(()) => Outcome::Status(format!("deleted {}", id)),
                    Err(e) => Outcome::Error(e.to_string()),
                })
            }
        }
    }

    fn run_search(&mut self, query: &str, ctx: &AppContext) -> Outcome {
        if query.is_empty() {
            self.config.clear_search();
            return Outcome::Handled;
        }
        let results: Vec<String> = ctx
            .store
            .search(query, None)
            .into_iter()
            .map(|r| r.ticket.id)
            .collect();
        let count = results.len();
        self.config.start_search(query, results);
        Outcome::Status(format!("{} match{} for '{}'", count, if count == 1 { "" } else { "es" }, query))
    }
}
