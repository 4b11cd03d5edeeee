pub mod board;
pub mod detail;
pub mod doc;
pub mod edit;

use chrono::{DateTime, Utc};
use crossterm::event::KeyEvent;

use crate::model::plugin::PluginKind;
use crate::tui::actions::{
    ActionId, ActionRegistry, board_registry, detail_registry, doc_registry, plugin_registry,
};
use crate::tui::context::AppContext;
use crate::tui::params::{NavFrame, ViewId, ViewParams};

pub use board::BoardView;
pub use detail::DetailView;
pub use doc::DocView;
pub use edit::EditView;

/// Navigation a view asks the app to perform
#[derive(Debug, Clone, PartialEq)]
pub enum NavCommand {
    Push(NavFrame),
    Pop,
}

/// Result of handing a key or action to a view
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Not for this view; the app may handle it
    Ignored,
    Handled,
    Status(String),
    Error(String),
    Navigate(NavCommand),
    Quit,
}

/// The view filling the content area, rebuilt from the top navigation frame
pub enum View {
    Board(BoardView),
    Detail(DetailView),
    Edit(EditView),
    Doc(DocView),
}

impl View {
    pub fn from_frame(frame: &NavFrame, ctx: &AppContext, now: DateTime<Utc>) -> Result<View, String> {
        match (&frame.view, &frame.params) {
            (ViewId::Plugin(name), _) => {
                let plugin = ctx
                    .plugin(name)
                    .ok_or_else(|| format!("unknown plugin '{}'", name))?;
                match plugin.kind {
                    PluginKind::Tiki => {
                        let config = ctx
                            .runtime_config(&plugin.name)
                            .ok_or_else(|| format!("plugin '{}' has no board state", name))?;
                        Ok(View::Board(BoardView::new(plugin.clone(), config, ctx, now)))
                    }
                    PluginKind::Doki => Ok(View::Doc(DocView::for_plugin(plugin, &ctx.paths))),
                }
            }
            (ViewId::TaskDetail, ViewParams::TaskDetail { ticket_id }) => {
                Ok(View::Detail(DetailView::new(ticket_id, ctx)))
            }
            (
                ViewId::TaskEdit,
                ViewParams::TaskEdit {
                    ticket_id,
                    draft,
                    focus,
                },
            ) => EditView::from_params(ticket_id, draft.as_deref().cloned(), *focus, ctx, now)
                .map(View::Edit),
            (view, _) => Err(format!("parameters do not match view '{}'", view)),
        }
    }

    /// Frame describing the view's current state
    pub fn frame(&self) -> NavFrame {
        match self {
            View::Board(v) => NavFrame::plugin(&v.plugin().name),
            View::Doc(v) => NavFrame::plugin(v.name()),
            View::Detail(v) => NavFrame::detail(v.ticket_id()),
            View::Edit(v) => v.frame(),
        }
    }

    /// View bindings, merged over the global registry by the app
    pub fn registry(&self) -> ActionRegistry {
        match self {
            View::Board(v) => plugin_registry(v.plugin()).merge(&board_registry()),
            View::Detail(_) => detail_registry(),
            View::Doc(_) => doc_registry(),
            View::Edit(v) => v.registry(),
        }
    }

    /// Offer a raw key to a view that is taking text input.
    /// Returns `None` when the view is not capturing.
    pub fn handle_input(&mut self, key: KeyEvent, ctx: &AppContext) -> Option<Outcome> {
        match self {
            View::Board(v) => v.handle_input(key, ctx),
            View::Detail(v) => v.handle_input(key, ctx),
            View::Edit(v) => v.handle_input(key),
            View::Doc(_) => None,
        }
    }

    pub fn handle_action(&mut self, id: &ActionId, ctx: &AppContext, now: DateTime<Utc>) -> Outcome {
        match self {
            View::Board(v) => v.handle_action(id, ctx, now),
            View::Detail(v) => v.handle_action(id),
            View::Edit(v) => v.handle_action(id, ctx),
            View::Doc(v) => v.handle_action(id),
        }
    }

    /// Re-read whatever the view shows from the store
    pub fn refresh(&mut self, ctx: &AppContext, now: DateTime<Utc>) {
        match self {
            View::Board(v) => v.refresh(ctx, now),
            View::Detail(v) => v.refresh(ctx),
            View::Edit(_) | View::Doc(_) => {}
        }
    }

    /// Whether raw keys currently go to the view before any binding
    pub fn is_capturing(&self) -> bool {
        match self {
            View::Board(v) => v.is_capturing(),
            View::Detail(v) => v.is_capturing(),
            View::Edit(_) => true,
            View::Doc(_) => false,
        }
    }
}
