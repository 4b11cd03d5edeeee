use std::collections::HashMap;
use std::env;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::{debug, info, warn};

use crate::io::config_io::load_config;
use crate::io::history::{CancelToken, HistoryBuilder};
use crate::io::logging;
use crate::io::paths::AppPaths;
use crate::io::state::{UiState, read_ui_state, write_ui_state};
use crate::io::store::ListenerId;
use crate::io::vcs::GitCli;
use crate::io::watcher::TicketWatcher;
use crate::tui::actions::{
    ActionId, ActionRegistry, doc_registry, global_registry, normalize_key,
};
use crate::tui::context::AppContext;
use crate::tui::header::HeaderModel;
use crate::tui::nav::{LayoutModel, NavigationController, ViewLifecycle, bind_layout};
use crate::tui::params::NavFrame;
use crate::tui::plugin_config::PluginRuntimeConfig;
use crate::tui::scheduler::{UiEvent, UiScheduler};
use crate::tui::theme::Theme;
use crate::tui::views::{DocView, NavCommand, Outcome, View};

use super::render;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("no plugins are configured")]
    NoPlugins,
    #[error("{0}")]
    View(String),
}

/// Message shown in the status row until the next key press
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
}

/// The running TUI: navigation, the active view and background plumbing
pub struct App {
    pub ctx: AppContext,
    pub nav: Arc<NavigationController>,
    layout: Arc<Mutex<LayoutModel>>,
    /// Layout revision the current view was built for
    seen_revision: u64,
    pub view: View,
    pub header: HeaderModel,
    pub status: Option<StatusMessage>,
    scheduler: UiScheduler,
    watcher: Option<TicketWatcher>,
    history_token: CancelToken,
    store_listener: ListenerId,
    config_listeners: Vec<(Arc<PluginRuntimeConfig>, u64)>,
    /// Last plugin shown, saved as the startup plugin
    last_plugin: String,
    pub should_quit: bool,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl App {
    pub fn new(ctx: AppContext) -> Result<Self, AppError> {
        let saved = read_ui_state(&ctx.paths.state_file()).unwrap_or_default();
        for (name, config) in &ctx.runtime {
            if let Some(state) = saved.plugins.get(name) {
                config.restore(state);
            }
        }

        let root = saved
            .active_plugin
            .as_deref()
            .and_then(|name| ctx.plugin(name))
            .or_else(|| ctx.plugins.default_plugin())
            .map(|p| p.name.clone())
            .ok_or(AppError::NoPlugins)?;

        let nav = Arc::new(NavigationController::new(NavFrame::plugin(&root)));
        let runtime: HashMap<String, Arc<PluginRuntimeConfig>> = ctx.runtime.clone();
        nav.set_active_view_getter(move |frame| {
            let name = frame.view.plugin_name()?;
            runtime
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, config)| Arc::clone(config) as Arc<dyn ViewLifecycle>)
        });
        let layout = bind_layout(&nav);
        let seen_revision = lock(&layout).revision;

        let scheduler = UiScheduler::new();
        let sender = scheduler.sender();
        let store_listener = ctx
            .store
            .add_listener(move || sender.post(UiEvent::StoreChanged));
        let config_listeners = ctx
            .runtime
            .iter()
            .map(|(name, config)| {
                let sender = scheduler.sender();
                let name = name.clone();
                let id = config.add_listener(move || {
                    sender.post(UiEvent::PluginConfigChanged(name.clone()))
                });
                (Arc::clone(config), id)
            })
            .collect();

        let view = View::from_frame(&nav.current(), &ctx, Utc::now()).map_err(AppError::View)?;
        let mut header = HeaderModel::new(ctx.config.header.visible);
        header.refresh_stats(&ctx.store.all());
        let status = ctx.plugins.diagnostics.first().map(|d| StatusMessage {
            text: if ctx.plugins.diagnostics.len() > 1 {
                format!("{} (+{} more, see log)", d, ctx.plugins.diagnostics.len() - 1)
            } else {
                d.clone()
            },
            is_error: true,
        });

        Ok(App {
            ctx,
            nav,
            layout,
            seen_revision,
            view,
            header,
            status,
            scheduler,
            watcher: None,
            history_token: CancelToken::new(),
            store_listener,
            config_listeners,
            last_plugin: root,
            should_quit: false,
        })
    }

    /// Start the file watcher and the first history build
    pub fn start_background(&mut self) {
        match TicketWatcher::start(&self.ctx.paths.tickets_dir) {
            Ok(w) => self.watcher = Some(w),
            Err(e) => warn!("file watcher unavailable: {}", e),
        }
        self.spawn_history();
    }

    /// Rebuild the burndown in the background, cancelling any build in flight
    pub fn spawn_history(&mut self) {
        self.history_token.cancel();
        self.history_token = CancelToken::new();
        self.header.mark_loading();
        let sender = self.scheduler.sender();
        HistoryBuilder::spawn(
            self.ctx.store.vcs(),
            self.ctx.paths.tickets_dir.clone(),
            Utc::now(),
            self.history_token.clone(),
            move |result| match result {
                Ok(history) => sender.post(UiEvent::HistoryReady(history)),
                Err(e) => sender.post(UiEvent::HistoryFailed(e.to_string())),
            },
        );
    }

    /// Apply external changes and queued events, then bring the view in
    /// line with the navigation stack. Runs once per loop iteration.
    pub fn tick(&mut self) {
        if let Some(watcher) = &self.watcher {
            let changed = watcher.poll();
            if !changed.is_empty() {
                let reloaded = self.ctx.store.reload_paths(&changed);
                debug!(changed = changed.len(), reloaded, "external ticket changes");
            }
        }

        let mut dirty = false;
        for event in self.scheduler.drain() {
            match event {
                UiEvent::StoreChanged => {
                    self.header.refresh_stats(&self.ctx.store.all());
                    dirty = true;
                }
                UiEvent::PluginConfigChanged(name) => {
                    debug!(plugin = %name, "plugin config changed");
                    dirty = true;
                }
                UiEvent::HistoryReady(history) => self.header.set_history(history),
                UiEvent::HistoryFailed(message) => self.header.set_failed(message),
            }
        }

        let (revision, content) = {
            let layout = lock(&self.layout);
            (layout.revision, layout.content.clone())
        };
        if revision != self.seen_revision {
            self.seen_revision = revision;
            if content != self.view.frame() {
                self.rebuild_view(&content);
                return;
            }
        }
        if dirty {
            self.view.refresh(&self.ctx, Utc::now());
        }
    }

    fn rebuild_view(&mut self, frame: &NavFrame) {
        match View::from_frame(frame, &self.ctx, Utc::now()) {
            Ok(view) => {
                if let Some(name) = frame.view.plugin_name() {
                    self.last_plugin = name.to_string();
                }
                self.view = view;
            }
            Err(message) => {
                warn!("cannot show {}: {}", frame.view, message);
                self.set_status(message, true);
                self.nav.pop();
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let key = normalize_key(key);
        let now = Utc::now();
        self.status = None;

        let captured = if self.view.is_capturing() {
            self.view.handle_input(key, &self.ctx)
        } else {
            None
        };
        let outcome = match captured {
            Some(outcome) => outcome,
            None => {
                let id = self.registry().match_event(&key).map(|a| a.id.clone());
                match id {
                    Some(id) => match self.view.handle_action(&id, &self.ctx, now) {
                        Outcome::Ignored => self.handle_global(&id),
                        outcome => outcome,
                    },
                    None => Outcome::Ignored,
                }
            }
        };

        // Views with state worth keeping (the edit draft) mirror it into
        // their frame before any navigation happens
        let frame = self.view.frame();
        let current = self.nav.current();
        if frame.view == current.view && frame != current {
            self.nav.replace(frame);
        }

        self.apply(outcome);
    }

    /// Global bindings with the active view's merged over them
    pub fn registry(&self) -> ActionRegistry {
        global_registry(&self.ctx.plugins.plugins).merge(&self.view.registry())
    }

    /// Plugin whose tab is highlighted
    pub fn current_plugin(&self) -> &str {
        &self.last_plugin
    }

    fn handle_global(&mut self, id: &ActionId) -> Outcome {
        match id {
            ActionId::Quit => Outcome::Quit,
            ActionId::Back => Outcome::Navigate(NavCommand::Pop),
            ActionId::Refresh => match self.ctx.store.refresh() {
                Ok(count) => {
                    self.spawn_history();
                    Outcome::Status(format!("reloaded {} tickets", count))
                }
                Err(e) => Outcome::Error(e.to_string()),
            },
            ActionId::ToggleHeader => {
                self.header.toggle();
                Outcome::Handled
            }
            ActionId::ActivatePlugin(name) => {
                let frame = NavFrame::plugin(name);
                if self.nav.current().view.plugin_name().is_some() {
                    self.nav.replace(frame);
                } else {
                    self.nav.push(frame);
                }
                Outcome::Handled
            }
            _ => Outcome::Ignored,
        }
    }

    fn apply(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Ignored | Outcome::Handled => {}
            Outcome::Status(text) => self.set_status(text, false),
            Outcome::Error(text) => {
                warn!("{}", text);
                self.set_status(text, true);
            }
            Outcome::Navigate(NavCommand::Push(frame)) => self.nav.push(frame),
            Outcome::Navigate(NavCommand::Pop) => {
                self.nav.pop();
            }
            Outcome::Quit => self.should_quit = true,
        }
    }

    fn set_status(&mut self, text: String, is_error: bool) {
        self.status = Some(StatusMessage { text, is_error });
    }

    pub fn theme(&self) -> &Theme {
        &self.ctx.theme
    }

    pub fn ui_state(&self) -> UiState {
        UiState {
            active_plugin: Some(self.last_plugin.clone()),
            plugins: self
                .ctx
                .runtime
                .iter()
                .map(|(name, config)| (name.clone(), config.to_ui_state()))
                .collect(),
        }
    }

    pub fn save_ui_state(&self) {
        if let Err(e) = write_ui_state(&self.ctx.paths.state_file(), &self.ui_state()) {
            warn!("could not save UI state: {}", e);
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.history_token.cancel();
        self.ctx.store.remove_listener(self.store_listener);
        for (config, id) in &self.config_listeners {
            config.remove_listener(*id);
        }
    }
}

type Term = Terminal<CrosstermBackend<io::Stdout>>;

fn setup_terminal() -> Result<Term, Box<dyn std::error::Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Restore the terminal on panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Term) -> Result<(), Box<dyn std::error::Error>> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn open_context() -> Result<AppContext, Box<dyn std::error::Error>> {
    let cwd = env::current_dir()?;
    let paths = AppPaths::discover(&cwd);
    let (config, config_files) = load_config(&paths.config_files())?;
    if let Err(e) = logging::init(&paths.log_file(), &config.logging.level) {
        eprintln!("warning: {}", e);
    }
    info!(root = %paths.root.display(), configs = config_files.len(), "starting tiki");
    let vcs = Arc::new(GitCli::new(&paths.root));
    Ok(AppContext::new(paths, config, vcs)?)
}

/// Launch the board UI for the project around the current directory
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = open_context()?;
    let mut app = App::new(ctx)?;
    app.start_background();

    let mut terminal = setup_terminal()?;
    let result = run_event_loop(&mut terminal, &mut app);
    app.save_ui_state();
    restore_terminal(&mut terminal)?;
    result
}

fn run_event_loop(terminal: &mut Term, app: &mut App) -> Result<(), Box<dyn std::error::Error>> {
    let mut save_counter = 0u32;
    loop {
        app.tick();
        terminal.draw(|frame| render::render(frame, app))?;

        if event::poll(Duration::from_millis(250))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.handle_key(key);
            // Debounced state save: every ~5 key presses
            save_counter += 1;
            if save_counter >= 5 {
                app.save_ui_state();
                save_counter = 0;
            }
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Show a single document full screen. `q` or Esc exits.
pub fn run_viewer(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut view = DocView::from_file(path)?;
    let theme = Theme::from_config(&Default::default());
    let registry = doc_registry();

    let mut terminal = setup_terminal()?;
    let result = (|| -> Result<(), Box<dyn std::error::Error>> {
        loop {
            terminal.draw(|frame| render::render_viewer(frame, &mut view, &theme))?;
            if event::poll(Duration::from_millis(250))?
                && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                let key = normalize_key(key);
                if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                    return Ok(());
                }
                if let Some(action) = registry.match_event(&key) {
                    view.handle_action(&action.id);
                }
            }
        }
    })();
    restore_terminal(&mut terminal)?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::state::PluginUiState;
    use crate::model::ticket::{Status, Ticket};
    use crate::tui::context::test_support::temp_context;
    use crate::tui::params::ViewId;
    use crossterm::event::KeyModifiers;
    use tempfile::TempDir;

    fn app() -> (TempDir, App) {
        let (dir, ctx) = temp_context();
        (dir, App::new(ctx).unwrap())
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
        app.tick();
    }

    fn seed(app: &App, title: &str, status: Status) -> Ticket {
        let mut t = Ticket::template(10, Utc::now());
        t.title = title.into();
        t.status = status;
        app.ctx.store.create(t).unwrap()
    }

    #[test]
    fn starts_on_default_plugin() {
        let (_dir, app) = app();
        assert_eq!(app.nav.current(), NavFrame::plugin("Kanban"));
        assert!(matches!(app.view, View::Board(_)));
        assert!(app.status.is_none());
    }

    #[test]
    fn activation_key_replaces_plugin_root() {
        let (_dir, mut app) = app();
        press(&mut app, KeyCode::F(5));
        assert_eq!(app.nav.current(), NavFrame::plugin("Roadmap"));
        assert_eq!(app.nav.depth(), 1);

        press(&mut app, KeyCode::Char('?'));
        assert!(matches!(app.view, View::Doc(_)));
        assert_eq!(app.nav.depth(), 1);
    }

    #[test]
    fn open_detail_then_back() {
        let (_dir, mut app) = app();
        let t = seed(&app, "Detail me", Status::Backlog);
        app.tick();

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.nav.current(), NavFrame::detail(&t.id));
        assert!(matches!(app.view, View::Detail(_)));

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.nav.depth(), 1);
        assert!(matches!(app.view, View::Board(_)));
    }

    #[test]
    fn q_quits_from_board() {
        let (_dir, mut app) = app();
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn edit_draft_is_mirrored_into_frame() {
        let (_dir, mut app) = app();
        let t = seed(&app, "Draft", Status::Backlog);
        app.tick();

        press(&mut app, KeyCode::Char('e'));
        assert_eq!(app.nav.current().view, ViewId::TaskEdit);
        press(&mut app, KeyCode::Char('!'));

        let frame = app.nav.current();
        let crate::tui::params::ViewParams::TaskEdit { draft: Some(draft), .. } = frame.params else {
            panic!("draft not mirrored");
        };
        assert_eq!(draft.title, "Draft!");
        assert_eq!(app.ctx.store.get(&t.id).unwrap().title, "Draft");
        // q is text while editing
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.should_quit);
    }

    #[test]
    fn store_changes_refresh_the_board() {
        let (_dir, mut app) = app();
        seed(&app, "Late arrival", Status::Backlog);
        app.tick();
        let View::Board(board) = &app.view else {
            panic!("expected board");
        };
        assert_eq!(board.lanes()[0].len(), 1);
        assert_eq!(app.header.stats.total, 1);
    }

    #[test]
    fn toggle_header() {
        let (_dir, mut app) = app();
        let visible = app.header.visible;
        press(&mut app, KeyCode::Char('H'));
        assert_eq!(app.header.visible, !visible);
    }

    #[test]
    fn ui_state_round_trips_through_file() {
        let (dir, ctx) = temp_context();
        let paths = ctx.paths.clone();
        {
            let mut app = App::new(ctx).unwrap();
            press(&mut app, KeyCode::F(5));
            press(&mut app, KeyCode::Tab);
            app.save_ui_state();
        }
        let state = read_ui_state(&paths.state_file()).unwrap();
        assert_eq!(state.active_plugin.as_deref(), Some("Roadmap"));
        assert_eq!(
            state.plugins.get("Roadmap").map(|p| p.selected_lane),
            Some(1)
        );

        let ctx = AppContext::new(
            paths,
            Default::default(),
            Arc::new(crate::io::vcs::FakeVcs::new()),
        )
        .unwrap();
        let app = App::new(ctx).unwrap();
        assert_eq!(app.nav.current(), NavFrame::plugin("Roadmap"));
        assert_eq!(
            app.ctx.runtime_config("Roadmap").unwrap().to_ui_state(),
            PluginUiState {
                selected_lane: 1,
                lane_selection: vec![0, 0, 0],
                lane_scroll: vec![0, 0, 0],
            }
        );
        drop(dir);
    }
}
