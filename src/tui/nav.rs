use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::tui::params::NavFrame;

/// Deepest the navigation stack may grow
pub const MAX_DEPTH: usize = 32;

pub type ListenerId = u64;

/// Focus hooks for a view's long-lived state
pub trait ViewLifecycle: Send + Sync {
    fn on_focus(&self) {}
    fn on_blur(&self) {}
}

type ChangeListener = Arc<dyn Fn(&NavFrame) + Send + Sync>;
type ViewGetter = Arc<dyn Fn(&NavFrame) -> Option<Arc<dyn ViewLifecycle>> + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: ListenerId,
    map: BTreeMap<ListenerId, ChangeListener>,
}

/// Stack of navigation frames. The bottom frame is never popped.
pub struct NavigationController {
    stack: Mutex<Vec<NavFrame>>,
    listeners: Mutex<Listeners>,
    view_getter: Mutex<Option<ViewGetter>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl NavigationController {
    pub fn new(root: NavFrame) -> Self {
        NavigationController {
            stack: Mutex::new(vec![root]),
            listeners: Mutex::new(Listeners::default()),
            view_getter: Mutex::new(None),
        }
    }

    pub fn current(&self) -> NavFrame {
        let stack = lock(&self.stack);
        // The stack always holds the root frame
        stack[stack.len() - 1].clone()
    }

    pub fn depth(&self) -> usize {
        lock(&self.stack).len()
    }

    /// Push a frame. At `MAX_DEPTH` the frame just above the root is evicted.
    pub fn push(&self, frame: NavFrame) {
        let previous = {
            let mut stack = lock(&self.stack);
            let previous = stack[stack.len() - 1].clone();
            if stack.len() >= MAX_DEPTH {
                let evicted = stack.remove(1);
                debug!(view = %evicted.view, "navigation stack full, evicted frame");
            }
            stack.push(frame.clone());
            previous
        };
        self.transition(Some(&previous), &frame);
    }

    /// Swap the top frame. Focus hooks only run when the view changes.
    pub fn replace(&self, frame: NavFrame) {
        let previous = {
            let mut stack = lock(&self.stack);
            let top = stack.len() - 1;
            std::mem::replace(&mut stack[top], frame.clone())
        };
        if previous.view == frame.view {
            self.transition(None, &frame);
        } else {
            self.transition(Some(&previous), &frame);
        }
    }

    /// Pop the top frame; a no-op returning `None` at the root
    pub fn pop(&self) -> Option<NavFrame> {
        let (popped, current) = {
            let mut stack = lock(&self.stack);
            if stack.len() <= 1 {
                return None;
            }
            let popped = stack.pop()?;
            (popped, stack[stack.len() - 1].clone())
        };
        self.transition(Some(&popped), &current);
        Some(popped)
    }

    pub fn on_change<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&NavFrame) + Send + Sync + 'static,
    {
        let mut listeners = lock(&self.listeners);
        listeners.next_id += 1;
        let id = listeners.next_id;
        listeners.map.insert(id, Arc::new(listener));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        lock(&self.listeners).map.remove(&id).is_some()
    }

    /// Set how frames map to the lifecycle handles of their views
    pub fn set_active_view_getter<F>(&self, getter: F)
    where
        F: Fn(&NavFrame) -> Option<Arc<dyn ViewLifecycle>> + Send + Sync + 'static,
    {
        *lock(&self.view_getter) = Some(Arc::new(getter));
    }

    /// Run focus hooks and listeners. Called with no locks held.
    fn transition(&self, outgoing: Option<&NavFrame>, incoming: &NavFrame) {
        let getter = lock(&self.view_getter).clone();
        if let (Some(getter), Some(outgoing)) = (&getter, outgoing) {
            if let Some(view) = getter(outgoing) {
                view.on_blur();
            }
            if let Some(view) = getter(incoming) {
                view.on_focus();
            }
        }
        let listeners: Vec<ChangeListener> = lock(&self.listeners).map.values().cloned().collect();
        for listener in listeners {
            listener(incoming);
        }
    }
}

/// What the content area shows, with a revision bumped on every change
#[derive(Debug, Clone)]
pub struct LayoutModel {
    pub content: NavFrame,
    pub revision: u64,
}

impl LayoutModel {
    pub fn new(content: NavFrame) -> Self {
        LayoutModel {
            content,
            revision: 1,
        }
    }

    pub fn set_content(&mut self, frame: NavFrame) {
        self.content = frame;
        self.revision += 1;
    }
}

/// Keep a shared layout model in step with a navigation controller
pub fn bind_layout(nav: &NavigationController) -> Arc<Mutex<LayoutModel>> {
    let layout = Arc::new(Mutex::new(LayoutModel::new(nav.current())));
    let shared = Arc::clone(&layout);
    nav.on_change(move |frame| lock(&shared).set_content(frame.clone()));
    layout
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter {
        focus: AtomicUsize,
        blur: AtomicUsize,
    }

    impl ViewLifecycle for Counter {
        fn on_focus(&self) {
            self.focus.fetch_add(1, Ordering::SeqCst);
        }
        fn on_blur(&self) {
            self.blur.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn nav() -> NavigationController {
        NavigationController::new(NavFrame::plugin("Kanban"))
    }

    #[test]
    fn pop_at_root_is_noop() {
        let nav = nav();
        assert!(nav.pop().is_none());
        assert_eq!(nav.depth(), 1);
        assert_eq!(nav.current(), NavFrame::plugin("Kanban"));
    }

    #[test]
    fn push_then_pop_returns_to_previous() {
        let nav = nav();
        nav.push(NavFrame::detail("TIKI-AAAAAA"));
        assert_eq!(nav.depth(), 2);
        assert_eq!(nav.pop(), Some(NavFrame::detail("TIKI-AAAAAA")));
        assert_eq!(nav.current(), NavFrame::plugin("Kanban"));
    }

    #[test]
    fn depth_is_bounded_and_root_kept() {
        let nav = nav();
        for i in 0..(MAX_DEPTH + 10) {
            nav.push(NavFrame::detail(&format!("TIKI-{:06}", i)));
            assert!(nav.depth() <= MAX_DEPTH);
        }
        assert_eq!(nav.depth(), MAX_DEPTH);
        assert_eq!(
            nav.current(),
            NavFrame::detail(&format!("TIKI-{:06}", MAX_DEPTH + 9))
        );
        for _ in 0..MAX_DEPTH {
            nav.pop();
        }
        assert_eq!(nav.current(), NavFrame::plugin("Kanban"));
    }

    #[test]
    fn listeners_get_ids_from_one_and_see_new_frame() {
        let nav = nav();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = nav.on_change(move |f| sink.lock().unwrap().push(f.view.to_string()));
        assert_eq!(id, 1);
        assert_eq!(nav.on_change(|_| {}), 2);

        nav.push(NavFrame::detail("TIKI-AAAAAA"));
        nav.pop();
        assert!(nav.remove_listener(id));
        nav.push(NavFrame::detail("TIKI-BBBBBB"));
        assert_eq!(*seen.lock().unwrap(), vec!["task_detail", "plugin:Kanban"]);
    }

    #[test]
    fn listener_may_read_the_controller() {
        let nav = Arc::new(nav());
        let inner = Arc::clone(&nav);
        let depths = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&depths);
        nav.on_change(move |_| sink.lock().unwrap().push(inner.depth()));
        nav.push(NavFrame::detail("TIKI-AAAAAA"));
        assert_eq!(*depths.lock().unwrap(), vec![2]);
    }

    #[test]
    fn lifecycle_hooks_follow_focus() {
        let nav = nav();
        let board = Arc::new(Counter::default());
        let handle: Arc<dyn ViewLifecycle> = board.clone();
        nav.set_active_view_getter(move |frame| {
            frame.view.plugin_name().map(|_| Arc::clone(&handle))
        });

        nav.push(NavFrame::detail("TIKI-AAAAAA"));
        assert_eq!(board.blur.load(Ordering::SeqCst), 1);
        nav.pop();
        assert_eq!(board.focus.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn layout_tracks_navigation() {
        let nav = nav();
        let layout = bind_layout(&nav);
        let start = layout.lock().unwrap().revision;
        nav.push(NavFrame::detail("TIKI-AAAAAA"));
        let model = layout.lock().unwrap().clone();
        assert_eq!(model.content, NavFrame::detail("TIKI-AAAAAA"));
        assert_eq!(model.revision, start + 1);
    }

    #[test]
    fn replace_keeps_depth() {
        let nav = nav();
        nav.push(NavFrame::edit("", None, None));
        nav.replace(NavFrame::edit("TIKI-AAAAAA", None, None));
        assert_eq!(nav.depth(), 2);
        assert_eq!(nav.current(), NavFrame::edit("TIKI-AAAAAA", None, None));
    }
}
