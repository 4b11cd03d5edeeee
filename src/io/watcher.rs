use std::path::{Path, PathBuf};
use std::sync::mpsc;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// A file system watcher for the tickets directory.
pub struct TicketWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<Vec<PathBuf>>,
}

/// Whether a watcher event path is a ticket file directly inside `dir`
fn is_ticket_event(path: &Path, dir: &Path) -> bool {
    path.parent() == Some(dir) && path.extension().and_then(|e| e.to_str()) == Some("md")
}

impl TicketWatcher {
    /// Start watching the given tickets directory.
    /// Returns a `TicketWatcher` whose `poll()` method should be called each tick.
    pub fn start(tickets_dir: &Path) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();
        let dir = tickets_dir.to_path_buf();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let Ok(event) = result else {
                    return;
                };
                match event.kind {
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {}
                    _ => return,
                }
                let relevant: Vec<PathBuf> = event
                    .paths
                    .into_iter()
                    .filter(|p| is_ticket_event(p, &dir))
                    .collect();
                if !relevant.is_empty() {
                    let _ = tx.send(relevant);
                }
            },
            Config::default(),
        )?;

        watcher.watch(tickets_dir, RecursiveMode::NonRecursive)?;
        Ok(TicketWatcher {
            _watcher: watcher,
            rx,
        })
    }

    /// Non-blocking poll for changed ticket paths since the last call,
    /// without duplicates
    pub fn poll(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = Vec::new();
        while let Ok(batch) = self.rx.try_recv() {
            for p in batch {
                if !paths.contains(&p) {
                    paths.push(p);
                }
            }
        }
        paths
    }
}
