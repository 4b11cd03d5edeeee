use std::sync::mpsc::{self, Receiver, Sender};

use crate::ops::burndown::History;

/// Work posted to the UI thread from listeners and background threads
#[derive(Debug)]
pub enum UiEvent {
    /// The ticket store changed; boards rebuild their lanes
    StoreChanged,
    /// A plugin's runtime config changed (selection, mode, search)
    PluginConfigChanged(String),
    HistoryReady(History),
    HistoryFailed(String),
}

/// Cloneable handle for posting to the UI queue from any thread
#[derive(Debug, Clone)]
pub struct UiSender(Sender<UiEvent>);

impl UiSender {
    /// Post an event. Events posted after the UI has shut down are dropped.
    pub fn post(&self, event: UiEvent) {
        let _ = self.0.send(event);
    }
}

/// Queue drained by the UI thread between frames
pub struct UiScheduler {
    tx: Sender<UiEvent>,
    rx: Receiver<UiEvent>,
}

impl Default for UiScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl UiScheduler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        UiScheduler { tx, rx }
    }

    pub fn sender(&self) -> UiSender {
        UiSender(self.tx.clone())
    }

    /// Everything posted since the last drain, in posting order
    pub fn drain(&self) -> Vec<UiEvent> {
        self.rx.try_iter().collect()
    }
}
