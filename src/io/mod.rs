pub mod atomic;
pub mod config_io;
pub mod defaults;
pub mod history;
pub mod logging;
pub mod paths;
pub mod stager;
pub mod state;
pub mod store;
pub mod vcs;
pub mod watcher;
pub mod workflow_io;
