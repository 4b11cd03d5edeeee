pub mod actions;
pub mod app;
pub mod context;
pub mod header;
pub mod nav;
pub mod params;
pub mod plugin_config;
pub mod render;
pub mod scheduler;
pub mod theme;
pub mod views;

pub use app::{run, run_viewer};
