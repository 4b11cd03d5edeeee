pub mod config;
pub mod filter;
pub mod plugin;
pub mod ticket;
pub mod workflow;

pub use config::*;
pub use filter::*;
pub use plugin::*;
pub use ticket::*;
pub use workflow::*;
