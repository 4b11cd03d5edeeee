pub mod burndown;
pub mod filter;
pub mod search;
pub mod sort;
pub mod ticket_ops;
