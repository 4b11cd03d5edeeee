pub mod action;
pub mod filter;
pub mod frontmatter;
pub mod key;
pub mod sort;

pub use action::parse_action;
pub use filter::{FilterError, parse_filter};
pub use frontmatter::{FrontmatterError, ParsedTicket, parse_ticket, serialize_ticket};
pub use key::parse_key;
pub use sort::{parse_sort, parse_sort_rule};
