//! Utility functions.
//!
//! Formatting and message helpers shared by the plugins.

pub mod format;
pub mod reply;
pub mod target;

pub use format::{format_coins, format_duration, html_escape, mention};
pub use reply::reply_html;
pub use target::{parse_user_id, target_from_msg};
