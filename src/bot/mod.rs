//! Telegram wiring: dispatcher, runners and the audit channel.

pub mod audit;
pub mod dispatcher;
mod runtime;

pub use audit::ChannelAudit;
pub use dispatcher::build_dispatcher;
pub use runtime::run;
