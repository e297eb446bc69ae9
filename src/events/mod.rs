//! Background event handling.
//!
//! Work that isn't triggered by an update: cleaning up prompts of
//! proposals nobody answered.

pub mod expiry;

pub use expiry::spawn_expiry_cleanup;
