//! Database module exports.

mod catalog;
mod inventory;
#[cfg(test)]
pub mod memory;
mod models;
mod mongo;
mod store;

pub use catalog::CatalogRepo;
pub use inventory::InventoryRepo;
pub use models::*;
pub use mongo::Database;
pub use store::{CharacterCatalog, InventoryStore, StoreError, StoreResult};
