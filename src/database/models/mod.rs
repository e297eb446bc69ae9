//! Database models.

pub mod character;
pub mod inventory;

pub use character::{CharacterInstance, Rarity};
pub use inventory::UserInventory;
