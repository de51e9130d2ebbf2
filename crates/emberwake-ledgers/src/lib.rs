//! Emberwake Ledgers: collaborator bookkeeping.
//!
//! Inventory, character sheets and npc relationships persisted through the
//! shared `RecordStore`. These implement the ledger traits from
//! `emberwake_core::ledger`; they publish no events.

pub mod character_sheets;
pub mod inventory;
pub mod relationships;

pub use character_sheets::StoreCharacterSheets;
pub use inventory::StoreInventory;
pub use relationships::StoreRelationships;
