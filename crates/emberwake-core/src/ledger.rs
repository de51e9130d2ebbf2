//! Collaborator ledgers consulted and mutated by the narrative core.
//!
//! Inventory, character sheets and npc relationships are plain bookkeeping
//! owned by other parts of the server. The core only needs the operations
//! declared here.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// A quantity of one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemGrant {
    /// The item identifier.
    pub item_id: String,
    /// How many.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// Rewards granted when a quest completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardBundle {
    /// Currency added to the character sheet.
    pub currency: u32,
    /// Experience granted (may level the character up).
    pub experience: u32,
    /// Items placed in the inventory.
    pub items: Vec<ItemGrant>,
}

impl RewardBundle {
    /// Returns true when the bundle grants nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.currency == 0 && self.experience == 0 && self.items.is_empty()
    }
}

/// A subject's character sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterSheet {
    /// The subject this sheet belongs to.
    pub subject_id: Uuid,
    /// Display name.
    pub name: String,
    /// Current level, starting at 1.
    pub level: u32,
    /// Experience towards the next level.
    pub experience: u32,
    /// Currency held.
    pub currency: u64,
    /// Standing (reputation) with the settlement.
    pub standing: i32,
    /// Named ability scores.
    pub stats: BTreeMap<String, i32>,
}

/// Result of granting experience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelProgress {
    /// Level after the grant.
    pub level: u32,
    /// Experience carried towards the next level.
    pub experience: u32,
    /// Number of levels gained by this grant.
    pub levels_gained: u32,
}

/// Item bookkeeping.
#[async_trait]
pub trait Inventory: Send + Sync {
    /// How many of `item_id` the subject holds (0 when none).
    async fn quantity(&self, subject_id: Uuid, item_id: &str) -> Result<u32, DomainError>;

    /// Adds items. Returns the quantity now held.
    async fn give(&self, subject_id: Uuid, item_id: &str, quantity: u32)
    -> Result<u32, DomainError>;

    /// Removes items. Returns `false` without changing anything when the
    /// subject holds fewer than `quantity`.
    async fn remove(
        &self,
        subject_id: Uuid,
        item_id: &str,
        quantity: u32,
    ) -> Result<bool, DomainError>;

    /// Lists every item the subject holds.
    async fn list(&self, subject_id: Uuid) -> Result<Vec<ItemGrant>, DomainError>;
}

/// Character sheet bookkeeping (stats, level, currency, standing).
#[async_trait]
pub trait CharacterSheets: Send + Sync {
    /// Loads the subject's sheet, if one exists.
    async fn sheet(&self, subject_id: Uuid) -> Result<Option<CharacterSheet>, DomainError>;

    /// Creates a level 1 sheet with default stats.
    async fn create(&self, subject_id: Uuid, name: &str) -> Result<CharacterSheet, DomainError>;

    /// Grants experience. Returns `None` when the subject has no sheet.
    async fn grant_experience(
        &self,
        subject_id: Uuid,
        amount: u32,
    ) -> Result<Option<LevelProgress>, DomainError>;

    /// Adds currency. Returns the new balance, or `None` when the subject
    /// has no sheet.
    async fn add_currency(&self, subject_id: Uuid, amount: u32)
    -> Result<Option<u64>, DomainError>;
}

/// Subject-to-npc relationship scalars.
#[async_trait]
pub trait Relationships: Send + Sync {
    /// The relationship value with `npc_id` (0 when never changed).
    async fn value(&self, subject_id: Uuid, npc_id: &str) -> Result<i32, DomainError>;

    /// Adds `delta` and returns the new value.
    async fn adjust(&self, subject_id: Uuid, npc_id: &str, delta: i32)
    -> Result<i32, DomainError>;
}
