//! Item stacks per subject.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use emberwake_core::error::DomainError;
use emberwake_core::ledger::{Inventory, ItemGrant};
use emberwake_core::record::{RecordKey, RecordStore, encode};

/// Record namespace holding item stacks.
pub const NAMESPACE: &str = "inventory";

/// Largest stack a subject can hold of one item.
pub const MAX_STACK: u32 = 999;

#[derive(Debug, Serialize, Deserialize)]
struct Stack {
    quantity: u32,
}

/// `Inventory` over the record store, one record per held item.
pub struct StoreInventory {
    store: Arc<dyn RecordStore>,
}

impl StoreInventory {
    /// Creates an inventory ledger.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    async fn load(&self, key: &RecordKey) -> Result<(u32, i64), DomainError> {
        match self.store.get(key).await? {
            Some(stored) => Ok((stored.decode::<Stack>()?.quantity, stored.version)),
            None => Ok((0, 0)),
        }
    }
}

#[async_trait]
impl Inventory for StoreInventory {
    async fn quantity(&self, subject_id: Uuid, item_id: &str) -> Result<u32, DomainError> {
        let key = RecordKey::new(NAMESPACE, subject_id, item_id);
        Ok(self.load(&key).await?.0)
    }

    async fn give(
        &self,
        subject_id: Uuid,
        item_id: &str,
        quantity: u32,
    ) -> Result<u32, DomainError> {
        if item_id.trim().is_empty() {
            return Err(DomainError::Validation("item id must not be empty".into()));
        }
        let key = RecordKey::new(NAMESPACE, subject_id, item_id);
        let (held, version) = self.load(&key).await?;
        if quantity == 0 {
            return Ok(held);
        }

        let total = held.saturating_add(quantity).min(MAX_STACK);
        self.store
            .put(&key, encode(&Stack { quantity: total })?, version)
            .await?;
        info!(%subject_id, item_id, quantity, total, "items given");
        Ok(total)
    }

    async fn remove(
        &self,
        subject_id: Uuid,
        item_id: &str,
        quantity: u32,
    ) -> Result<bool, DomainError> {
        let key = RecordKey::new(NAMESPACE, subject_id, item_id);
        let (held, version) = self.load(&key).await?;
        if held < quantity || held == 0 {
            debug!(%subject_id, item_id, held, quantity, "not enough items to remove");
            return Ok(false);
        }

        let left = held - quantity;
        if left == 0 {
            self.store.delete(&key).await?;
        } else {
            self.store
                .put(&key, encode(&Stack { quantity: left })?, version)
                .await?;
        }
        info!(%subject_id, item_id, quantity, left, "items removed");
        Ok(true)
    }

    async fn list(&self, subject_id: Uuid) -> Result<Vec<ItemGrant>, DomainError> {
        self.store
            .list(NAMESPACE, subject_id)
            .await?
            .into_iter()
            .map(|stored| -> Result<ItemGrant, DomainError> {
                let stack: Stack = stored.decode()?;
                Ok(ItemGrant {
                    item_id: stored.key.key,
                    quantity: stack.quantity,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emberwake_store::MemoryRecordStore;

    fn inventory() -> StoreInventory {
        StoreInventory::new(Arc::new(MemoryRecordStore::new()))
    }

    #[tokio::test]
    async fn test_give_accumulates_and_caps_stack() {
        // Arrange
        let inventory = inventory();
        let subject = Uuid::new_v4();

        // Act
        let first = inventory.give(subject, "bandage", 3).await.unwrap();
        let second = inventory.give(subject, "bandage", 2).await.unwrap();
        let capped = inventory.give(subject, "bandage", 5000).await.unwrap();

        // Assert
        assert_eq!(first, 3);
        assert_eq!(second, 5);
        assert_eq!(capped, MAX_STACK);
        assert_eq!(inventory.quantity(subject, "bandage").await.unwrap(), MAX_STACK);
    }

    #[tokio::test]
    async fn test_remove_fails_closed_when_short() {
        // Arrange
        let inventory = inventory();
        let subject = Uuid::new_v4();
        inventory.give(subject, "coin_pouch", 1).await.unwrap();

        // Act
        let removed = inventory.remove(subject, "coin_pouch", 2).await.unwrap();

        // Assert
        assert!(!removed);
        assert_eq!(inventory.quantity(subject, "coin_pouch").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_remove_last_item_drops_the_stack() {
        let inventory = inventory();
        let subject = Uuid::new_v4();
        inventory.give(subject, "key", 2).await.unwrap();
        inventory.give(subject, "map", 1).await.unwrap();

        assert!(inventory.remove(subject, "key", 1).await.unwrap());
        assert!(inventory.remove(subject, "key", 1).await.unwrap());

        let held = inventory.list(subject).await.unwrap();
        assert_eq!(
            held,
            vec![ItemGrant {
                item_id: "map".into(),
                quantity: 1
            }]
        );
    }

    #[tokio::test]
    async fn test_remove_of_unknown_item_is_false() {
        let inventory = inventory();

        assert!(!inventory.remove(Uuid::new_v4(), "ghost", 0).await.unwrap());
    }
}
