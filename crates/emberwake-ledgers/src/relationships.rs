//! Subject-to-npc relationship scalars. Unbounded, default 0.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use emberwake_core::error::DomainError;
use emberwake_core::ledger::Relationships;
use emberwake_core::record::{RecordKey, RecordStore, encode};

/// Record namespace holding relationship values.
pub const NAMESPACE: &str = "relationships";

#[derive(Debug, Serialize, Deserialize)]
struct Standing {
    value: i32,
}

/// `Relationships` over the record store, one record per npc.
pub struct StoreRelationships {
    store: Arc<dyn RecordStore>,
}

impl StoreRelationships {
    /// Creates a relationship ledger.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Relationships for StoreRelationships {
    async fn value(&self, subject_id: Uuid, npc_id: &str) -> Result<i32, DomainError> {
        let key = RecordKey::new(NAMESPACE, subject_id, npc_id);
        match self.store.get(&key).await? {
            Some(stored) => Ok(stored.decode::<Standing>()?.value),
            None => Ok(0),
        }
    }

    async fn adjust(
        &self,
        subject_id: Uuid,
        npc_id: &str,
        delta: i32,
    ) -> Result<i32, DomainError> {
        let key = RecordKey::new(NAMESPACE, subject_id, npc_id);
        let (current, version) = match self.store.get(&key).await? {
            Some(stored) => (stored.decode::<Standing>()?.value, stored.version),
            None => (0, 0),
        };
        let value = current.saturating_add(delta);
        self.store
            .put(&key, encode(&Standing { value })?, version)
            .await?;
        info!(%subject_id, npc_id, delta, value, "relationship changed");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emberwake_store::MemoryRecordStore;

    #[tokio::test]
    async fn test_value_defaults_to_zero_and_adjust_accumulates() {
        // Arrange
        let relationships = StoreRelationships::new(Arc::new(MemoryRecordStore::new()));
        let subject = Uuid::new_v4();

        // Act
        relationships.adjust(subject, "npc_ana", 15).await.unwrap();
        let after = relationships.adjust(subject, "npc_ana", -40).await.unwrap();

        // Assert
        assert_eq!(after, -25);
        assert_eq!(relationships.value(subject, "npc_ana").await.unwrap(), -25);
        assert_eq!(relationships.value(subject, "npc_bo").await.unwrap(), 0);
    }
}
