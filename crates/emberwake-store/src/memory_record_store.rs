//! In-memory implementation of the `RecordStore` trait.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use emberwake_core::error::DomainError;
use emberwake_core::record::{RecordKey, RecordStore, StoredRecord};

#[derive(Debug)]
struct Entry {
    value: serde_json::Value,
    version: i64,
    seq: u64,
}

#[derive(Debug, Default)]
struct State {
    records: HashMap<RecordKey, Entry>,
    next_seq: u64,
}

/// Process-local record store. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    state: Mutex<State>,
}

impl MemoryRecordStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, DomainError> {
        self.state
            .lock()
            .map_err(|_| DomainError::Infrastructure("memory record store poisoned".into()))
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<StoredRecord>, DomainError> {
        let state = self.lock()?;
        Ok(state.records.get(key).map(|entry| StoredRecord {
            key: key.clone(),
            value: entry.value.clone(),
            version: entry.version,
        }))
    }

    async fn put(
        &self,
        key: &RecordKey,
        value: serde_json::Value,
        expected_version: i64,
    ) -> Result<StoredRecord, DomainError> {
        let mut state = self.lock()?;
        let actual = state.records.get(key).map_or(0, |entry| entry.version);
        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                key: key.to_string(),
                expected: expected_version,
                actual,
            });
        }

        let version = actual + 1;
        let existing_seq = state.records.get(key).map(|entry| entry.seq);
        let seq = if let Some(seq) = existing_seq {
            seq
        } else {
            state.next_seq += 1;
            state.next_seq
        };
        state.records.insert(
            key.clone(),
            Entry {
                value: value.clone(),
                version,
                seq,
            },
        );

        Ok(StoredRecord {
            key: key.clone(),
            value,
            version,
        })
    }

    async fn delete(&self, key: &RecordKey) -> Result<bool, DomainError> {
        Ok(self.lock()?.records.remove(key).is_some())
    }

    async fn list(
        &self,
        namespace: &str,
        subject_id: Uuid,
    ) -> Result<Vec<StoredRecord>, DomainError> {
        let state = self.lock()?;
        let mut matching: Vec<(&RecordKey, &Entry)> = state
            .records
            .iter()
            .filter(|(key, _)| key.namespace == namespace && key.subject_id == subject_id)
            .collect();
        matching.sort_by_key(|(_, entry)| entry.seq);

        Ok(matching
            .into_iter()
            .map(|(key, entry)| StoredRecord {
                key: key.clone(),
                value: entry.value.clone(),
                version: entry.version,
            })
            .collect())
    }

    async fn clear(&self, namespace: &str, subject_id: Uuid) -> Result<u64, DomainError> {
        let mut state = self.lock()?;
        let before = state.records.len();
        state
            .records
            .retain(|key, _| !(key.namespace == namespace && key.subject_id == subject_id));
        Ok((before - state.records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_with_zero_creates_and_get_returns_version_one() {
        // Arrange
        let store = MemoryRecordStore::new();
        let key = RecordKey::new("flags", Uuid::new_v4(), "met_ana");

        // Act
        let stored = store.put(&key, json!({ "a": 1 }), 0).await.unwrap();

        // Assert
        assert_eq!(stored.version, 1);
        let loaded = store.get(&key).await.unwrap().unwrap();
        assert_eq!(loaded.value, json!({ "a": 1 }));
        assert_eq!(loaded.version, 1);
    }

    #[tokio::test]
    async fn test_put_with_stale_version_reports_conflict() {
        // Arrange
        let store = MemoryRecordStore::new();
        let key = RecordKey::new("quest_progress", Uuid::new_v4(), "q1");
        store.put(&key, json!(1), 0).await.unwrap();
        store.put(&key, json!(2), 1).await.unwrap();

        // Act
        let result = store.put(&key, json!(3), 1).await;

        // Assert
        match result {
            Err(DomainError::ConcurrencyConflict {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 1);
                assert_eq!(actual, 2);
            }
            other => panic!("expected ConcurrencyConflict, got {other:?}"),
        }
        assert_eq!(store.get(&key).await.unwrap().unwrap().value, json!(2));
    }

    #[tokio::test]
    async fn test_create_only_put_on_existing_record_conflicts() {
        let store = MemoryRecordStore::new();
        let key = RecordKey::new("flags", Uuid::new_v4(), "met_ana");
        store.put(&key, json!(1), 0).await.unwrap();

        let result = store.put(&key, json!(1), 0).await;

        assert!(matches!(
            result,
            Err(DomainError::ConcurrencyConflict { actual: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_list_returns_creation_order_and_isolates_subjects() {
        // Arrange
        let store = MemoryRecordStore::new();
        let subject = Uuid::new_v4();
        let other = Uuid::new_v4();
        for name in ["zeta", "alpha", "mid"] {
            store
                .put(&RecordKey::new("flags", subject, name), json!(name), 0)
                .await
                .unwrap();
        }
        store
            .put(&RecordKey::new("flags", other, "alpha"), json!("x"), 0)
            .await
            .unwrap();
        // Updating a record keeps its original position.
        store
            .put(&RecordKey::new("flags", subject, "zeta"), json!("z2"), 1)
            .await
            .unwrap();

        // Act
        let listed = store.list("flags", subject).await.unwrap();

        // Assert
        let keys: Vec<&str> = listed.iter().map(|r| r.key.key.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(listed[0].version, 2);
    }

    #[tokio::test]
    async fn test_delete_and_clear_remove_records() {
        let store = MemoryRecordStore::new();
        let subject = Uuid::new_v4();
        let a = RecordKey::new("flags", subject, "a");
        let b = RecordKey::new("flags", subject, "b");
        let other_ns = RecordKey::new("inventory", subject, "a");
        store.put(&a, json!(1), 0).await.unwrap();
        store.put(&b, json!(1), 0).await.unwrap();
        store.put(&other_ns, json!(1), 0).await.unwrap();

        assert!(store.delete(&a).await.unwrap());
        assert!(!store.delete(&a).await.unwrap());
        assert_eq!(store.clear("flags", subject).await.unwrap(), 1);
        assert!(store.list("flags", subject).await.unwrap().is_empty());
        assert!(store.get(&other_ns).await.unwrap().is_some());
    }
}
