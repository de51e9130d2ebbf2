//! Record stores that fail or stall on demand.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use emberwake_core::error::DomainError;
use emberwake_core::record::{RecordKey, RecordStore, StoredRecord};
use emberwake_store::MemoryRecordStore;
use uuid::Uuid;

fn unavailable() -> DomainError {
    DomainError::Infrastructure("record store unavailable".into())
}

/// A record store whose every operation fails with
/// `DomainError::Infrastructure`.
#[derive(Debug, Default)]
pub struct FailingRecordStore;

#[async_trait]
impl RecordStore for FailingRecordStore {
    async fn get(&self, _key: &RecordKey) -> Result<Option<StoredRecord>, DomainError> {
        Err(unavailable())
    }

    async fn put(
        &self,
        _key: &RecordKey,
        _value: serde_json::Value,
        _expected_version: i64,
    ) -> Result<StoredRecord, DomainError> {
        Err(unavailable())
    }

    async fn delete(&self, _key: &RecordKey) -> Result<bool, DomainError> {
        Err(unavailable())
    }

    async fn list(
        &self,
        _namespace: &str,
        _subject_id: Uuid,
    ) -> Result<Vec<StoredRecord>, DomainError> {
        Err(unavailable())
    }

    async fn clear(&self, _namespace: &str, _subject_id: Uuid) -> Result<u64, DomainError> {
        Err(unavailable())
    }
}

/// Serves reads from a wrapped in-memory store and fails every write.
///
/// Seed the inner store through `inner()` before handing this out.
#[derive(Debug, Default)]
pub struct ReadOnlyRecordStore {
    inner: MemoryRecordStore,
}

impl ReadOnlyRecordStore {
    /// Creates an empty read-only store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The writable store underneath, for seeding.
    #[must_use]
    pub fn inner(&self) -> &MemoryRecordStore {
        &self.inner
    }
}

#[async_trait]
impl RecordStore for ReadOnlyRecordStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<StoredRecord>, DomainError> {
        self.inner.get(key).await
    }

    async fn put(
        &self,
        _key: &RecordKey,
        _value: serde_json::Value,
        _expected_version: i64,
    ) -> Result<StoredRecord, DomainError> {
        Err(unavailable())
    }

    async fn delete(&self, _key: &RecordKey) -> Result<bool, DomainError> {
        Err(unavailable())
    }

    async fn list(
        &self,
        namespace: &str,
        subject_id: Uuid,
    ) -> Result<Vec<StoredRecord>, DomainError> {
        self.inner.list(namespace, subject_id).await
    }

    async fn clear(&self, _namespace: &str, _subject_id: Uuid) -> Result<u64, DomainError> {
        Err(unavailable())
    }
}

/// An in-memory store that sleeps before every operation, so concurrent
/// read-modify-write sequences overlap. Counts rejected version checks.
#[derive(Debug)]
pub struct SlowRecordStore {
    inner: MemoryRecordStore,
    delay: Duration,
    conflicts: AtomicUsize,
}

impl SlowRecordStore {
    /// Creates an empty store that waits `delay` before each operation.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryRecordStore::new(),
            delay,
            conflicts: AtomicUsize::new(0),
        }
    }

    /// Number of `put` calls rejected with `ConcurrencyConflict`.
    #[must_use]
    pub fn conflicts(&self) -> usize {
        self.conflicts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for SlowRecordStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<StoredRecord>, DomainError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(key).await
    }

    async fn put(
        &self,
        key: &RecordKey,
        value: serde_json::Value,
        expected_version: i64,
    ) -> Result<StoredRecord, DomainError> {
        tokio::time::sleep(self.delay).await;
        let result = self.inner.put(key, value, expected_version).await;
        if matches!(result, Err(DomainError::ConcurrencyConflict { .. })) {
            self.conflicts.fetch_add(1, Ordering::SeqCst);
        }
        result
    }

    async fn delete(&self, key: &RecordKey) -> Result<bool, DomainError> {
        tokio::time::sleep(self.delay).await;
        self.inner.delete(key).await
    }

    async fn list(
        &self,
        namespace: &str,
        subject_id: Uuid,
    ) -> Result<Vec<StoredRecord>, DomainError> {
        tokio::time::sleep(self.delay).await;
        self.inner.list(namespace, subject_id).await
    }

    async fn clear(&self, namespace: &str, subject_id: Uuid) -> Result<u64, DomainError> {
        tokio::time::sleep(self.delay).await;
        self.inner.clear(namespace, subject_id).await
    }
}
