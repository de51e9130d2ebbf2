//! Keyed record store abstraction.
//!
//! Flags, quest progress and the collaborator ledgers all persist through
//! this one trait. Each record carries a version; writes state the version
//! they expect so read-modify-write cycles cannot silently lose updates.

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::DomainError;

/// Address of a record: `(namespace, subject, key)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    /// Logical table, e.g. `flags` or `quest_progress`.
    pub namespace: String,
    /// The subject the record belongs to.
    pub subject_id: Uuid,
    /// Key within the namespace for that subject.
    pub key: String,
}

impl RecordKey {
    /// Creates a record key.
    #[must_use]
    pub fn new(namespace: &str, subject_id: Uuid, key: &str) -> Self {
        Self {
            namespace: namespace.to_owned(),
            subject_id,
            key: key.to_owned(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.subject_id, self.key)
    }
}

/// A record as held by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    /// Where the record lives.
    pub key: RecordKey,
    /// JSON body.
    pub value: serde_json::Value,
    /// Number of successful writes, starting at 1 on creation.
    pub version: i64,
}

impl StoredRecord {
    /// Deserializes the record body.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the body does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DomainError> {
        serde_json::from_value(self.value.clone()).map_err(|e| {
            DomainError::Infrastructure(format!("record {} deserialization failed: {e}", self.key))
        })
    }
}

/// Serializes a record body.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if serialization fails.
pub fn encode<T: Serialize>(value: &T) -> Result<serde_json::Value, DomainError> {
    serde_json::to_value(value)
        .map_err(|e| DomainError::Infrastructure(format!("record serialization failed: {e}")))
}

/// Keyed record store with per-record versions.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Loads a single record.
    async fn get(&self, key: &RecordKey) -> Result<Option<StoredRecord>, DomainError>;

    /// Writes a record if its current version equals `expected_version`.
    /// An expected version of 0 means "create; must not exist yet".
    ///
    /// Returns the stored record with its new version, or
    /// `DomainError::ConcurrencyConflict` when the versions differ.
    async fn put(
        &self,
        key: &RecordKey,
        value: serde_json::Value,
        expected_version: i64,
    ) -> Result<StoredRecord, DomainError>;

    /// Deletes a record. Returns whether a record was removed.
    async fn delete(&self, key: &RecordKey) -> Result<bool, DomainError>;

    /// Lists every record of a namespace for one subject, in creation order.
    async fn list(&self, namespace: &str, subject_id: Uuid)
    -> Result<Vec<StoredRecord>, DomainError>;

    /// Deletes every record of a namespace for one subject. Returns the
    /// number of records removed.
    async fn clear(&self, namespace: &str, subject_id: Uuid) -> Result<u64, DomainError>;
}
