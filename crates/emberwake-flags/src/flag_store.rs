//! Flag store over the keyed record store.
//!
//! Each flag is one record in the `flags` namespace keyed by its name. The
//! record store's creation order doubles as the chronological history
//! returned by `get_all`.
//!
//! The plain methods (`has`, `get_all`, ...) absorb storage failures: they
//! log the error and answer as if the flag were absent. The `try_` variants
//! return the failure for callers that must tell the two apart.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use uuid::Uuid;

use emberwake_core::clock::Clock;
use emberwake_core::error::DomainError;
use emberwake_core::record::{RecordKey, RecordStore, encode};

/// Record namespace holding flags.
pub const NAMESPACE: &str = "flags";

#[derive(Debug, Serialize, Deserialize)]
struct FlagRecord {
    set_at: DateTime<Utc>,
}

/// A flag as reported by `get_all`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flag {
    /// Flag name.
    pub name: String,
    /// When the flag was first set.
    pub set_at: DateTime<Utc>,
}

/// Per-subject set of narrative flags.
pub struct FlagStore {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for FlagStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlagStore").finish_non_exhaustive()
    }
}

fn validate_name(flag: &str) -> Result<(), DomainError> {
    if flag.trim().is_empty() {
        return Err(DomainError::Validation("flag name must not be empty".into()));
    }
    Ok(())
}

impl FlagStore {
    /// Creates a flag store.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Sets `flag`. Returns `true` if it was newly set, `false` if it was
    /// already present.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for an empty name, or the storage
    /// error.
    pub async fn try_set(&self, subject_id: Uuid, flag: &str) -> Result<bool, DomainError> {
        validate_name(flag)?;
        let key = RecordKey::new(NAMESPACE, subject_id, flag);
        let record = encode(&FlagRecord {
            set_at: self.clock.now(),
        })?;
        match self.store.put(&key, record, 0).await {
            Ok(_) => {
                info!(%subject_id, flag, "flag set");
                Ok(true)
            }
            Err(DomainError::ConcurrencyConflict { .. }) => {
                debug!(%subject_id, flag, "flag already set");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Sets `flag`, absorbing failures. Re-setting an existing flag is a
    /// no-op. Returns whether the flag was newly set.
    pub async fn set(&self, subject_id: Uuid, flag: &str) -> bool {
        self.try_set(subject_id, flag).await.unwrap_or_else(|e| {
            error!(%subject_id, flag, error = %e, "failed to set flag");
            false
        })
    }

    /// Sets every flag in order, stopping at the first failure. Returns how
    /// many were newly set.
    ///
    /// # Errors
    ///
    /// Returns the first failure. Flags set before it remain set.
    pub async fn try_set_many(
        &self,
        subject_id: Uuid,
        flags: &[String],
    ) -> Result<usize, DomainError> {
        let mut newly_set = 0;
        for flag in flags {
            if self.try_set(subject_id, flag).await? {
                newly_set += 1;
            }
        }
        Ok(newly_set)
    }

    /// Sets every flag in order, absorbing failures. Returns how many were
    /// newly set.
    pub async fn set_many(&self, subject_id: Uuid, flags: &[String]) -> usize {
        let mut newly_set = 0;
        for flag in flags {
            if self.set(subject_id, flag).await {
                newly_set += 1;
            }
        }
        newly_set
    }

    /// Whether `flag` is set.
    ///
    /// # Errors
    ///
    /// Returns the storage error.
    pub async fn try_has(&self, subject_id: Uuid, flag: &str) -> Result<bool, DomainError> {
        let key = RecordKey::new(NAMESPACE, subject_id, flag);
        Ok(self.store.get(&key).await?.is_some())
    }

    /// Whether `flag` is set. A storage failure reads as `false`.
    pub async fn has(&self, subject_id: Uuid, flag: &str) -> bool {
        self.try_has(subject_id, flag).await.unwrap_or_else(|e| {
            error!(%subject_id, flag, error = %e, "flag lookup failed, treating as unset");
            false
        })
    }

    /// Whether every flag in `flags` is set. True for an empty list.
    /// A storage failure reads as `false`.
    pub async fn has_all(&self, subject_id: Uuid, flags: &[String]) -> bool {
        if flags.is_empty() {
            return true;
        }
        match self.try_names(subject_id).await {
            Ok(names) => flags.iter().all(|flag| names.contains(flag)),
            Err(e) => {
                error!(%subject_id, error = %e, "flag lookup failed, has_all is false");
                false
            }
        }
    }

    /// Whether no flag in `flags` is set. True for an empty list.
    /// A storage failure reads as `false`.
    pub async fn has_none(&self, subject_id: Uuid, flags: &[String]) -> bool {
        if flags.is_empty() {
            return true;
        }
        match self.try_names(subject_id).await {
            Ok(names) => !flags.iter().any(|flag| names.contains(flag)),
            Err(e) => {
                error!(%subject_id, error = %e, "flag lookup failed, has_none is false");
                false
            }
        }
    }

    /// Every flag of the subject, oldest first.
    ///
    /// # Errors
    ///
    /// Returns the storage error, or `DomainError::Infrastructure` for a
    /// corrupt record.
    pub async fn try_get_all(&self, subject_id: Uuid) -> Result<Vec<Flag>, DomainError> {
        self.store
            .list(NAMESPACE, subject_id)
            .await?
            .into_iter()
            .map(|stored| -> Result<Flag, DomainError> {
                let record: FlagRecord = stored.decode()?;
                Ok(Flag {
                    name: stored.key.key,
                    set_at: record.set_at,
                })
            })
            .collect()
    }

    /// Every flag of the subject, oldest first. A storage failure reads as
    /// no flags.
    pub async fn get_all(&self, subject_id: Uuid) -> Vec<Flag> {
        self.try_get_all(subject_id).await.unwrap_or_else(|e| {
            error!(%subject_id, error = %e, "flag listing failed, treating as empty");
            Vec::new()
        })
    }

    /// The set of flag names, for evaluating several predicates against one
    /// read.
    ///
    /// # Errors
    ///
    /// Returns the storage error.
    pub async fn try_names(&self, subject_id: Uuid) -> Result<HashSet<String>, DomainError> {
        Ok(self
            .store
            .list(NAMESPACE, subject_id)
            .await?
            .into_iter()
            .map(|stored| stored.key.key)
            .collect())
    }

    /// Removes a flag. Administrative; ordinary play never clears flags.
    /// Returns whether the flag was present.
    ///
    /// # Errors
    ///
    /// Returns the storage error.
    pub async fn try_remove(&self, subject_id: Uuid, flag: &str) -> Result<bool, DomainError> {
        let removed = self
            .store
            .delete(&RecordKey::new(NAMESPACE, subject_id, flag))
            .await?;
        if removed {
            info!(%subject_id, flag, "flag removed");
        }
        Ok(removed)
    }

    /// Removes a flag, absorbing failures.
    pub async fn remove(&self, subject_id: Uuid, flag: &str) -> bool {
        self.try_remove(subject_id, flag).await.unwrap_or_else(|e| {
            error!(%subject_id, flag, error = %e, "failed to remove flag");
            false
        })
    }

    /// Removes every flag of the subject. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns the storage error.
    pub async fn clear_all(&self, subject_id: Uuid) -> Result<u64, DomainError> {
        let removed = self.store.clear(NAMESPACE, subject_id).await?;
        info!(%subject_id, removed, "flags cleared");
        Ok(removed)
    }
}
