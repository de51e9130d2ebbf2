//! `PostgreSQL` implementation of the `RecordStore` trait.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use emberwake_core::error::DomainError;
use emberwake_core::record::{RecordKey, RecordStore, StoredRecord};

fn infrastructure(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("record store query failed: {err}"))
}

type RecordRow = (String, Uuid, String, serde_json::Value, i64);

fn to_stored_record((namespace, subject_id, key, value, version): RecordRow) -> StoredRecord {
    StoredRecord {
        key: RecordKey {
            namespace,
            subject_id,
            key,
        },
        value,
        version,
    }
}

/// PostgreSQL-backed record store.
#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    /// Creates a new `PgRecordStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the workspace migrations.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if a migration fails.
    pub async fn migrate(&self) -> Result<(), DomainError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DomainError::Infrastructure(format!("migration failed: {e}")))
    }

    async fn current_version(&self, key: &RecordKey) -> Result<i64, DomainError> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT version FROM records \
             WHERE namespace = $1 AND subject_id = $2 AND record_key = $3",
        )
        .bind(&key.namespace)
        .bind(key.subject_id)
        .bind(&key.key)
        .fetch_optional(&self.pool)
        .await
        .map_err(infrastructure)?;
        Ok(row.map_or(0, |(version,)| version))
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<StoredRecord>, DomainError> {
        let row: Option<RecordRow> = sqlx::query_as(
            "SELECT namespace, subject_id, record_key, value, version FROM records \
             WHERE namespace = $1 AND subject_id = $2 AND record_key = $3",
        )
        .bind(&key.namespace)
        .bind(key.subject_id)
        .bind(&key.key)
        .fetch_optional(&self.pool)
        .await
        .map_err(infrastructure)?;
        Ok(row.map(to_stored_record))
    }

    async fn put(
        &self,
        key: &RecordKey,
        value: serde_json::Value,
        expected_version: i64,
    ) -> Result<StoredRecord, DomainError> {
        let written: Option<(i64,)> = if expected_version == 0 {
            sqlx::query_as(
                "INSERT INTO records (namespace, subject_id, record_key, value, version) \
                 VALUES ($1, $2, $3, $4, 1) \
                 ON CONFLICT (namespace, subject_id, record_key) DO NOTHING \
                 RETURNING version",
            )
            .bind(&key.namespace)
            .bind(key.subject_id)
            .bind(&key.key)
            .bind(&value)
            .fetch_optional(&self.pool)
            .await
            .map_err(infrastructure)?
        } else {
            sqlx::query_as(
                "UPDATE records SET value = $4, version = version + 1, updated_at = NOW() \
                 WHERE namespace = $1 AND subject_id = $2 AND record_key = $3 AND version = $5 \
                 RETURNING version",
            )
            .bind(&key.namespace)
            .bind(key.subject_id)
            .bind(&key.key)
            .bind(&value)
            .bind(expected_version)
            .fetch_optional(&self.pool)
            .await
            .map_err(infrastructure)?
        };

        match written {
            Some((version,)) => {
                debug!(record = %key, version, "record written");
                Ok(StoredRecord {
                    key: key.clone(),
                    value,
                    version,
                })
            }
            None => Err(DomainError::ConcurrencyConflict {
                key: key.to_string(),
                expected: expected_version,
                actual: self.current_version(key).await?,
            }),
        }
    }

    async fn delete(&self, key: &RecordKey) -> Result<bool, DomainError> {
        let result = sqlx::query(
            "DELETE FROM records WHERE namespace = $1 AND subject_id = $2 AND record_key = $3",
        )
        .bind(&key.namespace)
        .bind(key.subject_id)
        .bind(&key.key)
        .execute(&self.pool)
        .await
        .map_err(infrastructure)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(
        &self,
        namespace: &str,
        subject_id: Uuid,
    ) -> Result<Vec<StoredRecord>, DomainError> {
        let rows: Vec<RecordRow> = sqlx::query_as(
            "SELECT namespace, subject_id, record_key, value, version FROM records \
             WHERE namespace = $1 AND subject_id = $2 ORDER BY seq ASC",
        )
        .bind(namespace)
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infrastructure)?;
        Ok(rows.into_iter().map(to_stored_record).collect())
    }

    async fn clear(&self, namespace: &str, subject_id: Uuid) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM records WHERE namespace = $1 AND subject_id = $2")
            .bind(namespace)
            .bind(subject_id)
            .execute(&self.pool)
            .await
            .map_err(infrastructure)?;
        Ok(result.rows_affected())
    }
}
