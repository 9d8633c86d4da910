//! Signing log and test log queries.

use super::db::{unix_timestamp, StorageError, VaultDatabase};
use super::models::{SigningLog, TestLog};

/// The outcome of a duplicate check for a (brand, model, serial) tuple.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateCheck {
    /// A prior entry exists for the tuple.
    pub duplicate: bool,
    /// A prior entry exists with a different sign-key fingerprint.
    pub key_swap: bool,
    /// Largest prior revision, or 0 when the tuple is new.
    pub max_revision: i64,
}

impl VaultDatabase {
    /// Check for prior signings of the tuple and report the max revision.
    pub async fn check_for_duplicate(
        &self,
        brand_id: &str,
        model_name: &str,
        serial: &str,
        fingerprint: &str,
    ) -> Result<DuplicateCheck, StorageError> {
        let row: (i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(MAX(revision), 0), COALESCE(SUM(fingerprint != ?), 0) \
             FROM signing_logs WHERE brand_id = ? AND model_name = ? AND serial = ?",
        )
        .bind(fingerprint)
        .bind(brand_id)
        .bind(model_name)
        .bind(serial)
        .fetch_one(self.pool())
        .await?;

        Ok(DuplicateCheck {
            duplicate: row.0 > 0,
            max_revision: row.1,
            key_swap: row.2 > 0,
        })
    }

    /// Append a signing log entry at the given revision.
    ///
    /// The UNIQUE(brand, model, serial, revision) index is the serialization
    /// point for concurrent signings of the same tuple: the loser's insert
    /// fails and the device retries with a fresh nonce.
    pub async fn create_signing_log(
        &self,
        brand_id: &str,
        model_name: &str,
        serial: &str,
        revision: i64,
        fingerprint: &str,
    ) -> Result<SigningLog, StorageError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO signing_logs (brand_id, model_name, serial, revision, fingerprint, created_at, synced) VALUES (?, ?, ?, ?, ?, ?, 0)",
        )
        .bind(brand_id)
        .bind(model_name)
        .bind(serial)
        .bind(revision)
        .bind(fingerprint)
        .bind(now)
        .execute(self.pool())
        .await?;

        sqlx::query_as::<_, SigningLog>(
            "SELECT * FROM signing_logs WHERE brand_id = ? AND model_name = ? AND serial = ? AND revision = ?",
        )
        .bind(brand_id)
        .bind(model_name)
        .bind(serial)
        .bind(revision)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| {
            StorageError::NotFound(format!("SigningLog {brand_id}/{model_name}/{serial}"))
        })
    }

    /// List signing log entries not yet uploaded upstream.
    pub async fn unsynced_signing_logs(&self) -> Result<Vec<SigningLog>, StorageError> {
        let logs = sqlx::query_as::<_, SigningLog>(
            "SELECT * FROM signing_logs WHERE synced = 0 ORDER BY id",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(logs)
    }

    /// Mark a signing log entry as uploaded.
    pub async fn mark_signing_log_synced(&self, id: i64) -> Result<bool, StorageError> {
        let result = sqlx::query("UPDATE signing_logs SET synced = 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count signing log entries for a (brand, model, serial) tuple.
    pub async fn count_signing_logs(
        &self,
        brand_id: &str,
        model_name: &str,
        serial: &str,
    ) -> Result<i64, StorageError> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM signing_logs WHERE brand_id = ? AND model_name = ? AND serial = ?",
        )
        .bind(brand_id)
        .bind(model_name)
        .bind(serial)
        .fetch_one(self.pool())
        .await?;

        Ok(row.0)
    }

    // =========================================================================
    // Test log queries
    // =========================================================================

    /// Record a factory test artifact.
    pub async fn create_test_log(
        &self,
        brand_id: &str,
        model_name: &str,
        filename: &str,
        data: &str,
    ) -> Result<TestLog, StorageError> {
        let now = unix_timestamp();

        let result = sqlx::query(
            "INSERT INTO test_logs (brand_id, model_name, filename, data, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(brand_id)
        .bind(model_name)
        .bind(filename)
        .bind(data)
        .bind(now)
        .execute(self.pool())
        .await?;

        let id = result.last_insert_rowid();
        sqlx::query_as::<_, TestLog>("SELECT * FROM test_logs WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("TestLog {id}")))
    }

    /// List all pending test artifacts.
    pub async fn list_test_logs(&self) -> Result<Vec<TestLog>, StorageError> {
        let logs = sqlx::query_as::<_, TestLog>("SELECT * FROM test_logs ORDER BY id")
            .fetch_all(self.pool())
            .await?;

        Ok(logs)
    }

    /// Delete an uploaded test artifact.
    pub async fn delete_test_log(&self, id: i64) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM test_logs WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
