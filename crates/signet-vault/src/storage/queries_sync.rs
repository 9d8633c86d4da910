//! Account and settings queries used by replication.

use super::db::{StorageError, VaultDatabase};
use super::models::{Account, Setting};

impl VaultDatabase {
    /// Upsert a replicated account assertion by authority id.
    pub async fn upsert_account(
        &self,
        authority_id: &str,
        assertion_text: &str,
    ) -> Result<Account, StorageError> {
        sqlx::query(
            "INSERT INTO accounts (authority_id, assertion_text) VALUES (?, ?) \
             ON CONFLICT (authority_id) DO UPDATE SET assertion_text = excluded.assertion_text",
        )
        .bind(authority_id)
        .bind(assertion_text)
        .execute(self.pool())
        .await?;

        self.get_account(authority_id).await
    }

    /// Get an account by authority id.
    pub async fn get_account(&self, authority_id: &str) -> Result<Account, StorageError> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE authority_id = ?")
            .bind(authority_id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("Account {authority_id}")))
    }

    /// Count replicated accounts.
    pub async fn count_accounts(&self) -> Result<i64, StorageError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts")
            .fetch_one(self.pool())
            .await?;

        Ok(row.0)
    }

    /// Store a settings row, replacing any previous value for the code.
    pub async fn put_setting(&self, code: &str, data: &str) -> Result<Setting, StorageError> {
        sqlx::query(
            "INSERT INTO settings (code, data) VALUES (?, ?) \
             ON CONFLICT (code) DO UPDATE SET data = excluded.data",
        )
        .bind(code)
        .bind(data)
        .execute(self.pool())
        .await?;

        self.get_setting(code).await
    }

    /// Get a settings row by code.
    pub async fn get_setting(&self, code: &str) -> Result<Setting, StorageError> {
        sqlx::query_as::<_, Setting>("SELECT * FROM settings WHERE code = ?")
            .bind(code)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("Setting {code}")))
    }
}
