//! Keypair, model, and sub-store queries.

use super::db::{unix_timestamp, StorageError, VaultDatabase};
use super::models::{Keypair, Model, Substore};

impl VaultDatabase {
    // =========================================================================
    // Keypair queries
    // =========================================================================

    /// Register a signing keypair with its sealed material.
    pub async fn create_keypair(
        &self,
        authority_id: &str,
        key_id: &str,
        sealed_material: &[u8],
        auth_key_hash: &str,
        active: bool,
    ) -> Result<Keypair, StorageError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO keypairs (authority_id, key_id, sealed_material, auth_key_hash, active, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(authority_id)
        .bind(key_id)
        .bind(sealed_material)
        .bind(auth_key_hash)
        .bind(i64::from(active))
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_keypair(authority_id, key_id).await
    }

    /// Get a keypair by its public identifiers.
    pub async fn get_keypair(
        &self,
        authority_id: &str,
        key_id: &str,
    ) -> Result<Keypair, StorageError> {
        sqlx::query_as::<_, Keypair>(
            "SELECT * FROM keypairs WHERE authority_id = ? AND key_id = ?",
        )
        .bind(authority_id)
        .bind(key_id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| StorageError::NotFound(format!("Keypair {authority_id}/{key_id}")))
    }

    // =========================================================================
    // Model queries
    // =========================================================================

    /// Register a model bound to a signing keypair.
    pub async fn create_model(
        &self,
        brand_id: &str,
        model_name: &str,
        api_key: &str,
        authority_id: &str,
        key_id: &str,
        key_active: bool,
    ) -> Result<Model, StorageError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO models (brand_id, model_name, api_key, authority_id, key_id, key_active, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(brand_id)
        .bind(model_name)
        .bind(api_key)
        .bind(authority_id)
        .bind(key_id)
        .bind(i64::from(key_active))
        .bind(now)
        .execute(self.pool())
        .await?;

        self.find_model(brand_id, model_name, api_key)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("Model {brand_id}/{model_name}")))
    }

    /// Find a model by identity, scoped by the presented API key.
    pub async fn find_model(
        &self,
        brand_id: &str,
        model_name: &str,
        api_key: &str,
    ) -> Result<Option<Model>, StorageError> {
        let model = sqlx::query_as::<_, Model>(
            "SELECT * FROM models WHERE brand_id = ? AND model_name = ? AND api_key = ?",
        )
        .bind(brand_id)
        .bind(model_name)
        .bind(api_key)
        .fetch_optional(self.pool())
        .await?;

        Ok(model)
    }

    /// Get a model by row id.
    pub async fn get_model(&self, id: i64) -> Result<Model, StorageError> {
        sqlx::query_as::<_, Model>("SELECT * FROM models WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("Model {id}")))
    }

    /// Upsert a replicated model by (brand, model, api-key).
    pub async fn upsert_model(
        &self,
        brand_id: &str,
        model_name: &str,
        api_key: &str,
        authority_id: &str,
        key_id: &str,
        key_active: bool,
    ) -> Result<Model, StorageError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO models (brand_id, model_name, api_key, authority_id, key_id, key_active, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (brand_id, model_name, api_key) \
             DO UPDATE SET authority_id = excluded.authority_id, key_id = excluded.key_id, key_active = excluded.key_active",
        )
        .bind(brand_id)
        .bind(model_name)
        .bind(api_key)
        .bind(authority_id)
        .bind(key_id)
        .bind(i64::from(key_active))
        .bind(now)
        .execute(self.pool())
        .await?;

        self.find_model(brand_id, model_name, api_key)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("Model {brand_id}/{model_name}")))
    }

    /// Check whether any model tenant holds the presented API key.
    pub async fn api_key_exists(&self, api_key: &str) -> Result<bool, StorageError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM models WHERE api_key = ?")
            .bind(api_key)
            .fetch_one(self.pool())
            .await?;

        Ok(row.0 > 0)
    }

    // =========================================================================
    // Sub-store queries
    // =========================================================================

    /// Register a sub-store pivot for a (brand, model, serial).
    pub async fn create_substore(
        &self,
        brand_id: &str,
        model_name: &str,
        serial: &str,
        from_model_id: i64,
        store_id: &str,
        model_name_override: &str,
    ) -> Result<Substore, StorageError> {
        sqlx::query(
            "INSERT INTO substores (brand_id, model_name, serial, from_model_id, store_id, model_name_override) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(brand_id)
        .bind(model_name)
        .bind(serial)
        .bind(from_model_id)
        .bind(store_id)
        .bind(model_name_override)
        .execute(self.pool())
        .await?;

        self.find_substore(brand_id, model_name, serial)
            .await?
            .ok_or_else(|| {
                StorageError::NotFound(format!("Substore {brand_id}/{model_name}/{serial}"))
            })
    }

    /// Find the pivot row for a (brand, declared model, serial).
    pub async fn find_substore(
        &self,
        brand_id: &str,
        model_name: &str,
        serial: &str,
    ) -> Result<Option<Substore>, StorageError> {
        let substore = sqlx::query_as::<_, Substore>(
            "SELECT * FROM substores WHERE brand_id = ? AND model_name = ? AND serial = ?",
        )
        .bind(brand_id)
        .bind(model_name)
        .bind(serial)
        .fetch_optional(self.pool())
        .await?;

        Ok(substore)
    }
}
