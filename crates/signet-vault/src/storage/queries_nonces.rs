//! Device nonce queries.
//!
//! The single-use guarantee rests on the conditional delete in
//! `consume_device_nonce`: there is no read-then-delete pair to race.

use rand::rngs::OsRng;
use rand::RngCore;

use super::db::{unix_timestamp, StorageError, VaultDatabase};
use super::models::DeviceNonce;

impl VaultDatabase {
    /// Issue a fresh device nonce with the given lifetime in seconds.
    pub async fn create_device_nonce(&self, ttl_secs: i64) -> Result<DeviceNonce, StorageError> {
        let mut raw = [0u8; 16];
        OsRng.fill_bytes(&mut raw);
        let nonce = hex::encode(raw);
        let expiry = unix_timestamp() + ttl_secs;

        sqlx::query("INSERT INTO device_nonces (nonce, expiry) VALUES (?, ?)")
            .bind(&nonce)
            .bind(expiry)
            .execute(self.pool())
            .await?;

        Ok(DeviceNonce { nonce, expiry })
    }

    /// Atomically verify and consume a nonce.
    ///
    /// Returns `true` iff the nonce existed and had not expired; a nonce
    /// whose expiry equals the current second is still valid.
    pub async fn consume_device_nonce(&self, nonce: &str) -> Result<bool, StorageError> {
        let now = unix_timestamp();

        let result = sqlx::query("DELETE FROM device_nonces WHERE nonce = ? AND expiry >= ?")
            .bind(nonce)
            .bind(now)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Remove all expired nonces. Returns the number deleted.
    pub async fn delete_expired_device_nonces(&self) -> Result<u64, StorageError> {
        let now = unix_timestamp();

        let result = sqlx::query("DELETE FROM device_nonces WHERE expiry < ?")
            .bind(now)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }
}
