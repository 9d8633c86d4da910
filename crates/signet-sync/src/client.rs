//! HTTP client for the cloud authority's replication endpoints.
//!
//! Every task is idempotent at the tuple level: re-running a sweep against
//! the same upstream state leaves the local row set unchanged.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use signet_keystore::auth_key;
use signet_vault::config::SyncConfig;
use signet_vault::storage::VaultDatabase;

/// Replication client errors.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Upstream refused the request: {0}")]
    Upstream(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Database(#[from] signet_vault::storage::StorageError),
}

/// A replicated account entry.
#[derive(Debug, Deserialize)]
struct SyncAccount {
    #[serde(rename = "authority-id")]
    authority_id: String,
    #[serde(default)]
    assertion: String,
}

/// A replicated keypair, sealed under this factory's keystore secret.
#[derive(Debug, Deserialize)]
struct SyncKeypair {
    #[serde(rename = "authority-id")]
    authority_id: String,
    #[serde(rename = "key-id")]
    key_id: String,
    #[serde(rename = "sealed-key")]
    sealed_key: String,
    #[serde(rename = "auth-key-hash", default)]
    auth_key_hash: String,
    #[serde(default = "default_true")]
    active: bool,
}

/// A replicated model entry.
#[derive(Debug, Deserialize)]
struct SyncModel {
    #[serde(rename = "brand-id")]
    brand_id: String,
    model: String,
    #[serde(rename = "api-key")]
    api_key: String,
    #[serde(rename = "authority-id")]
    authority_id: String,
    #[serde(rename = "key-id")]
    key_id: String,
    #[serde(rename = "key-active", default = "default_true")]
    key_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct AccountsResponse {
    success: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    accounts: Vec<SyncAccount>,
}

#[derive(Debug, Deserialize)]
struct KeypairsResponse {
    success: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    keypairs: Vec<SyncKeypair>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    success: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    models: Vec<SyncModel>,
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    success: bool,
    #[serde(default)]
    message: String,
}

/// Body of the keypairs request: the factory's keystore secret, so the
/// upstream can re-seal private material under it. Trust-on-transport;
/// the upstream URL must be HTTPS with an authenticated peer.
#[derive(Debug, Serialize)]
struct KeypairsRequest<'a> {
    secret: &'a str,
}

/// Replication client for a factory instance.
#[derive(Debug)]
pub struct FactoryClient {
    http: reqwest::Client,
    base_url: String,
}

impl FactoryClient {
    /// Create a replication client from the sync configuration.
    pub fn new(config: &SyncConfig) -> Result<Self, SyncError> {
        if config.upstream_url.is_empty() {
            return Err(SyncError::Config("upstream_url is empty".into()));
        }
        if config.username.is_empty() || config.api_key.is_empty() {
            return Err(SyncError::Config("sync credentials are missing".into()));
        }

        let mut headers = HeaderMap::new();
        let user = HeaderValue::from_str(&config.username)
            .map_err(|_| SyncError::Config("invalid sync username".into()))?;
        let key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| SyncError::Config("invalid sync API key".into()))?;
        headers.insert("user", user);
        headers.insert("api-key", key);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let base_url = config.upstream_url.trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Check HTTP response status, returning an error for non-success codes.
    fn check_status(resp: &reqwest::Response) -> Result<(), SyncError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(SyncError::Api {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").into(),
            });
        }
        Ok(())
    }

    // =========================================================================
    // Pull tasks
    // =========================================================================

    /// Replicate account assertions, upserting by authority id.
    pub async fn accounts(&self, db: &VaultDatabase) -> Result<(), SyncError> {
        let resp = self.http.get(self.url("/accounts")).send().await?;
        Self::check_status(&resp)?;
        let result: AccountsResponse = resp.json().await?;
        if !result.success {
            return Err(SyncError::Upstream(result.message));
        }

        for account in &result.accounts {
            db.upsert_account(&account.authority_id, &account.assertion)
                .await?;
        }

        info!(count = result.accounts.len(), "Accounts replicated");
        Ok(())
    }

    /// Replicate signing keys, preserving the sealing produced at first sync.
    ///
    /// The upstream re-seals each key under the transmitted keystore secret.
    /// Keypairs already present locally are skipped so a later sweep cannot
    /// replace the material recorded the first time.
    pub async fn signing_keys(
        &self,
        db: &VaultDatabase,
        keystore_secret: &str,
    ) -> Result<(), SyncError> {
        let resp = self
            .http
            .post(self.url("/keypairs"))
            .json(&KeypairsRequest {
                secret: keystore_secret,
            })
            .send()
            .await?;
        Self::check_status(&resp)?;
        let result: KeypairsResponse = resp.json().await?;
        if !result.success {
            return Err(SyncError::Upstream(result.message));
        }

        let mut imported = 0usize;
        for keypair in &result.keypairs {
            if db
                .get_keypair(&keypair.authority_id, &keypair.key_id)
                .await
                .is_ok()
            {
                continue;
            }

            let sealed = STANDARD.decode(&keypair.sealed_key).map_err(|e| {
                SyncError::Upstream(format!("undecodable sealed key material: {e}"))
            })?;

            db.create_keypair(
                &keypair.authority_id,
                &keypair.key_id,
                &sealed,
                &keypair.auth_key_hash,
                keypair.active,
            )
            .await?;

            // Record the auth binding so a later sign can detect material
            // re-sealed under a different secret.
            db.put_setting(
                &auth_key(&keypair.authority_id, &keypair.key_id),
                &keypair.auth_key_hash,
            )
            .await?;

            imported += 1;
        }

        info!(
            received = result.keypairs.len(),
            imported, "Signing keys replicated"
        );
        Ok(())
    }

    /// Replicate models, upserting by (brand, model, api-key).
    pub async fn models(&self, db: &VaultDatabase) -> Result<(), SyncError> {
        let resp = self.http.get(self.url("/models")).send().await?;
        Self::check_status(&resp)?;
        let result: ModelsResponse = resp.json().await?;
        if !result.success {
            return Err(SyncError::Upstream(result.message));
        }

        for model in &result.models {
            db.upsert_model(
                &model.brand_id,
                &model.model,
                &model.api_key,
                &model.authority_id,
                &model.key_id,
                model.key_active,
            )
            .await?;
        }

        info!(count = result.models.len(), "Models replicated");
        Ok(())
    }

    // =========================================================================
    // Push tasks
    // =========================================================================

    /// Upload unsynced signing logs, marking each on success.
    ///
    /// A failed entry is left untouched for the next sweep; the loop
    /// continues with the remaining entries.
    pub async fn signing_logs(&self, db: &VaultDatabase) -> Result<(), SyncError> {
        let logs = db.unsynced_signing_logs().await?;
        let total = logs.len();
        let mut sent = 0usize;

        for log in logs {
            match self.push_entry("/signinglog", &log).await {
                Ok(()) => {
                    if let Err(e) = db.mark_signing_log_synced(log.id).await {
                        warn!(id = log.id, error = %e, "Failed to mark signing log synced");
                        continue;
                    }
                    sent += 1;
                }
                Err(e) => {
                    warn!(id = log.id, error = %e, "Signing log upload failed, will retry");
                }
            }
        }

        info!(total, sent, "Signing logs uploaded");
        Ok(())
    }

    /// Upload factory test logs, deleting each on success.
    pub async fn test_logs(&self, db: &VaultDatabase) -> Result<(), SyncError> {
        let logs = db.list_test_logs().await?;
        let total = logs.len();
        let mut sent = 0usize;

        for log in logs {
            match self.push_entry("/testlog", &log).await {
                Ok(()) => {
                    if let Err(e) = db.delete_test_log(log.id).await {
                        warn!(id = log.id, error = %e, "Failed to delete uploaded test log");
                        continue;
                    }
                    sent += 1;
                }
                Err(e) => {
                    warn!(id = log.id, error = %e, "Test log upload failed, will retry");
                }
            }
        }

        info!(total, sent, "Test logs uploaded");
        Ok(())
    }

    /// POST one log entry and interpret the response envelope.
    async fn push_entry<T: Serialize>(&self, path: &str, entry: &T) -> Result<(), SyncError> {
        let resp = self.http.post(self.url(path)).json(entry).send().await?;
        Self::check_status(&resp)?;
        let result: PushResponse = resp.json().await?;
        if !result.success {
            return Err(SyncError::Upstream(result.message));
        }
        Ok(())
    }
}
