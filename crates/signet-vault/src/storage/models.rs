//! Data models for vault storage.

use serde::{Deserialize, Serialize};

/// A custodial signing keypair; the private material is stored sealed.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Keypair {
    pub id: i64,
    pub authority_id: String,
    pub key_id: String,
    pub sealed_material: Vec<u8>,
    pub auth_key_hash: String,
    pub active: i64,
    pub created_at: i64,
}

/// A brand/model identity bound to a signing keypair.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Model {
    pub id: i64,
    pub brand_id: String,
    pub model_name: String,
    pub api_key: String,
    pub authority_id: String,
    pub key_id: String,
    pub key_active: i64,
    pub created_at: i64,
}

/// A pivot that re-homes a (brand, model, serial) to a different model.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Substore {
    pub id: i64,
    pub brand_id: String,
    pub model_name: String,
    pub serial: String,
    pub from_model_id: i64,
    pub store_id: String,
    pub model_name_override: String,
}

/// A replicated account assertion, stored opaquely.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub authority_id: String,
    pub assertion_text: String,
}

/// A key/value settings row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Setting {
    pub code: String,
    pub data: String,
}

/// A single-use device nonce.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeviceNonce {
    pub nonce: String,
    pub expiry: i64,
}

/// One signed (brand, model, serial) tuple at a given revision.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "kebab-case")]
pub struct SigningLog {
    pub id: i64,
    pub brand_id: String,
    pub model_name: String,
    pub serial: String,
    pub revision: i64,
    pub fingerprint: String,
    pub created_at: i64,
    #[serde(skip)]
    pub synced: i64,
}

/// A factory-captured test artifact, uploaded upstream then deleted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "kebab-case")]
pub struct TestLog {
    pub id: i64,
    pub brand_id: String,
    pub model_name: String,
    pub filename: String,
    pub data: String,
    pub created_at: i64,
}
