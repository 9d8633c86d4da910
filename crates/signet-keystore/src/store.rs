//! The keystore capability set and configuration-driven selection.

use std::path::PathBuf;
use std::sync::Arc;

use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use signet_assert::{AssertionKind, Headers};

use crate::encrypted::EncryptedKeyStore;
use crate::error::KeyStoreError;
use crate::filesystem::FilesystemKeyStore;
use crate::secret::ProcessSecret;
use crate::SEED_LEN;

/// The capability set of a keypair store.
///
/// `sign` is re-entrant: it holds no mutable state, so concurrent calls on
/// distinct or identical keys are safe.
pub trait KeyStore: Send + Sync {
    /// Store private key material for (authority-id, key-id) and return its
    /// sealed form.
    fn import(
        &self,
        authority_id: &str,
        key_id: &str,
        seed: &[u8],
    ) -> Result<Vec<u8>, KeyStoreError>;

    /// Sign an assertion with the named key, unsealing the material for the
    /// duration of the call only.
    fn sign(
        &self,
        authority_id: &str,
        key_id: &str,
        sealed: &[u8],
        kind: AssertionKind,
        headers: &Headers,
        body: &[u8],
    ) -> Result<Vec<u8>, KeyStoreError>;
}

/// Keystore selection, from the service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyStoreConfig {
    /// `"filesystem"` or `"encrypted"`.
    pub kind: String,
    /// Root directory for the filesystem backend.
    pub path: Option<PathBuf>,
    /// Process secret for the encrypted backend.
    pub secret: Option<String>,
}

impl Default for KeyStoreConfig {
    fn default() -> Self {
        Self {
            kind: "filesystem".to_string(),
            path: None,
            secret: None,
        }
    }
}

/// Select and construct the configured keystore variant.
///
/// An unknown `kind` or a missing required option is a configuration error,
/// surfaced at startup before the service binds its listener.
pub fn open_keystore(config: &KeyStoreConfig) -> Result<Arc<dyn KeyStore>, KeyStoreError> {
    match config.kind.as_str() {
        "filesystem" => {
            let path = config.path.clone().ok_or_else(|| {
                KeyStoreError::Configuration("filesystem keystore requires a path".into())
            })?;
            Ok(Arc::new(FilesystemKeyStore::new(path)?))
        }
        "encrypted" => {
            let secret = config.secret.clone().ok_or_else(|| {
                KeyStoreError::Configuration("encrypted keystore requires a secret".into())
            })?;
            Ok(Arc::new(EncryptedKeyStore::new(ProcessSecret::new(
                secret,
            )?)))
        }
        other => Err(KeyStoreError::Configuration(format!(
            "unknown keystore type: {other}"
        ))),
    }
}

/// Deterministic settings code naming the auth binding of a keypair.
///
/// Replication records the upstream auth-key-hash under this code so a later
/// sign can detect material re-sealed under a different secret.
pub fn auth_key(authority_id: &str, key_id: &str) -> String {
    let digest = Sha256::digest(format!("{authority_id}/{key_id}").as_bytes());
    hex::encode(digest)
}

/// Build a signing key from raw seed bytes, zeroizing the intermediate copy.
pub(crate) fn signing_key_from_seed(seed: &[u8]) -> Result<SigningKey, KeyStoreError> {
    if seed.len() != SEED_LEN {
        return Err(KeyStoreError::InvalidKeyLength {
            expected: SEED_LEN,
            actual: seed.len(),
        });
    }
    let mut arr = [0u8; SEED_LEN];
    arr.copy_from_slice(seed);
    let key = SigningKey::from_bytes(&arr);
    arr.zeroize();
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_filesystem_keystore() {
        let dir = std::env::temp_dir().join(format!("signet-ks-{}", std::process::id()));
        let config = KeyStoreConfig {
            kind: "filesystem".into(),
            path: Some(dir.clone()),
            secret: None,
        };
        assert!(open_keystore(&config).is_ok());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn open_encrypted_keystore() {
        let config = KeyStoreConfig {
            kind: "encrypted".into(),
            path: None,
            secret: Some("factory-secret".into()),
        };
        assert!(open_keystore(&config).is_ok());
    }

    #[test]
    fn unknown_keystore_type_is_a_configuration_error() {
        let config = KeyStoreConfig {
            kind: "invalid".into(),
            path: None,
            secret: None,
        };
        assert!(matches!(
            open_keystore(&config),
            Err(KeyStoreError::Configuration(_))
        ));
    }

    #[test]
    fn filesystem_without_path_is_rejected() {
        let config = KeyStoreConfig {
            kind: "filesystem".into(),
            path: None,
            secret: None,
        };
        assert!(matches!(
            open_keystore(&config),
            Err(KeyStoreError::Configuration(_))
        ));
    }

    #[test]
    fn auth_key_is_stable_per_identity() {
        let a = auth_key("acme", "kid-1");
        assert_eq!(a, auth_key("acme", "kid-1"));
        assert_ne!(a, auth_key("acme", "kid-2"));
        assert_eq!(a.len(), 64);
    }
}
