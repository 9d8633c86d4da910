//! The process-wide sealing secret.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::KeyStoreError;

/// HKDF info string for sealing key derivation.
const HKDF_INFO: &[u8] = b"signet-keystore-seal-v1";

/// HKDF salt for domain separation (recommended by RFC 5869).
const HKDF_SALT: &[u8] = b"signet-keystore-hkdf-salt-v1";

/// The keystore's process secret.
///
/// Initialized once at startup from configuration, used exclusively for
/// sealing and unsealing private key material, and never written back out.
pub struct ProcessSecret {
    bytes: Vec<u8>,
}

impl std::fmt::Debug for ProcessSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessSecret")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

impl Drop for ProcessSecret {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl ProcessSecret {
    /// Wrap a configured secret string.
    pub fn new(secret: impl Into<String>) -> Result<Self, KeyStoreError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(KeyStoreError::Configuration(
                "keystore secret must not be empty".into(),
            ));
        }
        Ok(Self {
            bytes: secret.into_bytes(),
        })
    }

    /// Derive the 32-byte sealing key via HKDF-SHA256.
    ///
    /// The caller is responsible for zeroizing the returned bytes.
    pub(crate) fn sealing_key(&self) -> Result<[u8; 32], KeyStoreError> {
        let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), &self.bytes);
        let mut key = [0u8; 32];
        hk.expand(HKDF_INFO, &mut key)
            .map_err(|e| KeyStoreError::Seal(e.to_string()))?;
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_secret_is_rejected() {
        assert!(ProcessSecret::new("").is_err());
    }

    #[test]
    fn sealing_key_is_deterministic() {
        let a = ProcessSecret::new("factory-secret").unwrap();
        let b = ProcessSecret::new("factory-secret").unwrap();
        assert_eq!(a.sealing_key().unwrap(), b.sealing_key().unwrap());
    }

    #[test]
    fn different_secrets_derive_different_keys() {
        let a = ProcessSecret::new("factory-secret").unwrap();
        let b = ProcessSecret::new("other-secret").unwrap();
        assert_ne!(a.sealing_key().unwrap(), b.sealing_key().unwrap());
    }

    #[test]
    fn debug_impl_redacts_secret() {
        let secret = ProcessSecret::new("factory-secret").unwrap();
        let debug_output = format!("{secret:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("factory-secret"));
    }
}
