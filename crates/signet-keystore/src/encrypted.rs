//! Encrypted keystore.
//!
//! Sealed material is `nonce(12) || ciphertext` produced by ChaCha20-Poly1305
//! under a key derived from the process secret via HKDF-SHA256. Unsealing
//! happens only inside `sign`; the plaintext seed is zeroized on every path
//! out of the call.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroize;

use signet_assert::{AssertionKind, Headers};

use crate::error::KeyStoreError;
use crate::secret::ProcessSecret;
use crate::store::{signing_key_from_seed, KeyStore};
use crate::SEED_LEN;

/// Nonce size for ChaCha20-Poly1305.
const NONCE_SIZE: usize = 12;

pub struct EncryptedKeyStore {
    secret: ProcessSecret,
}

impl EncryptedKeyStore {
    pub fn new(secret: ProcessSecret) -> Self {
        Self { secret }
    }

    fn cipher(&self) -> Result<ChaCha20Poly1305, KeyStoreError> {
        let mut key_bytes = self.secret.sealing_key()?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key_bytes));
        key_bytes.zeroize();
        Ok(cipher)
    }

    fn seal(&self, seed: &[u8]) -> Result<Vec<u8>, KeyStoreError> {
        let cipher = self.cipher()?;
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, seed)
            .map_err(|e| KeyStoreError::Seal(e.to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Decrypt sealed material. The caller must zeroize the result.
    fn unseal(&self, sealed: &[u8]) -> Result<Vec<u8>, KeyStoreError> {
        if sealed.len() <= NONCE_SIZE {
            return Err(KeyStoreError::Unseal("sealed material too short".into()));
        }
        let cipher = self.cipher()?;
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_SIZE);
        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| KeyStoreError::Unseal(e.to_string()))
    }
}

impl KeyStore for EncryptedKeyStore {
    fn import(
        &self,
        _authority_id: &str,
        _key_id: &str,
        seed: &[u8],
    ) -> Result<Vec<u8>, KeyStoreError> {
        if seed.len() != SEED_LEN {
            return Err(KeyStoreError::InvalidKeyLength {
                expected: SEED_LEN,
                actual: seed.len(),
            });
        }
        self.seal(seed)
    }

    fn sign(
        &self,
        _authority_id: &str,
        _key_id: &str,
        sealed: &[u8],
        kind: AssertionKind,
        headers: &Headers,
        body: &[u8],
    ) -> Result<Vec<u8>, KeyStoreError> {
        let mut seed = self.unseal(sealed)?;
        let result = signing_key_from_seed(&seed)
            .and_then(|key| signet_assert::sign(kind, headers, body, &key).map_err(Into::into));
        seed.zeroize();
        result
    }
}

#[cfg(test)]
mod tests {
    use rand::RngCore;

    use super::*;
    use signet_assert::Decoder;

    fn store() -> EncryptedKeyStore {
        EncryptedKeyStore::new(ProcessSecret::new("factory-secret").unwrap())
    }

    fn seed() -> [u8; SEED_LEN] {
        let mut s = [0u8; SEED_LEN];
        OsRng.fill_bytes(&mut s);
        s
    }

    fn serial_headers() -> Headers {
        let mut headers = Headers::new();
        headers.insert("type".into(), "serial".into());
        headers.insert("brand-id".into(), "acme".into());
        headers.insert("serial".into(), "SN1".into());
        headers
    }

    #[test]
    fn sealed_material_is_not_plaintext() {
        let store = store();
        let seed = seed();
        let sealed = store.import("acme", "kid-1", &seed).unwrap();

        assert_ne!(&sealed[..], &seed[..]);
        // nonce + ciphertext + 16-byte tag
        assert_eq!(sealed.len(), NONCE_SIZE + SEED_LEN + 16);
    }

    #[test]
    fn import_then_sign_round_trips() {
        let store = store();
        let sealed = store.import("acme", "kid-1", &seed()).unwrap();

        let signed = store
            .sign(
                "acme",
                "kid-1",
                &sealed,
                AssertionKind::Serial,
                &serial_headers(),
                b"",
            )
            .unwrap();

        let decoded = Decoder::new(&signed).decode().unwrap().unwrap();
        assert_eq!(decoded.kind(), AssertionKind::Serial);
    }

    #[test]
    fn tampered_sealed_material_fails_to_unseal() {
        let store = store();
        let mut sealed = store.import("acme", "kid-1", &seed()).unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xff;

        let result = store.sign(
            "acme",
            "kid-1",
            &sealed,
            AssertionKind::Serial,
            &serial_headers(),
            b"",
        );
        assert!(matches!(result, Err(KeyStoreError::Unseal(_))));
    }

    #[test]
    fn wrong_secret_fails_to_unseal() {
        let sealed = store().import("acme", "kid-1", &seed()).unwrap();
        let other = EncryptedKeyStore::new(ProcessSecret::new("other-secret").unwrap());

        let result = other.sign(
            "acme",
            "kid-1",
            &sealed,
            AssertionKind::Serial,
            &serial_headers(),
            b"",
        );
        assert!(matches!(result, Err(KeyStoreError::Unseal(_))));
    }

    #[test]
    fn truncated_sealed_material_is_rejected() {
        let result = store().sign(
            "acme",
            "kid-1",
            &[0u8; 8],
            AssertionKind::Serial,
            &serial_headers(),
            b"",
        );
        assert!(matches!(result, Err(KeyStoreError::Unseal(_))));
    }
}
