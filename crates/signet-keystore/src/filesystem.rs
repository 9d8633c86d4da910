//! Filesystem-backed keystore.
//!
//! Private material is stored raw on disk under a configured root, one file
//! per key at `<root>/<authority-id>/<key-id>`, owner-only permissions. The
//! sealed form is the file contents themselves; confidentiality rests on
//! filesystem permissions.

use std::path::{Path, PathBuf};

use zeroize::Zeroize;

use signet_assert::{AssertionKind, Headers};

use crate::error::KeyStoreError;
use crate::store::{signing_key_from_seed, KeyStore};
use crate::SEED_LEN;

pub struct FilesystemKeyStore {
    root: PathBuf,
}

impl FilesystemKeyStore {
    /// Open the store rooted at `root`, creating the directory if needed.
    pub fn new(root: PathBuf) -> Result<Self, KeyStoreError> {
        std::fs::create_dir_all(&root)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&root, std::fs::Permissions::from_mode(0o700))?;
        }
        Ok(Self { root })
    }

    fn key_path(&self, authority_id: &str, key_id: &str) -> PathBuf {
        self.root.join(authority_id).join(key_id)
    }

    /// Read the raw seed from disk, verifying permissions first.
    fn load(&self, path: &Path) -> Result<[u8; SEED_LEN], KeyStoreError> {
        use std::io::Read;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let metadata = std::fs::metadata(path)?;
            let mode = metadata.permissions().mode() & 0o777;
            if mode != 0o600 {
                return Err(KeyStoreError::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    format!("key file has insecure permissions: {mode:o} (expected 600)"),
                )));
            }
        }

        let mut file = std::fs::File::open(path)?;
        let mut buf = [0u8; SEED_LEN];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }
}

impl KeyStore for FilesystemKeyStore {
    fn import(
        &self,
        authority_id: &str,
        key_id: &str,
        seed: &[u8],
    ) -> Result<Vec<u8>, KeyStoreError> {
        if seed.len() != SEED_LEN {
            return Err(KeyStoreError::InvalidKeyLength {
                expected: SEED_LEN,
                actual: seed.len(),
            });
        }

        let path = self.key_path(authority_id, key_id);
        let dir = path.parent().ok_or_else(|| {
            KeyStoreError::Configuration("keystore path has no parent directory".into())
        })?;
        std::fs::create_dir_all(dir)?;
        std::fs::write(&path, seed)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(seed.to_vec())
    }

    fn sign(
        &self,
        authority_id: &str,
        key_id: &str,
        sealed: &[u8],
        kind: AssertionKind,
        headers: &Headers,
        body: &[u8],
    ) -> Result<Vec<u8>, KeyStoreError> {
        // Replicated keypair rows carry the material; locally imported keys
        // may pass an empty sealed form and are read from disk instead.
        let mut seed = if sealed.is_empty() {
            self.load(&self.key_path(authority_id, key_id))?
        } else {
            if sealed.len() != SEED_LEN {
                return Err(KeyStoreError::InvalidKeyLength {
                    expected: SEED_LEN,
                    actual: sealed.len(),
                });
            }
            let mut buf = [0u8; SEED_LEN];
            buf.copy_from_slice(sealed);
            buf
        };

        let result = signing_key_from_seed(&seed)
            .and_then(|key| signet_assert::sign(kind, headers, body, &key).map_err(Into::into));
        seed.zeroize();
        result
    }
}
