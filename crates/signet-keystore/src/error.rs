//! Keystore error types.

use thiserror::Error;

/// Errors raised by the keypair store.
#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("Keystore configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid key material length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Sealing failed: {0}")]
    Seal(String),

    #[error("Unsealing failed: {0}")]
    Unseal(String),

    #[error("Signing failed: {0}")]
    Sign(#[from] signet_assert::AssertionError),
}
