//! Custodial keypair store.
//!
//! Signing keypairs are held either as raw material on disk (filesystem
//! backend) or as sealed ciphertext decrypted on demand under a process-wide
//! secret (encrypted backend). The store exposes two capabilities: importing
//! private material (returning its sealed form) and signing an assertion
//! with a named key.

mod encrypted;
mod error;
mod filesystem;
mod secret;
mod store;

pub use encrypted::EncryptedKeyStore;
pub use error::KeyStoreError;
pub use filesystem::FilesystemKeyStore;
pub use secret::ProcessSecret;
pub use store::{auth_key, open_keystore, KeyStore, KeyStoreConfig};

/// Length of the raw ed25519 private key material.
pub const SEED_LEN: usize = 32;
