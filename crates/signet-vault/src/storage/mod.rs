//! Storage layer for the signet vault.

pub mod db;
pub mod models;
mod queries;
mod queries_logs;
mod queries_nonces;
mod queries_sync;


pub use db::{unix_timestamp, StorageError, VaultDatabase};
pub use models::{Account, DeviceNonce, Keypair, Model, Setting, SigningLog, Substore, TestLog};
pub use queries_logs::DuplicateCheck;
