//! Signet vault service library
//!
//! The serial-assertion signing authority:
//! - SQLite storage for keypairs, models, sub-stores, nonces, and logs
//! - Nonce issuance and atomic single-use validation
//! - Model resolution with sub-store pivots
//! - The serial-request signing pipeline over a custodial keystore
//! - The HTTP signing API

pub mod api;
pub mod config;
pub mod env;
pub mod error;
pub mod logging;
pub mod resolver;
pub mod sign;
pub mod storage;

pub use config::{ServiceConfig, SyncConfig};
pub use env::Env;
pub use error::SignError;
