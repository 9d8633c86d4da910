//! The request-scope environment.
//!
//! Configuration, database handle, and keystore travel together as one
//! value injected at the router boundary; tests construct an isolated
//! environment per case.

use std::sync::Arc;

use signet_keystore::KeyStore;

use crate::config::ServiceConfig;
use crate::storage::VaultDatabase;

#[derive(Clone)]
pub struct Env {
    pub db: VaultDatabase,
    pub keystore: Arc<dyn KeyStore>,
    pub config: Arc<ServiceConfig>,
}

impl Env {
    pub fn new(db: VaultDatabase, keystore: Arc<dyn KeyStore>, config: ServiceConfig) -> Self {
        Self {
            db,
            keystore,
            config: Arc::new(config),
        }
    }
}
