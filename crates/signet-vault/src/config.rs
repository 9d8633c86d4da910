//! Service configuration.
//!
//! Resolution order: built-in defaults, then the JSON settings file, then
//! `SIGNET_*` environment variables; CLI flags (handled in the binaries)
//! take highest priority.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use signet_keystore::KeyStoreConfig;

/// Complete vault service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Address the signing API listens on.
    pub listen_addr: SocketAddr,
    /// Path to the SQLite database; defaults to `~/.signet/vault.db`.
    pub database_path: Option<PathBuf>,
    /// Keystore variant selection.
    pub keystore: KeyStoreConfig,
    /// Lifetime of issued device nonces, in seconds.
    pub nonce_ttl_secs: i64,
    /// Replication targets for factory instances.
    pub sync: SyncConfig,
    /// Emit JSON log lines instead of the human-readable format.
    pub log_json: bool,
}

/// Upstream replication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Base URL of the cloud authority; empty disables replication.
    pub upstream_url: String,
    pub username: String,
    pub api_key: String,
    /// Deadline for each outbound replication call, in seconds.
    pub timeout_secs: u64,
    /// Interval between replication sweeps, in seconds.
    pub interval_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_path: None,
            keystore: KeyStoreConfig::default(),
            nonce_ttl_secs: 600,
            sync: SyncConfig::default(),
            log_json: false,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            upstream_url: String::new(),
            username: String::new(),
            api_key: String::new(),
            timeout_secs: 30,
            interval_secs: 300,
        }
    }
}

/// Configuration loading errors; fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl ServiceConfig {
    /// Load configuration with hierarchical resolution.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|source| {
                    ConfigError::Read {
                        path: path.to_path_buf(),
                        source,
                    }
                })?;
                serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            None => Self::default(),
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SIGNET_LISTEN_ADDR") {
            if let Ok(addr) = val.parse() {
                self.listen_addr = addr;
            }
        }
        if let Ok(val) = std::env::var("SIGNET_DATABASE_PATH") {
            self.database_path = Some(PathBuf::from(val));
        }
        if let Ok(val) = std::env::var("SIGNET_KEYSTORE_TYPE") {
            self.keystore.kind = val;
        }
        if let Ok(val) = std::env::var("SIGNET_KEYSTORE_PATH") {
            self.keystore.path = Some(PathBuf::from(val));
        }
        if let Ok(val) = std::env::var("SIGNET_KEYSTORE_SECRET") {
            self.keystore.secret = Some(val);
        }
        if let Ok(val) = std::env::var("SIGNET_NONCE_TTL_SECS") {
            if let Ok(ttl) = val.parse() {
                self.nonce_ttl_secs = ttl;
            }
        }
        if let Ok(val) = std::env::var("SIGNET_UPSTREAM_URL") {
            self.sync.upstream_url = val;
        }
        if let Ok(val) = std::env::var("SIGNET_SYNC_USERNAME") {
            self.sync.username = val;
        }
        if let Ok(val) = std::env::var("SIGNET_SYNC_API_KEY") {
            self.sync.api_key = val;
        }
    }

    /// The database path, falling back to `~/.signet/vault.db`.
    pub fn database_path(&self) -> PathBuf {
        self.database_path.clone().unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".signet").join("vault.db")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = ServiceConfig::default();
        assert_eq!(config.nonce_ttl_secs, 600);
        assert_eq!(config.sync.timeout_secs, 30);
        assert_eq!(config.keystore.kind, "filesystem");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: ServiceConfig =
            serde_json::from_str(r#"{"nonce_ttl_secs": 60}"#).unwrap();
        assert_eq!(config.nonce_ttl_secs, 60);
        assert_eq!(config.sync.interval_secs, 300);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = ServiceConfig::load(Some(Path::new("/nonexistent/settings.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
