//! Periodic replication sweeps.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use signet_vault::config::ServiceConfig;
use signet_vault::storage::VaultDatabase;

use crate::client::FactoryClient;

/// Run one replication sweep: pulls first, then pushes, one category at a
/// time. A failed task is logged and left for the next sweep; the remaining
/// tasks still run.
pub async fn run_once(client: &FactoryClient, db: &VaultDatabase, config: &ServiceConfig) {
    if let Err(e) = client.accounts(db).await {
        warn!(task = "accounts", error = %e, "Replication task failed");
    }

    match config.keystore.secret.as_deref() {
        Some(secret) => {
            if let Err(e) = client.signing_keys(db, secret).await {
                warn!(task = "signing-keys", error = %e, "Replication task failed");
            }
        }
        None => {
            warn!(
                task = "signing-keys",
                "No keystore secret configured, skipping signing-key replication"
            );
        }
    }

    if let Err(e) = client.models(db).await {
        warn!(task = "models", error = %e, "Replication task failed");
    }

    if let Err(e) = client.signing_logs(db).await {
        warn!(task = "signing-logs", error = %e, "Replication task failed");
    }

    if let Err(e) = client.test_logs(db).await {
        warn!(task = "test-logs", error = %e, "Replication task failed");
    }
}

/// Run replication sweeps forever on the configured interval.
///
/// Sweeps never overlap: a tick that fires while the previous sweep is
/// still running is delayed, not stacked.
pub async fn run_scheduler(client: &FactoryClient, db: &VaultDatabase, config: &ServiceConfig) {
    let period = Duration::from_secs(config.sync.interval_secs.max(1));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(interval_secs = config.sync.interval_secs, "Replication scheduler started");

    loop {
        ticker.tick().await;
        run_once(client, db, config).await;
    }
}
