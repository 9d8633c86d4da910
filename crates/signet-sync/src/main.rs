//! Signet Factory Sync
//!
//! Replicates identity material from the cloud authority into a factory
//! vault and uploads the factory's signing and test logs upstream.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use signet_sync::{run_once, run_scheduler, FactoryClient};
use signet_vault::config::ServiceConfig;
use signet_vault::storage::VaultDatabase;

#[derive(Parser, Debug)]
#[command(name = "signet-sync")]
#[command(version, about = "Signet factory sync - replication with the cloud authority")]
struct Args {
    /// Path to the JSON settings file.
    #[arg(long, env = "SIGNET_CONFIG")]
    config: Option<PathBuf>,

    /// Run a single sweep and exit instead of looping.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = ServiceConfig::load(args.config.as_deref())?;
    signet_vault::logging::init_tracing("signet=info", config.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        upstream = %config.sync.upstream_url,
        "Starting signet-sync"
    );

    let db_path = config.database_path();
    let db = VaultDatabase::open(&db_path).await?;

    // Incomplete sync configuration is fatal at startup.
    let client = FactoryClient::new(&config.sync)?;

    if args.once {
        run_once(&client, &db, &config).await;
    } else {
        run_scheduler(&client, &db, &config).await;
    }

    Ok(())
}
