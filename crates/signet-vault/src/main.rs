//! Signet Vault Server
//!
//! HTTP signing authority that validates serial-requests from devices and
//! issues signed serial assertions.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use signet_vault::api;
use signet_vault::config::ServiceConfig;
use signet_vault::storage::VaultDatabase;
use signet_vault::Env;

#[derive(Parser, Debug)]
#[command(name = "signet-vault")]
#[command(version, about = "Signet vault - serial assertion signing service")]
struct Args {
    /// Path to the JSON settings file.
    #[arg(long, env = "SIGNET_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides the settings file).
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Path to the SQLite database file (overrides the settings file).
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = ServiceConfig::load(args.config.as_deref())?;
    if let Some(addr) = args.addr {
        config.listen_addr = addr;
    }
    if let Some(db_path) = args.db_path {
        config.database_path = Some(db_path);
    }

    signet_vault::logging::init_tracing("signet=info", config.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.listen_addr,
        "Starting signet-vault"
    );

    let db_path = config.database_path();
    info!(path = %db_path.display(), "Opening vault database");
    let db = VaultDatabase::open(&db_path).await?;

    // An unknown keystore type or missing option is fatal before we bind.
    let keystore = signet_keystore::open_keystore(&config.keystore)?;

    let addr = config.listen_addr;
    let app = api::build_router(Env::new(db, keystore, config));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Signing service ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await?;

    info!("Vault stopped");
    Ok(())
}
