//! Signet factory replication client
//!
//! Pulls accounts, signing keys, and models from the cloud authority down
//! to a factory instance, and pushes signing and test logs back upstream.
//! Runs as periodic background sweeps, one category at a time.

pub mod client;
pub mod scheduler;

pub use client::{FactoryClient, SyncError};
pub use scheduler::{run_once, run_scheduler};
