//! Registrar command-line front-end
//!
//! Drives the relationship synchronizer against the record API:
//!
//!   registrar list classes --query alg
//!   registrar enroll <class-id> <student-id>
//!   registrar set-department <class-id> <department-id>
//!
//! The API location comes from `--api-base-url`, `REGISTRAR_API_BASE_URL`,
//! or a TOML file passed with `--config`.

use anyhow::{Context, Result};
use clap::Parser;
use registrar_cli::{Args, run};
use registrar_store::HttpStore;
use registrar_sync::{EntityCache, RelationshipSynchronizer};
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let store = HttpStore::new(args.store_config()?).context("failed to create store client")?;
    info!("using record API at {}", store.config().api_base_url);
    let sync = RelationshipSynchronizer::new(Arc::new(store), Arc::new(EntityCache::new()));

    let mut stdout = std::io::stdout().lock();
    run(&sync, args.command, &mut stdout).await
}

fn init_logging(verbose: bool) {
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact();
    match EnvFilter::try_from_default_env() {
        Ok(filter) => builder.with_env_filter(filter).init(),
        Err(_) => builder.init(),
    }
}
