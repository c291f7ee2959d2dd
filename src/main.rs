//! pollkv server binary.

use pollkv::config::{Backend, Config};
use pollkv::runtime;
use pollkv::storage::{ChainedTable, MapStore};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        listen = %config.listen,
        backend = ?config.backend,
        buffer_size = config.buffer_size,
        "Starting pollkv server"
    );

    let result = match config.backend {
        Backend::Map => runtime::run(&config, MapStore::new()),
        Backend::Chained => {
            info!(buckets = config.buckets, "Using chained hashtable");
            runtime::run(&config, ChainedTable::with_buckets(config.buckets))
        }
    };

    if let Err(ref e) = result {
        error!(error = %e, "Server stopped");
    }
    result?;
    Ok(())
}
