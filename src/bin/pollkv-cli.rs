//! Interactive pollkv client.

use clap::Parser;
use pollkv::client::{self, ClientArgs};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = ClientArgs::parse();

    // Logs go to stderr so they never interleave with replies on stdout.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = client::run(args).await {
        error!(error = %e, "Client failed");
        return Err(e.into());
    }
    Ok(())
}
