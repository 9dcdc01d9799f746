//! # Stockroom Entry Point
//!
//! ## Startup Sequence
//! 1. Parse the command line
//! 2. Load configuration (file, then `STOCKROOM_*` environment)
//! 3. Initialize tracing (`RUST_LOG`, else the configured filter)
//! 4. Build the app (hosted or `--offline`), restore the session
//! 5. Run the command
//!
//! A failed command prints its alert to stderr and exits with status 1.

use anyhow::Context;
use clap::Parser;

use stockroom::cli::{self, Cli};
use stockroom::state::ConfigState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let config = ConfigState::load(args.config.as_deref()).context("Failed to load configuration")?;
    stockroom::init_tracing(&config.log_filter);

    if let Err(err) = cli::run(args, config).await {
        tracing::debug!(code = ?err.code, "command failed");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
    Ok(())
}
