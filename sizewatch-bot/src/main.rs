//! Sizewatch bot - Main entry point.

use anyhow::Result;
use sizewatch_bot::start_server;
use sizewatch_common::logging::init_logging;
use sizewatch_common::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (env vars override the config file)
    let config = Config::load_with_env()?;

    // Initialize logging
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("Sizewatch bot v{}", env!("CARGO_PKG_VERSION"));

    // Start everything
    start_server(&config).await
}
