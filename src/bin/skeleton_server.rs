//!
//! skeleton server binary
//! ----------------------
//! Command-line entry point for the skeleton HTTP server. Supports configuration
//! via CLI flags and environment variables (see `--help`).

use anyhow::Result;
use std::env;

use skeleton::config::{has_flag, ServerConfig, USAGE};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("{USAGE}");
        return Ok(());
    }

    // Initialize tracing subscriber with env filter if provided
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))?;
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let config = ServerConfig::from_env_and_args(&args)?;
    let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    tracing::info!(
        target: "startup",
        "skeleton starting: RUST_LOG='{}', bind={}, http_port={}, users_file={:?}",
        rust_log, config.bind_addr, config.http_port, config.users_file
    );

    skeleton::server::run(config).await
}
