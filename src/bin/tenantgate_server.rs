//!
//! tenantgate server binary
//! ------------------------
//! Command-line entry point for the tenantgate HTTP server. Supports
//! configuration via CLI flags and environment variables.

use anyhow::{Context, Result};
use std::env;

use tenantgate::config::{has_flag, ServerConfig, USAGE};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber with env filter, defaulting to info
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    let args: Vec<String> = env::args().collect();

    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("{}", USAGE);
        return Ok(());
    }

    let cfg = ServerConfig::from_env_and_args(&args).context("Invalid server configuration")?;
    println!("tenantgate starting: addr={}, seed={:?}", cfg.socket_addr(), cfg.seed_path);
    tracing::info!("Using addr={} token_ttl={}s", cfg.socket_addr(), cfg.token_ttl.as_secs());
    tenantgate::server::run_with_config(cfg).await
}
