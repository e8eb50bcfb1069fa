//! Vigie console - terminal front-end of the predictive-maintenance dashboard
//!
//! Drives the `vigie-client` controllers from the command line:
//! - session management (login, logout, register, profile)
//! - equipment, readings, predictions and the polling monitor
//! - alert rules, connectors, maintenance scheduling, uploads, analytics

mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vigie_client::config::{load_config, load_config_file};

use crate::commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // .env optionnel (VIGIE_API_URL, RUST_LOG...)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mut config = match &cli.config {
        Some(path) => {
            let mut cfg = load_config_file(path).await;
            cfg.apply_env(|key| std::env::var(key).ok());
            cfg
        }
        None => load_config().await,
    };
    if let Some(url) = &cli.api_url {
        config.api_url = url.clone();
    }
    tracing::debug!("[console] backend {}", config.api_url);

    commands::run(cli, config).await
}
