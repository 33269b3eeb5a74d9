//! KuCoin ticker stream client - Entry Point

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// KuCoin ticker stream client
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via KC_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    kc_telemetry::init_logging()?;

    info!("Starting kc-bot v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > KC_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("KC_CONFIG").ok())
        .unwrap_or_else(|| kc_bot::config::DEFAULT_CONFIG_PATH.to_string());

    info!(config_path = %config_path, "Loading configuration");
    let config = kc_bot::AppConfig::load(&config_path)?;
    info!(mode = %config.mode, symbols = ?config.symbols, "Configuration loaded");

    let app = kc_bot::Application::new(config)?;
    app.run().await?;

    Ok(())
}
