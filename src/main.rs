use anyhow::anyhow;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use timeline_scraper::config::{ConfigManager, FileConfigManager};
use timeline_scraper::{run_until_shutdown, ChromeEngine, JsonFileStore};

#[tokio::main]
async fn main() {
    init_tracing();

    let exit_code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            error!("Fatal error: {:#}", e);
            1
        }
    };

    std::process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,chromiumoxide=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = FileConfigManager::new(config_path)
        .load_config()
        .await
        .map_err(|e| anyhow!("Failed to load configuration: {}", e))?;

    info!("Starting timeline scraper");

    // listen before launching so an interrupt mid-launch still reaches cleanup
    let shutdown_rx = spawn_interrupt_listener();

    let engine = ChromeEngine::launch(&config.browser)
        .await
        .map_err(|e| anyhow!("Failed to initialize browser: {}", e))?;
    let store = JsonFileStore::new(config.data_path.clone());

    // a failed close on the way out is not worth a non-zero exit
    if let Err(e) = run_until_shutdown(engine, store, &config, shutdown_rx).await {
        warn!("Error during cleanup: {}", e);
    }

    info!("Timeline scraper stopped");
    Ok(())
}

fn spawn_interrupt_listener() -> watch::Receiver<bool> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutting down...");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => error!("Failed to listen for interrupt signal: {}", e),
        }
    });
    shutdown_rx
}
