use std::path::PathBuf;

use harvestline::{load_config, logging, HarvestlineError, Orchestrator};
use tokio::sync::{broadcast, mpsc};

const DEFAULT_CONFIG_PATH: &str = "harvestline.json";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("harvestline: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), HarvestlineError> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = load_config(&config_path)?;
    logging::init_logging(&config.logging)?;

    log::info!("Starting harvestline v{}", env!("CARGO_PKG_VERSION"));

    let orchestrator = Orchestrator::from_config(&config)?;
    let session = orchestrator.start_session().await?;
    log::info!("Using remote session {}", session.session_id);

    let (stop_tx, mut stop_rx) = mpsc::unbounded_channel();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .map_err(|e| HarvestlineError::Signal(e.to_string()))?;

    let scheduler = orchestrator.scheduler();
    let (trigger_tx, trigger_rx) = broadcast::channel(16);
    let poller = scheduler.start(trigger_rx);
    // First cycle right away
    let _ = trigger_tx.send(());

    stop_rx.recv().await;
    log::info!("Shutting down");

    scheduler.stop();
    let _ = trigger_tx.send(());
    if let Err(e) = poller.await {
        log::error!("Poll loop panicked: {}", e);
    }

    orchestrator.stop_session().await?;
    Ok(())
}
