use clap::Parser;
use dotenv::dotenv;
use keeper_updater::{Config, UpdateOrchestrator, logging};
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::parse();
    logging::init(&config)?;

    info!(
        interval_hours = config.update_interval,
        channel = %config.channel(),
        server_path = %config.server_path.display(),
        "Keeper starting"
    );

    // --- Shutdown channel ---
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(());
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown requested; finishing current step");
        let _ = shutdown_tx.send(());
    });

    let orchestrator = UpdateOrchestrator::from_config(&config, shutdown_rx)?;
    orchestrator.run().await;

    // The server runs detached and is left alone on exit.
    info!("Keeper stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
