//! GalacticCIC collector daemon
//!
//! Runs independently of the dashboard, collecting metrics on a tiered
//! schedule and writing to the shared SQLite store. Designed to live under
//! a systemd user service; `gcic install` emits the unit.

use anyhow::Result;
use gcic_core::constants;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod daemon;

use daemon::Daemon;

#[tokio::main]
async fn main() -> Result<()> {
    let home = constants::gcic_home();
    if !home.exists() {
        std::fs::create_dir_all(&home)?;
    }

    // Log to stdout (journal) and to collector.log for `gcic logs`.
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(constants::log_path())?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gcicd=info,gcic_collect=info,gcic_db=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(log_file)),
        )
        .init();

    let daemon = Daemon::new().await?;
    let shutdown = daemon.shutdown_handle();

    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
            _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
        }
        let _ = shutdown.send(());
    });

    daemon.run().await?;
    Ok(())
}
