//! Signal handling for graceful server shutdown.
//!
//! Listens for SIGINT and SIGTERM (Ctrl+C on Windows) and flips the shared
//! shutdown state so the dispatch loop can exit cleanly.

use mud_engine::ShutdownState;
use tracing::info;

/// Waits for a shutdown signal and initiates shutdown when one arrives.
pub async fn setup_signal_handlers(shutdown_state: ShutdownState) -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => {
                info!("🛑 Received SIGINT, initiating graceful shutdown...");
            }
            _ = sigterm.recv() => {
                info!("🛑 Received SIGTERM, initiating graceful shutdown...");
            }
        }
    }

    #[cfg(windows)]
    {
        tokio::signal::ctrl_c().await?;
        info!("🛑 Received Ctrl+C, initiating graceful shutdown...");
    }

    shutdown_state.initiate_shutdown();
    Ok(())
}

/// Waits for a second shutdown signal without logging or touching state.
/// Used to detect an impatient operator during graceful shutdown.
pub async fn setup_signal_handlers_silent() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(windows)]
    {
        tokio::signal::ctrl_c().await?;
    }

    Ok(())
}
