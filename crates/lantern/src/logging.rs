//! Logging setup and configuration for the Lantern world server.
//!
//! Configures structured logging with tracing, supporting both
//! human-readable and JSON output formats.

use crate::config::LoggingSettings;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Sets up the logging system based on configuration.
pub fn setup_logging(settings: &LoggingSettings) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if settings.json_format {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_ansi(true),
            )
            .init();
    }

    info!("🔧 Logging initialized with level: {}", settings.level);
    Ok(())
}

/// Displays the server startup banner.
pub fn display_banner() {
    info!("╔══════════════════════════════════════════╗");
    info!("║            🏮 LANTERN SERVER              ║");
    info!("║       Text-Based Multi-Player World       ║");
    info!("║                                           ║");
    info!("║   Rooms, players, items, and scrapbots    ║");
    info!("╚══════════════════════════════════════════╝");
}
