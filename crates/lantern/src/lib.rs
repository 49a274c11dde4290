//! Lantern - a text-based multi-player world server.
//!
//! Players telnet in, claim a name, and wander a world of rooms, items, and
//! NPCs. This crate is the binary shell: CLI, configuration, logging,
//! signals, and the application lifecycle around the engine.

pub mod app;
pub mod cli;
pub mod config;
pub mod logging;
pub mod signals;

use app::Application;
use cli::CliArgs;
use config::AppConfig;
use tracing::error;

/// Initializes and runs the Lantern world server.
pub async fn init() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // Logging has to come up before the application, so the logging settings
    // are resolved here first. Application::new applies the full override set
    // again when it builds its own config.
    let mut config = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default();
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.json_format = true;
    }
    logging::setup_logging(&config.logging)?;

    let app = match Application::new(args).await {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = app.run().await {
        error!("Application error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
