//! Main application lifecycle for the Lantern world server.
//!
//! Wires the configuration, the store, the telnet multiplexer, and the
//! engine together, then supervises them until a shutdown signal arrives.

use crate::cli::CliArgs;
use crate::config::AppConfig;
use crate::logging::display_banner;
use crate::signals::{setup_signal_handlers, setup_signal_handlers_silent};
use mud_engine::{Engine, ShutdownState};
use mud_store::{demo_world, MemoryStore, Sha2Hasher, WorldSeed};
use mud_telnet::TelnetMux;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Main application that coordinates the server lifecycle.
pub struct Application {
    config: AppConfig,
    engine: Engine,
    mux: Arc<TelnetMux>,
}

impl Application {
    /// Creates a new application instance with the given CLI arguments.
    pub async fn new(args: CliArgs) -> anyhow::Result<Self> {
        info!("🏮 Initializing Lantern World Server...");

        let mut config = AppConfig::load_from_file(&args.config_path)
            .await
            .unwrap_or_else(|e| {
                warn!("Failed to load config file: {}. Using defaults.", e);
                AppConfig::default()
            });

        // CLI overrides take precedence over the config file.
        if let Some(bind_address) = args.bind_address {
            config.server.bind_address = bind_address;
        }
        if let Some(data_file) = args.data_file {
            config.store.data_file = data_file.display().to_string();
        }
        if let Some(world_file) = args.world_file {
            config.store.world_file = Some(world_file.display().to_string());
        }
        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }
        if args.json_logs {
            config.logging.json_format = true;
        }

        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Configuration validation failed: {}", e))?;

        display_banner();

        let seed = load_world_seed(config.store.world_file.as_deref()).await?;
        info!("🗺️  World loaded: {} rooms", seed.rooms.len());

        let store = Arc::new(
            MemoryStore::open(seed, Some(PathBuf::from(&config.store.data_file))).await?,
        );
        let hasher = Arc::new(Sha2Hasher);

        let mux = Arc::new(
            TelnetMux::bind(&config.server.bind_address, config.server.max_connections).await?,
        );

        let engine_config = config
            .to_engine_config()
            .map_err(|e| anyhow::anyhow!("Configuration validation failed: {}", e))?;
        let engine = Engine::new(engine_config, store, hasher, mux.clone()).await?;

        info!("✅ Server initialized successfully");
        info!("📡 Listening on: {}", mux.local_addr());
        info!("💾 Player data: {}", config.store.data_file);

        Ok(Self {
            config,
            engine,
            mux,
        })
    }

    /// Runs the server until a shutdown signal arrives.
    pub async fn run(self) -> anyhow::Result<()> {
        info!("🚀 Starting Lantern World Server...");
        info!("   Bind address: {}", self.config.server.bind_address);
        info!(
            "   Max connections: {}",
            self.config.server.max_connections
        );
        info!(
            "   Tick interval: {}ms",
            self.config.server.tick_interval_ms
        );

        let shutdown_state = ShutdownState::new();

        let mut engine = self.engine;
        let engine_shutdown = shutdown_state.clone();
        let engine_handle = tokio::spawn(async move {
            engine.run(engine_shutdown).await;
        });

        // Periodic status logging while the server runs.
        let status_mux = self.mux.clone();
        let status_shutdown = shutdown_state.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            interval.tick().await;
            while !status_shutdown.is_shutdown_initiated() {
                interval.tick().await;
                info!("📊 Status: {} open connections", status_mux.connection_count());
            }
        });

        info!("✅ Server is ready and accepting connections");
        info!("   Press Ctrl+C to initiate graceful shutdown");

        setup_signal_handlers(shutdown_state.clone()).await?;

        // A second signal during shutdown means the operator wants out now.
        tokio::spawn(async move {
            if setup_signal_handlers_silent().await.is_ok() {
                warn!("🛑 Second signal received, terminating immediately");
                std::process::exit(1);
            }
        });

        info!("🛑 Waiting for the dispatch loop to finish its tick...");
        match tokio::time::timeout(Duration::from_secs(10), engine_handle).await {
            Ok(Ok(())) if shutdown_state.is_shutdown_complete() => {
                info!("✅ Dispatch loop stopped cleanly");
            }
            Ok(Ok(())) => warn!("Dispatch loop exited without draining"),
            Ok(Err(e)) => error!("Dispatch loop task failed: {}", e),
            Err(_) => warn!("⏰ Dispatch loop did not stop within 10s"),
        }

        info!("👋 Thank you for using Lantern World Server!");
        Ok(())
    }
}

/// Loads the world seed from a JSON file, or the built-in demo world when no
/// file is configured.
async fn load_world_seed(path: Option<&str>) -> anyhow::Result<WorldSeed> {
    match path {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path).await?;
            let seed: WorldSeed = serde_json::from_str(&raw)?;
            Ok(seed)
        }
        None => {
            info!("No world file configured, using the built-in demo world");
            Ok(demo_world())
        }
    }
}
