//! Configuration management for the Lantern world server.
//!
//! Handles loading, validation, and conversion of server configuration from
//! TOML files and command-line arguments.

use mud_engine::{EngineConfig, ExitPolicy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

fn default_bind_address() -> String {
    "0.0.0.0:2323".to_string()
}

fn default_max_connections() -> usize {
    256
}

/// Tick interval default, matching the engine's 5 ticks per second.
fn default_tick_interval() -> u64 {
    200
}

fn default_starting_room() -> u32 {
    1
}

fn default_exit_policy() -> String {
    "fallback".to_string()
}

fn default_min_password_len() -> usize {
    8
}

fn default_motd() -> Vec<String> {
    vec![
        "Welcome, traveler.".to_string(),
        "A single lantern burns over the door.".to_string(),
    ]
}

fn default_data_file() -> String {
    "players.json".to_string()
}

/// Application configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Network and loop settings
    pub server: ServerSettings,
    /// Game rule settings
    #[serde(default)]
    pub game: GameSettings,
    /// Persistence settings
    #[serde(default)]
    pub store: StoreSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Server-specific configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Network address to bind the telnet listener to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Maximum number of concurrent client connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Dispatch loop tick interval in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

/// Game rule configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSettings {
    /// Room new players start in
    #[serde(default = "default_starting_room")]
    pub starting_room: u32,
    /// What to do with exits whose destination room does not exist:
    /// "fallback" (reroute to the first room) or "strict" (refuse the move)
    #[serde(default = "default_exit_policy")]
    pub exit_policy: String,
    /// Minimum password length for new players
    #[serde(default = "default_min_password_len")]
    pub min_password_len: usize,
    /// Extra characters allowed in player names besides alphanumerics
    #[serde(default)]
    pub name_punctuation: String,
    /// Message-of-the-day lines shown to new connections
    #[serde(default = "default_motd")]
    pub motd: Vec<String>,
}

/// Persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Player data snapshot file
    #[serde(default = "default_data_file")]
    pub data_file: String,
    /// World seed JSON file. The built-in demo world is used when unset.
    #[serde(default)]
    pub world_file: Option<String>,
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
    /// Optional file path for log output (None means stdout only)
    pub file_path: Option<String>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            starting_room: default_starting_room(),
            exit_policy: default_exit_policy(),
            min_password_len: default_min_password_len(),
            name_punctuation: String::new(),
            motd: default_motd(),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            world_file: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                bind_address: default_bind_address(),
                max_connections: default_max_connections(),
                tick_interval_ms: default_tick_interval(),
            },
            game: GameSettings::default(),
            store: StoreSettings::default(),
            logging: LoggingSettings {
                level: "info".to_string(),
                json_format: false,
                file_path: None,
            },
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at
    /// the specified path and returns the default configuration.
    pub async fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Converts the game settings into an engine configuration.
    pub fn to_engine_config(&self) -> Result<EngineConfig, String> {
        let exit_policy = match self.game.exit_policy.as_str() {
            "fallback" => ExitPolicy::Fallback,
            "strict" => ExitPolicy::Strict,
            other => return Err(format!("Invalid exit policy: {other}")),
        };
        Ok(EngineConfig {
            starting_room: self.game.starting_room,
            tick_interval_ms: self.server.tick_interval_ms,
            exit_policy,
            min_password_len: self.game.min_password_len,
            name_punctuation: self.game.name_punctuation.clone(),
            motd: self.game.motd.clone(),
        })
    }

    /// Validates the configuration for consistency and correctness.
    pub fn validate(&self) -> Result<(), String> {
        if self
            .server
            .bind_address
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(format!(
                "Invalid bind address: {}",
                &self.server.bind_address
            ));
        }

        if self.server.max_connections == 0 {
            return Err("server.max_connections must be greater than 0".to_string());
        }

        if self.server.tick_interval_ms == 0 {
            return Err("server.tick_interval_ms must be greater than 0".to_string());
        }

        if !["fallback", "strict"].contains(&self.game.exit_policy.as_str()) {
            return Err(format!(
                "Invalid exit policy: {}. Must be 'fallback' or 'strict'",
                &self.game.exit_policy
            ));
        }

        if self.game.min_password_len == 0 {
            return Err("game.min_password_len must be greater than 0".to_string());
        }

        if self.store.data_file.is_empty() {
            return Err("store.data_file cannot be empty".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}
