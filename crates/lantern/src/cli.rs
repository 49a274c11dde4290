//! Command-line interface handling for the Lantern world server.
//!
//! Argument parsing is done with `clap`; every option here overrides the
//! corresponding setting from the configuration file.

use clap::{Arg, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for the bind address
    pub bind_address: Option<String>,
    /// Optional override for the player data snapshot file
    pub data_file: Option<PathBuf>,
    /// Optional override for the world seed file
    pub world_file: Option<PathBuf>,
    /// Optional override for the log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
}

impl CliArgs {
    /// Parses command line arguments using clap.
    ///
    /// All options have defaults or are optional, so parsing never requires
    /// user input to succeed.
    pub fn parse() -> Self {
        let matches = Command::new("Lantern World Server")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Text-based multi-player world server")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path")
                    .default_value("config.toml"),
            )
            .arg(
                Arg::new("bind")
                    .short('b')
                    .long("bind")
                    .value_name("ADDRESS")
                    .help("Bind address (e.g., 127.0.0.1:2323)"),
            )
            .arg(
                Arg::new("data")
                    .short('d')
                    .long("data")
                    .value_name("FILE")
                    .help("Player data snapshot file"),
            )
            .arg(
                Arg::new("world")
                    .short('w')
                    .long("world")
                    .value_name("FILE")
                    .help("World seed JSON file (built-in demo world when omitted)"),
            )
            .arg(
                Arg::new("log-level")
                    .short('l')
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("Log level (trace, debug, info, warn, error)"),
            )
            .arg(
                Arg::new("json-logs")
                    .long("json-logs")
                    .help("Output logs in JSON format")
                    .action(clap::ArgAction::SetTrue),
            )
            .get_matches();

        Self {
            config_path: PathBuf::from(
                matches
                    .get_one::<String>("config")
                    .expect("Default config path should always be set"),
            ),
            bind_address: matches.get_one::<String>("bind").cloned(),
            data_file: matches.get_one::<String>("data").map(PathBuf::from),
            world_file: matches.get_one::<String>("world").map(PathBuf::from),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
        }
    }
}
