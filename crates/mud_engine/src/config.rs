//! Engine configuration.

use crate::world::RoomId;
use serde::{Deserialize, Serialize};

/// What to do when an exit points at a room that was never loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitPolicy {
    /// Redirect the traveler to the first loaded room and log a warning.
    Fallback,
    /// Refuse the move and leave the traveler where they are.
    Strict,
}

/// Tunable engine behavior, normally populated from the binary's config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Room new players start in.
    #[serde(default = "default_starting_room")]
    pub starting_room: RoomId,
    /// Dispatch loop cadence in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Handling of exits with unknown destinations.
    #[serde(default = "default_exit_policy")]
    pub exit_policy: ExitPolicy,
    /// Minimum password length for newly created players.
    #[serde(default = "default_min_password_len")]
    pub min_password_len: usize,
    /// Extra characters allowed in player names besides alphanumerics.
    #[serde(default)]
    pub name_punctuation: String,
    /// Message-of-the-day lines sent when a connection is established.
    #[serde(default)]
    pub motd: Vec<String>,
}

fn default_starting_room() -> RoomId {
    1
}

fn default_tick_interval_ms() -> u64 {
    200
}

fn default_exit_policy() -> ExitPolicy {
    ExitPolicy::Fallback
}

fn default_min_password_len() -> usize {
    8
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            starting_room: default_starting_room(),
            tick_interval_ms: default_tick_interval_ms(),
            exit_policy: default_exit_policy(),
            min_password_len: default_min_password_len(),
            name_punctuation: String::new(),
            motd: Vec::new(),
        }
    }
}
