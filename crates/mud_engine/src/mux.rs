//! The connection multiplexer seam.
//!
//! The engine never touches sockets. A [`ConnectionMux`] implementation owns
//! the transport and hands the engine batches of events each tick; the engine
//! pushes styled text and control calls back through the same trait. The
//! telnet implementation lives in the `mud_telnet` crate; tests drive the
//! engine with an in-memory fake.

use crate::message::OutboundText;
use async_trait::async_trait;

/// Multiplexer-assigned connection identifier, unique for the process lifetime.
pub type ConnId = usize;

/// One parsed player command: the verb as typed plus the untouched remainder.
///
/// Verbs are case-sensitive; `SAY` is not `say`. `line` is the trimmed input
/// as typed, which login uses for names and passwords.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundCommand {
    pub conn: ConnId,
    pub verb: String,
    pub arg: String,
    pub line: String,
}

impl InboundCommand {
    /// Parses a raw input line for a connection.
    pub fn parse(conn: ConnId, line: &str) -> Self {
        let trimmed = line.trim();
        let (verb, arg) = split_command(trimmed);
        Self {
            conn,
            verb,
            arg,
            line: trimmed.to_string(),
        }
    }
}

/// Everything that happened on the transport since the previous poll.
///
/// The engine applies these strictly in order: connects, then disconnects,
/// then commands. Within each list, arrival order is preserved.
#[derive(Debug, Default)]
pub struct MuxEvents {
    pub connected: Vec<ConnId>,
    pub disconnected: Vec<ConnId>,
    pub commands: Vec<InboundCommand>,
}

impl MuxEvents {
    pub fn is_empty(&self) -> bool {
        self.connected.is_empty() && self.disconnected.is_empty() && self.commands.is_empty()
    }
}

/// Transport abstraction the engine runs against.
///
/// Contract:
/// - `send` preserves per-connection FIFO ordering.
/// - `disconnect` eventually produces exactly one `disconnected` event for
///   the connection in a later poll, even when the peer is already gone.
/// - Calls for unknown or already-closed connections are silently ignored.
#[async_trait]
pub trait ConnectionMux: Send + Sync {
    /// Drains pending transport events.
    async fn poll(&self) -> MuxEvents;

    /// Queues a styled message for a connection.
    async fn send(&self, conn: ConnId, text: OutboundText);

    /// Asks the transport to close a connection.
    async fn disconnect(&self, conn: ConnId);

    /// Marks a connection as belonging to a logged-in player. Before this
    /// call the transport suppresses styling (login prompts stay plain).
    async fn set_authenticated(&self, conn: ConnId);

    /// Flips the connection's color rendering.
    async fn toggle_color(&self, conn: ConnId);
}

/// Splits one input line into a verb and its argument remainder. The verb's
/// case is preserved; dispatch matches it exactly.
///
/// Leading whitespace is ignored; the argument keeps its internal spacing but
/// is trimmed at both ends.
pub fn split_command(line: &str) -> (String, String) {
    let trimmed = line.trim();
    match trimmed.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb.to_string(), rest.trim().to_string()),
        None => (trimmed.to_string(), String::new()),
    }
}
