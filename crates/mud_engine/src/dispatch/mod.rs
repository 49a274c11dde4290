//! The engine: a single sequential dispatch loop over mux events.
//!
//! One task owns the world, the session registry, and the NPC registry.
//! Every tick it drains the multiplexer and applies events strictly in
//! order: connects, then disconnects, then commands. Store calls are awaited
//! inline, so a durable write always completes before any in-memory state
//! derived from it becomes visible to later commands.

mod freeroam;
mod login;

#[cfg(test)]
mod tests;

use crate::broadcast::{self, Audience};
use crate::config::EngineConfig;
use crate::error::{EngineError, StoreError};
use crate::message::{OutboundText, Style};
use crate::mux::{ConnId, ConnectionMux, InboundCommand};
use crate::npc::NpcRegistry;
use crate::session::{Phase, Session, SessionRegistry};
use crate::shutdown::ShutdownState;
use crate::store::{PasswordHasher, PlayerStore};
use crate::world::World;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// The world server engine.
pub struct Engine {
    config: EngineConfig,
    world: World,
    sessions: SessionRegistry,
    npcs: NpcRegistry,
    store: Arc<dyn PlayerStore>,
    hasher: Arc<dyn PasswordHasher>,
    mux: Arc<dyn ConnectionMux>,
}

impl Engine {
    /// Loads the world from the store and builds an engine with the default
    /// NPC handlers.
    pub async fn new(
        config: EngineConfig,
        store: Arc<dyn PlayerStore>,
        hasher: Arc<dyn PasswordHasher>,
        mux: Arc<dyn ConnectionMux>,
    ) -> Result<Self, EngineError> {
        Self::with_npcs(config, store, hasher, mux, NpcRegistry::with_defaults()).await
    }

    /// Same as [`Engine::new`] but with a caller-supplied NPC registry.
    pub async fn with_npcs(
        config: EngineConfig,
        store: Arc<dyn PlayerStore>,
        hasher: Arc<dyn PasswordHasher>,
        mux: Arc<dyn ConnectionMux>,
        npcs: NpcRegistry,
    ) -> Result<Self, EngineError> {
        let world = World::load(store.as_ref(), config.exit_policy).await?;
        Ok(Self {
            config,
            world,
            sessions: SessionRegistry::new(),
            npcs,
            store,
            hasher,
            mux,
        })
    }

    /// Runs the dispatch loop until shutdown is initiated.
    pub async fn run(&mut self, shutdown: ShutdownState) {
        info!(
            "🎮 Engine running, tick interval {}ms",
            self.config.tick_interval_ms
        );
        let mut ticker = tokio::time::interval(Duration::from_millis(self.config.tick_interval_ms));
        while !shutdown.is_shutdown_initiated() {
            ticker.tick().await;
            self.tick().await;
        }
        shutdown.complete_shutdown();
    }

    /// Drains one batch of mux events and applies them in order.
    pub async fn tick(&mut self) {
        let events = self.mux.poll().await;
        for conn in events.connected {
            self.on_connected(conn).await;
        }
        for conn in events.disconnected {
            self.on_disconnected(conn).await;
        }
        for command in events.commands {
            self.on_command(command).await;
        }
    }

    /// Live session count. Exposed for the application's status logging.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    async fn on_connected(&mut self, conn: ConnId) {
        self.sessions.insert(conn);
        info!("🔌 Connection {} established", conn);
        for line in self.config.motd.clone() {
            self.mux.send(conn, OutboundText::plain(line)).await;
        }
        self.mux
            .send(
                conn,
                OutboundText::plain("What is your name? (or 'new' for a new player)"),
            )
            .await;
    }

    async fn on_disconnected(&mut self, conn: ConnId) {
        // Removing first makes a late duplicate event a no-op and keeps the
        // departed player out of their own quit broadcast.
        let Some(session) = self.sessions.remove(conn) else {
            return;
        };
        if let Some(name) = session.name {
            info!("👋 {} disconnected (connection {})", name, conn);
            self.broadcast(
                Audience::Global,
                OutboundText::new()
                    .style(Style::Bold)
                    .style(Style::Yellow)
                    .text(format!("{} quit the game", name)),
            )
            .await;
        } else {
            info!("🔌 Connection {} closed before login", conn);
        }
    }

    async fn on_command(&mut self, command: InboundCommand) {
        let Some(session) = self.sessions.get(command.conn) else {
            return;
        };
        let phase = session.phase();
        let result = match phase {
            Phase::Naming => self.handle_naming(&command).await,
            Phase::Authenticating => self.handle_authenticating(&command).await,
            Phase::Interacting => self.handle_interacting(&command).await,
        };
        if let Err(err) = result {
            error!("Store failure while handling '{}': {}", command.verb, err);
            self.mux
                .send(command.conn, OutboundText::plain("Something went wrong"))
                .await;
            if phase == Phase::Interacting {
                self.send_prompt(command.conn).await;
            }
        }
    }

    /// Sends a message to every connection the audience resolves to.
    async fn broadcast(&self, audience: Audience, text: OutboundText) {
        for conn in broadcast::resolve(audience, &self.sessions) {
            self.mux.send(conn, text.clone()).await;
        }
    }

    /// Sends the status prompt for a session's current state.
    async fn send_prompt(&self, conn: ConnId) {
        let Some(session) = self.sessions.get(conn) else {
            return;
        };
        let Some(name) = session.name.as_deref() else {
            return;
        };
        let head = match &session.target {
            Some(npc) => format!("\r\n{} -> {} [", name, npc.name),
            None => format!("\r\n{} [", name),
        };
        let prompt = OutboundText::new()
            .text(head)
            .style(Style::Bold)
            .style(Style::Yellow)
            .text(format!("{} gold", session.gold))
            .style(Style::Reset)
            .text("] [")
            .style(Style::Bold)
            .style(Style::Red)
            .text(format!("{} HP", session.health))
            .style(Style::Reset)
            .text("] :> ")
            .without_newline();
        self.mux.send(conn, prompt).await;
    }

    /// Renders the current room for a session: name, description, then the
    /// players, exits, objects, and NPCs present.
    fn look_lines(&self, session: &Session) -> Vec<OutboundText> {
        let Some(room_id) = session.room else {
            return Vec::new();
        };
        let Some(room) = self.world.room(room_id) else {
            return Vec::new();
        };
        let players = self.sessions.names_in_room(room_id).join(", ");
        let exits = room
            .exits
            .iter()
            .map(|ex| ex.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let objects = room
            .objects
            .iter()
            .map(|obj| obj.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let npcs = room
            .npcs
            .iter()
            .map(|npc| npc.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let labeled = |label: &str, value: String| {
            OutboundText::new()
                .style(Style::Cyan)
                .text(label)
                .style(Style::Reset)
                .text(value)
        };
        vec![
            OutboundText::new()
                .text("\r\n")
                .style(Style::Bold)
                .style(Style::Cyan)
                .text(room.name.clone())
                .text("\r\n"),
            OutboundText::plain(format!("{}\r\n", room.description)),
            labeled("Players: ", players),
            labeled("Exits: ", exits),
            labeled("Objects: ", objects),
            labeled("NPCs: ", npcs),
        ]
    }

    async fn send_look(&self, conn: ConnId) {
        let Some(session) = self.sessions.get(conn) else {
            return;
        };
        for line in self.look_lines(session) {
            self.mux.send(conn, line).await;
        }
    }

    async fn unicast(&self, conn: ConnId, text: OutboundText) {
        self.mux.send(conn, text).await;
    }
}

/// Result type for command handlers. `Err` aborts the command; the loop
/// itself never stops.
pub(crate) type CommandResult = Result<(), StoreError>;
