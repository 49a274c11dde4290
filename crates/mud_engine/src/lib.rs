//! Core engine for a text-based multi-player world server.
//!
//! The engine owns the world model, the live session registry, and the NPC
//! handler registry, and drives everything from a single sequential dispatch
//! loop. It talks to the outside world exclusively through two traits: a
//! [`mux::ConnectionMux`] that owns the transport and a [`store::PlayerStore`]
//! that owns durable state. Swap either without touching game logic.
//!
//! Messages leave the engine as structured styled text
//! ([`message::OutboundText`]); rendering to a concrete wire format is the
//! multiplexer's job.

pub mod broadcast;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod message;
pub mod mux;
pub mod npc;
pub mod session;
pub mod shutdown;
pub mod store;
pub mod world;

pub use config::{EngineConfig, ExitPolicy};
pub use dispatch::Engine;
pub use error::{EngineError, StoreError};
pub use message::{LineEnding, OutboundText, Segment, Style};
pub use mux::{ConnId, ConnectionMux, InboundCommand, MuxEvents};
pub use shutdown::ShutdownState;
pub use store::{PasswordHasher, PlayerDbId, PlayerRecord, PlayerStore};
