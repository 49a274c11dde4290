//! Persistence for the world server: an in-memory [`PlayerStore`]
//! implementation with JSON snapshots, the world-seed data format, and a
//! salted-SHA-256 password hasher.
//!
//! [`PlayerStore`]: mud_engine::store::PlayerStore

pub mod hasher;
pub mod memory;
pub mod seed;

pub use hasher::Sha2Hasher;
pub use memory::MemoryStore;
pub use seed::{demo_world, RoomSeed, WorldSeed};
