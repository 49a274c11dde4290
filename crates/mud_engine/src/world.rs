//! The static world model: rooms, exits, placed objects, NPCs, and item
//! templates.
//!
//! Room definitions are immutable after load; only the per-room occupancy
//! lists (objects and NPCs) change at runtime. Items carried by players are
//! value copies of their templates, so two players can hold "a rusty sword"
//! without sharing instance identity.

use crate::config::ExitPolicy;
use crate::error::EngineError;
use crate::store::PlayerStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

pub type RoomId = u32;
pub type ItemId = u32;
pub type NpcId = u32;

/// A one-way link between rooms, optionally gated by a carried item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exit {
    pub name: String,
    pub to_room: RoomId,
    /// Item the traveler must carry to pass. Zero means ungated.
    #[serde(default)]
    pub item_key: ItemId,
    /// Line shown when the traveler lacks the key.
    #[serde(default)]
    pub fail_key: String,
}

/// An item template. Carried items are copies of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDef {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub invulnerable: bool,
    /// At most one copy may be carried at a time.
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub is_armor: bool,
    #[serde(default)]
    pub is_weapon: bool,
    #[serde(default)]
    pub power: i32,
    #[serde(default)]
    pub base_value: i32,
    /// Cannot be dropped once picked up.
    #[serde(default)]
    pub bound: bool,
}

/// A scenery object placed in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedObject {
    pub id: u32,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub movable: bool,
    /// Line shown when a take attempt is refused.
    #[serde(default)]
    pub fail_take: String,
    /// Line shown when a take succeeds.
    #[serde(default)]
    pub take_success: String,
    /// Item granted by a successful take. Zero grants nothing.
    #[serde(default)]
    pub grants: ItemId,
}

/// An NPC standing in a room. `code` selects its interaction handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcInstance {
    pub id: NpcId,
    pub name: String,
    pub description: String,
    pub code: u32,
    #[serde(default)]
    pub arg: String,
}

/// A room definition as loaded from the store, before occupancy is attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDef {
    pub id: RoomId,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub exits: Vec<Exit>,
}

/// A loaded room with its current occupancy.
#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub description: String,
    pub exits: Vec<Exit>,
    pub objects: Vec<PlacedObject>,
    pub npcs: Vec<NpcInstance>,
}

/// The loaded world.
#[derive(Debug)]
pub struct World {
    rooms: HashMap<RoomId, Room>,
    /// First room in load order, used by [`ExitPolicy::Fallback`].
    first_room: RoomId,
    policy: ExitPolicy,
}

impl World {
    /// Loads every room, then each room's objects and NPCs, from the store.
    pub async fn load(store: &dyn PlayerStore, policy: ExitPolicy) -> Result<Self, EngineError> {
        let defs = store.load_rooms().await?;
        if defs.is_empty() {
            return Err(EngineError::World("no rooms defined".to_string()));
        }
        let first_room = defs[0].id;
        let mut rooms = HashMap::with_capacity(defs.len());
        for def in defs {
            let objects = store.load_room_items(def.id).await?;
            let npcs = store.load_room_npcs(def.id).await?;
            rooms.insert(
                def.id,
                Room {
                    id: def.id,
                    name: def.name,
                    description: def.description,
                    exits: def.exits,
                    objects,
                    npcs,
                },
            );
        }
        info!("🗺️  World loaded: {} rooms", rooms.len());
        Ok(Self {
            rooms,
            first_room,
            policy,
        })
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    pub fn room_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(&id)
    }

    pub fn first_room(&self) -> RoomId {
        self.first_room
    }

    /// Applies the configured exit policy to a destination room id.
    ///
    /// Returns the room to actually move to, or `None` when the move must be
    /// refused (strict policy and the destination was never loaded).
    pub fn resolve_destination(&self, dest: RoomId) -> Option<RoomId> {
        if self.rooms.contains_key(&dest) {
            return Some(dest);
        }
        match self.policy {
            ExitPolicy::Fallback => {
                warn!(
                    "Exit points at unknown room {}, falling back to room {}",
                    dest, self.first_room
                );
                Some(self.first_room)
            }
            ExitPolicy::Strict => None,
        }
    }
}
