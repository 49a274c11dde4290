//! The persistence gateway seam.
//!
//! All durable state (player records, the attribute bag, inventory rows, and
//! the static world definition) lives behind [`PlayerStore`]. The engine
//! awaits every store call inline from its single dispatch task, so an
//! implementation never sees concurrent calls for the same player.

use crate::error::StoreError;
use crate::world::{ItemDef, ItemId, NpcInstance, PlacedObject, RoomDef, RoomId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Store-assigned durable player identifier.
pub type PlayerDbId = i64;

/// A durable player row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: PlayerDbId,
    pub name: String,
    pub password_hash: String,
    pub last_room: RoomId,
}

/// Durable storage for players and the static world.
#[async_trait]
pub trait PlayerStore: Send + Sync {
    /// Looks up a player row by exact name.
    async fn find_player_by_name(&self, name: &str) -> Result<Option<PlayerRecord>, StoreError>;

    /// Returns true when a player row with this name already exists.
    async fn name_taken(&self, name: &str) -> Result<bool, StoreError>;

    /// Creates a player row and returns its id.
    async fn create_player(
        &self,
        name: &str,
        password_hash: &str,
        room: RoomId,
    ) -> Result<PlayerDbId, StoreError>;

    /// Records the room a player was last in.
    async fn update_last_room(&self, player: PlayerDbId, room: RoomId) -> Result<(), StoreError>;

    /// Reads a per-player attribute, returning `default` when unset.
    async fn get_attribute(
        &self,
        player: PlayerDbId,
        key: &str,
        default: &str,
    ) -> Result<String, StoreError>;

    /// Writes a per-player attribute, replacing any previous value.
    async fn set_attribute(
        &self,
        player: PlayerDbId,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError>;

    /// Appends one inventory row.
    async fn add_inventory(&self, player: PlayerDbId, item: ItemId) -> Result<(), StoreError>;

    /// Removes one matching inventory row. Returns false when none matched.
    async fn remove_inventory(&self, player: PlayerDbId, item: ItemId) -> Result<bool, StoreError>;

    /// Lists a player's inventory rows in insertion order.
    async fn list_inventory(&self, player: PlayerDbId) -> Result<Vec<ItemId>, StoreError>;

    /// Loads an item template.
    async fn load_item_definition(&self, item: ItemId) -> Result<Option<ItemDef>, StoreError>;

    /// Loads all room definitions.
    async fn load_rooms(&self) -> Result<Vec<RoomDef>, StoreError>;

    /// Loads the objects placed in a room.
    async fn load_room_items(&self, room: RoomId) -> Result<Vec<PlacedObject>, StoreError>;

    /// Loads the NPCs placed in a room.
    async fn load_room_npcs(&self, room: RoomId) -> Result<Vec<NpcInstance>, StoreError>;
}

/// Password hashing seam. Synchronous on purpose: hashing happens at most
/// once per login attempt on the dispatch task.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> String;
    fn verify(&self, plaintext: &str, hash: &str) -> bool;
}
