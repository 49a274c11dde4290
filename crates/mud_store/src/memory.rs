//! An in-memory persistence gateway with an optional JSON snapshot file.
//!
//! Player data (records, the attribute bag, inventory rows) is held under a
//! mutex and written through to the snapshot file after every mutation. The
//! static world comes from a [`WorldSeed`] and is never written back.

use crate::seed::WorldSeed;
use async_trait::async_trait;
use mud_engine::error::StoreError;
use mud_engine::store::{PlayerDbId, PlayerRecord, PlayerStore};
use mud_engine::world::{ItemDef, ItemId, NpcInstance, PlacedObject, RoomDef, RoomId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AttributeRow {
    player: PlayerDbId,
    key: String,
    value: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct InventoryRow {
    player: PlayerDbId,
    item: ItemId,
}

/// The durable portion of the store, exactly what the snapshot file holds.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PlayerData {
    next_player_id: PlayerDbId,
    players: Vec<PlayerRecord>,
    attributes: Vec<AttributeRow>,
    inventory: Vec<InventoryRow>,
}

/// In-memory [`PlayerStore`] with JSON write-through.
pub struct MemoryStore {
    data: Mutex<PlayerData>,
    seed: WorldSeed,
    snapshot_path: Option<PathBuf>,
}

impl MemoryStore {
    /// Opens a store over `seed`, restoring player data from the snapshot
    /// file when one exists.
    pub async fn open(
        seed: WorldSeed,
        snapshot_path: Option<PathBuf>,
    ) -> Result<Self, StoreError> {
        let data = match &snapshot_path {
            Some(path) if tokio::fs::try_exists(path).await? => {
                let raw = tokio::fs::read_to_string(path).await?;
                let data: PlayerData = serde_json::from_str(&raw)?;
                info!(
                    "📦 Restored {} players from snapshot {}",
                    data.players.len(),
                    path.display()
                );
                data
            }
            _ => PlayerData::default(),
        };
        Ok(Self {
            data: Mutex::new(data),
            seed,
            snapshot_path,
        })
    }

    /// A store with no snapshot file. Data lives for the process only.
    pub fn ephemeral(seed: WorldSeed) -> Self {
        Self {
            data: Mutex::new(PlayerData::default()),
            seed,
            snapshot_path: None,
        }
    }

    /// Writes the current player data to the snapshot file, if configured.
    /// Serialization happens under the lock; the file write does not.
    async fn persist(&self) -> Result<(), StoreError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let json = {
            let data = self.data.lock().expect("store mutex poisoned");
            serde_json::to_string_pretty(&*data)?
        };
        tokio::fs::write(path, json).await?;
        debug!("Snapshot written to {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl PlayerStore for MemoryStore {
    async fn find_player_by_name(&self, name: &str) -> Result<Option<PlayerRecord>, StoreError> {
        let data = self.data.lock().expect("store mutex poisoned");
        Ok(data.players.iter().find(|rec| rec.name == name).cloned())
    }

    async fn name_taken(&self, name: &str) -> Result<bool, StoreError> {
        let data = self.data.lock().expect("store mutex poisoned");
        Ok(data.players.iter().any(|rec| rec.name == name))
    }

    async fn create_player(
        &self,
        name: &str,
        password_hash: &str,
        room: RoomId,
    ) -> Result<PlayerDbId, StoreError> {
        let id = {
            let mut data = self.data.lock().expect("store mutex poisoned");
            if data.players.iter().any(|rec| rec.name == name) {
                return Err(StoreError::Duplicate(format!("player name '{}'", name)));
            }
            data.next_player_id += 1;
            let id = data.next_player_id;
            data.players.push(PlayerRecord {
                id,
                name: name.to_string(),
                password_hash: password_hash.to_string(),
                last_room: room,
            });
            id
        };
        self.persist().await?;
        Ok(id)
    }

    async fn update_last_room(&self, player: PlayerDbId, room: RoomId) -> Result<(), StoreError> {
        {
            let mut data = self.data.lock().expect("store mutex poisoned");
            let rec = data
                .players
                .iter_mut()
                .find(|rec| rec.id == player)
                .ok_or_else(|| StoreError::MissingRecord(format!("player {}", player)))?;
            rec.last_room = room;
        }
        self.persist().await
    }

    async fn get_attribute(
        &self,
        player: PlayerDbId,
        key: &str,
        default: &str,
    ) -> Result<String, StoreError> {
        let data = self.data.lock().expect("store mutex poisoned");
        Ok(data
            .attributes
            .iter()
            .find(|row| row.player == player && row.key == key)
            .map(|row| row.value.clone())
            .unwrap_or_else(|| default.to_string()))
    }

    async fn set_attribute(
        &self,
        player: PlayerDbId,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        {
            let mut data = self.data.lock().expect("store mutex poisoned");
            match data
                .attributes
                .iter_mut()
                .find(|row| row.player == player && row.key == key)
            {
                Some(row) => row.value = value.to_string(),
                None => data.attributes.push(AttributeRow {
                    player,
                    key: key.to_string(),
                    value: value.to_string(),
                }),
            }
        }
        self.persist().await
    }

    async fn add_inventory(&self, player: PlayerDbId, item: ItemId) -> Result<(), StoreError> {
        {
            let mut data = self.data.lock().expect("store mutex poisoned");
            data.inventory.push(InventoryRow { player, item });
        }
        self.persist().await
    }

    async fn remove_inventory(&self, player: PlayerDbId, item: ItemId) -> Result<bool, StoreError> {
        let removed = {
            let mut data = self.data.lock().expect("store mutex poisoned");
            match data
                .inventory
                .iter()
                .position(|row| row.player == player && row.item == item)
            {
                Some(pos) => {
                    data.inventory.remove(pos);
                    true
                }
                None => false,
            }
        };
        if removed {
            self.persist().await?;
        }
        Ok(removed)
    }

    async fn list_inventory(&self, player: PlayerDbId) -> Result<Vec<ItemId>, StoreError> {
        let data = self.data.lock().expect("store mutex poisoned");
        Ok(data
            .inventory
            .iter()
            .filter(|row| row.player == player)
            .map(|row| row.item)
            .collect())
    }

    async fn load_item_definition(&self, item: ItemId) -> Result<Option<ItemDef>, StoreError> {
        Ok(self.seed.items.iter().find(|def| def.id == item).cloned())
    }

    async fn load_rooms(&self) -> Result<Vec<RoomDef>, StoreError> {
        Ok(self.seed.room_defs())
    }

    async fn load_room_items(&self, room: RoomId) -> Result<Vec<PlacedObject>, StoreError> {
        Ok(self
            .seed
            .rooms
            .iter()
            .find(|r| r.id == room)
            .map(|r| r.objects.clone())
            .unwrap_or_default())
    }

    async fn load_room_npcs(&self, room: RoomId) -> Result<Vec<NpcInstance>, StoreError> {
        Ok(self
            .seed
            .rooms
            .iter()
            .find(|r| r.id == room)
            .map(|r| r.npcs.clone())
            .unwrap_or_default())
    }
}
