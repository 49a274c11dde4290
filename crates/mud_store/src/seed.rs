//! World seed data: the static rooms, objects, NPCs, and item templates a
//! store serves to the engine.
//!
//! A seed is plain JSON so operators can write their own world file; the
//! built-in [`demo_world`] is used when none is configured.

use mud_engine::world::{Exit, ItemDef, NpcInstance, PlacedObject, RoomDef, RoomId};
use serde::{Deserialize, Serialize};

/// One room plus everything placed in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSeed {
    pub id: RoomId,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub exits: Vec<Exit>,
    #[serde(default)]
    pub objects: Vec<PlacedObject>,
    #[serde(default)]
    pub npcs: Vec<NpcInstance>,
}

/// A complete static world.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldSeed {
    pub rooms: Vec<RoomSeed>,
    pub items: Vec<ItemDef>,
}

impl WorldSeed {
    pub fn room_defs(&self) -> Vec<RoomDef> {
        self.rooms
            .iter()
            .map(|room| RoomDef {
                id: room.id,
                name: room.name.clone(),
                description: room.description.clone(),
                exits: room.exits.clone(),
            })
            .collect()
    }
}

/// Item ids used by the demo world.
pub mod demo_items {
    pub const SWORD: u32 = 1;
    pub const LEATHERS: u32 = 2;
    pub const CELLAR_KEY: u32 = 3;
    pub const OLD_BOOT: u32 = 4;
}

/// A small built-in world: a tavern, a square with a scrapbot, and a locked
/// cellar.
pub fn demo_world() -> WorldSeed {
    use demo_items::*;

    let items = vec![
        ItemDef {
            id: SWORD,
            name: "sword".to_string(),
            description: "A notched but serviceable short sword.".to_string(),
            invulnerable: false,
            unique: false,
            is_armor: false,
            is_weapon: true,
            power: 5,
            base_value: 50,
            bound: false,
        },
        ItemDef {
            id: LEATHERS,
            name: "leathers".to_string(),
            description: "Stiff leather armor that smells of the road.".to_string(),
            invulnerable: false,
            unique: false,
            is_armor: true,
            is_weapon: false,
            power: 3,
            base_value: 30,
            bound: false,
        },
        ItemDef {
            id: CELLAR_KEY,
            name: "cellar key".to_string(),
            description: "A heavy iron key on a leather thong.".to_string(),
            invulnerable: true,
            unique: true,
            is_armor: false,
            is_weapon: false,
            power: 0,
            base_value: 0,
            bound: true,
        },
        ItemDef {
            id: OLD_BOOT,
            name: "old boot".to_string(),
            description: "Someone walked a long way in this.".to_string(),
            invulnerable: false,
            unique: false,
            is_armor: false,
            is_weapon: false,
            power: 0,
            base_value: 12,
            bound: false,
        },
    ];

    let rooms = vec![
        RoomSeed {
            id: 1,
            name: "Tavern".to_string(),
            description: "You're in a cozy tavern warmed by an open fire.".to_string(),
            exits: vec![Exit {
                name: "outside".to_string(),
                to_room: 2,
                item_key: 0,
                fail_key: String::new(),
            }],
            objects: vec![
                PlacedObject {
                    id: 1,
                    name: "fireplace".to_string(),
                    description: "You see a roaring, glowing fire.".to_string(),
                    movable: false,
                    fail_take: "That would burn you to a crisp!".to_string(),
                    take_success: String::new(),
                    grants: 0,
                },
                PlacedObject {
                    id: 2,
                    name: "rack".to_string(),
                    description: "A rack of spare arms kept for rowdy nights.".to_string(),
                    movable: true,
                    fail_take: "The innkeeper glares at you.".to_string(),
                    take_success: "You lift a sword from the rack.".to_string(),
                    grants: SWORD,
                },
                PlacedObject {
                    id: 3,
                    name: "chest".to_string(),
                    description: "A battered chest behind the bar.".to_string(),
                    movable: true,
                    fail_take: "You already have the cellar key.".to_string(),
                    take_success: "You fish the cellar key out of the chest.".to_string(),
                    grants: CELLAR_KEY,
                },
            ],
            npcs: Vec::new(),
        },
        RoomSeed {
            id: 2,
            name: "Town Square".to_string(),
            description: "You're standing in the town square, cobbles underfoot.".to_string(),
            exits: vec![
                Exit {
                    name: "inside".to_string(),
                    to_room: 1,
                    item_key: 0,
                    fail_key: String::new(),
                },
                Exit {
                    name: "cellar".to_string(),
                    to_room: 3,
                    item_key: CELLAR_KEY,
                    fail_key: "The cellar door is locked tight.".to_string(),
                },
            ],
            objects: vec![PlacedObject {
                id: 4,
                name: "midden".to_string(),
                description: "A heap of things the town no longer wanted.".to_string(),
                movable: true,
                fail_take: "You root around and find nothing else.".to_string(),
                take_success: "You pull an old boot from the midden.".to_string(),
                grants: OLD_BOOT,
            }],
            npcs: vec![NpcInstance {
                id: 1,
                name: "scrapbot".to_string(),
                description: "A dented robot with a coin slot where its mouth should be."
                    .to_string(),
                code: 1,
                arg: String::new(),
            }],
        },
        RoomSeed {
            id: 3,
            name: "Cellar".to_string(),
            description: "Barrels line the walls of this cool stone cellar.".to_string(),
            exits: vec![Exit {
                name: "up".to_string(),
                to_room: 2,
                item_key: 0,
                fail_key: String::new(),
            }],
            objects: vec![PlacedObject {
                id: 5,
                name: "barrel".to_string(),
                description: "Stamped with a brewer's mark you don't recognize.".to_string(),
                movable: true,
                fail_take: "There are leathers in only one barrel.".to_string(),
                take_success: "You find traveling leathers stuffed in a barrel.".to_string(),
                grants: LEATHERS,
            }],
            npcs: Vec::new(),
        },
    ];

    WorldSeed { rooms, items }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_world_is_internally_consistent() {
        let seed = demo_world();
        let item_ids: Vec<u32> = seed.items.iter().map(|item| item.id).collect();
        let room_ids: Vec<RoomId> = seed.rooms.iter().map(|room| room.id).collect();

        for room in &seed.rooms {
            for exit in &room.exits {
                assert!(room_ids.contains(&exit.to_room), "dangling exit in {}", room.name);
                if exit.item_key != 0 {
                    assert!(item_ids.contains(&exit.item_key));
                }
            }
            for object in &room.objects {
                if object.grants != 0 {
                    assert!(item_ids.contains(&object.grants));
                }
            }
        }
    }

    #[test]
    fn seed_round_trips_through_json() {
        let seed = demo_world();
        let json = serde_json::to_string(&seed).unwrap();
        let back: WorldSeed = serde_json::from_str(&json).unwrap();
        assert_eq!(back.rooms.len(), seed.rooms.len());
        assert_eq!(back.items.len(), seed.items.len());
    }
}
