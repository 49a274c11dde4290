//! Engine tests driven through a fake multiplexer and an in-memory store.

use super::*;
use crate::config::{EngineConfig, ExitPolicy};
use crate::error::StoreError;
use crate::message::{LineEnding, OutboundText};
use crate::mux::{ConnId, ConnectionMux, InboundCommand, MuxEvents};
use crate::store::{PasswordHasher, PlayerDbId, PlayerRecord, PlayerStore};
use crate::world::{Exit, ItemDef, NpcInstance, PlacedObject, RoomDef, RoomId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// Fakes

#[derive(Default)]
struct FakeMuxInner {
    connected: Vec<ConnId>,
    disconnected: Vec<ConnId>,
    commands: Vec<InboundCommand>,
    sent: Vec<(ConnId, OutboundText)>,
    dropped: Vec<ConnId>,
    authenticated: Vec<ConnId>,
    color_toggles: Vec<ConnId>,
}

#[derive(Default)]
struct FakeMux {
    inner: Mutex<FakeMuxInner>,
}

impl FakeMux {
    fn connect(&self, conn: ConnId) {
        self.inner.lock().unwrap().connected.push(conn);
    }

    fn drop_conn(&self, conn: ConnId) {
        self.inner.lock().unwrap().disconnected.push(conn);
    }

    fn line(&self, conn: ConnId, line: &str) {
        self.inner
            .lock()
            .unwrap()
            .commands
            .push(InboundCommand::parse(conn, line));
    }

    fn sent_to(&self, conn: ConnId) -> Vec<OutboundText> {
        self.inner
            .lock()
            .unwrap()
            .sent
            .iter()
            .filter(|(c, _)| *c == conn)
            .map(|(_, text)| text.clone())
            .collect()
    }

    fn plain_sent_to(&self, conn: ConnId) -> Vec<String> {
        self.sent_to(conn)
            .iter()
            .map(|text| text.as_plain_text())
            .collect()
    }

    fn received(&self, conn: ConnId, needle: &str) -> bool {
        self.plain_sent_to(conn)
            .iter()
            .any(|line| line.contains(needle))
    }

    fn dropped(&self, conn: ConnId) -> bool {
        self.inner.lock().unwrap().dropped.contains(&conn)
    }

    fn toggle_count(&self, conn: ConnId) -> usize {
        self.inner
            .lock()
            .unwrap()
            .color_toggles
            .iter()
            .filter(|c| **c == conn)
            .count()
    }

    fn clear_sent(&self) {
        self.inner.lock().unwrap().sent.clear();
    }
}

#[async_trait]
impl ConnectionMux for FakeMux {
    async fn poll(&self) -> MuxEvents {
        let mut inner = self.inner.lock().unwrap();
        MuxEvents {
            connected: std::mem::take(&mut inner.connected),
            disconnected: std::mem::take(&mut inner.disconnected),
            commands: std::mem::take(&mut inner.commands),
        }
    }

    async fn send(&self, conn: ConnId, text: OutboundText) {
        self.inner.lock().unwrap().sent.push((conn, text));
    }

    async fn disconnect(&self, conn: ConnId) {
        let mut inner = self.inner.lock().unwrap();
        inner.dropped.push(conn);
        // The transport reports the closure on a later poll.
        inner.disconnected.push(conn);
    }

    async fn set_authenticated(&self, conn: ConnId) {
        self.inner.lock().unwrap().authenticated.push(conn);
    }

    async fn toggle_color(&self, conn: ConnId) {
        self.inner.lock().unwrap().color_toggles.push(conn);
    }
}

#[derive(Default)]
struct FakeStoreInner {
    next_id: PlayerDbId,
    players: Vec<PlayerRecord>,
    attributes: HashMap<(PlayerDbId, String), String>,
    inventory: Vec<(PlayerDbId, u32)>,
    rooms: Vec<RoomDef>,
    room_items: HashMap<RoomId, Vec<PlacedObject>>,
    room_npcs: HashMap<RoomId, Vec<NpcInstance>>,
    items: HashMap<u32, ItemDef>,
    fail: bool,
}

#[derive(Default)]
struct FakeStore {
    inner: Mutex<FakeStoreInner>,
}

impl FakeStore {
    fn set_fail(&self, fail: bool) {
        self.inner.lock().unwrap().fail = fail;
    }

    fn attribute(&self, player: PlayerDbId, key: &str) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .attributes
            .get(&(player, key.to_string()))
            .cloned()
    }

    fn rows(&self, player: PlayerDbId) -> Vec<u32> {
        self.inner
            .lock()
            .unwrap()
            .inventory
            .iter()
            .filter(|(p, _)| *p == player)
            .map(|(_, item)| *item)
            .collect()
    }

    fn last_room(&self, name: &str) -> Option<RoomId> {
        self.inner
            .lock()
            .unwrap()
            .players
            .iter()
            .find(|rec| rec.name == name)
            .map(|rec| rec.last_room)
    }

    fn check(inner: &FakeStoreInner) -> Result<(), StoreError> {
        if inner.fail {
            Err(StoreError::Backend("induced failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PlayerStore for FakeStore {
    async fn find_player_by_name(&self, name: &str) -> Result<Option<PlayerRecord>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Self::check(&inner)?;
        Ok(inner.players.iter().find(|rec| rec.name == name).cloned())
    }

    async fn name_taken(&self, name: &str) -> Result<bool, StoreError> {
        let inner = self.inner.lock().unwrap();
        Self::check(&inner)?;
        Ok(inner.players.iter().any(|rec| rec.name == name))
    }

    async fn create_player(
        &self,
        name: &str,
        password_hash: &str,
        room: RoomId,
    ) -> Result<PlayerDbId, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check(&inner)?;
        if inner.players.iter().any(|rec| rec.name == name) {
            return Err(StoreError::Duplicate(format!("player name '{}'", name)));
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner.players.push(PlayerRecord {
            id,
            name: name.to_string(),
            password_hash: password_hash.to_string(),
            last_room: room,
        });
        Ok(id)
    }

    async fn update_last_room(&self, player: PlayerDbId, room: RoomId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check(&inner)?;
        if let Some(rec) = inner.players.iter_mut().find(|rec| rec.id == player) {
            rec.last_room = room;
        }
        Ok(())
    }

    async fn get_attribute(
        &self,
        player: PlayerDbId,
        key: &str,
        default: &str,
    ) -> Result<String, StoreError> {
        let inner = self.inner.lock().unwrap();
        Self::check(&inner)?;
        Ok(inner
            .attributes
            .get(&(player, key.to_string()))
            .cloned()
            .unwrap_or_else(|| default.to_string()))
    }

    async fn set_attribute(
        &self,
        player: PlayerDbId,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check(&inner)?;
        inner
            .attributes
            .insert((player, key.to_string()), value.to_string());
        Ok(())
    }

    async fn add_inventory(&self, player: PlayerDbId, item: u32) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check(&inner)?;
        inner.inventory.push((player, item));
        Ok(())
    }

    async fn remove_inventory(&self, player: PlayerDbId, item: u32) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check(&inner)?;
        let pos = inner
            .inventory
            .iter()
            .position(|(p, i)| *p == player && *i == item);
        match pos {
            Some(pos) => {
                inner.inventory.remove(pos);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_inventory(&self, player: PlayerDbId) -> Result<Vec<u32>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Self::check(&inner)?;
        Ok(inner
            .inventory
            .iter()
            .filter(|(p, _)| *p == player)
            .map(|(_, item)| *item)
            .collect())
    }

    async fn load_item_definition(&self, item: u32) -> Result<Option<ItemDef>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Self::check(&inner)?;
        Ok(inner.items.get(&item).cloned())
    }

    async fn load_rooms(&self) -> Result<Vec<RoomDef>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Self::check(&inner)?;
        Ok(inner.rooms.clone())
    }

    async fn load_room_items(&self, room: RoomId) -> Result<Vec<PlacedObject>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Self::check(&inner)?;
        Ok(inner.room_items.get(&room).cloned().unwrap_or_default())
    }

    async fn load_room_npcs(&self, room: RoomId) -> Result<Vec<NpcInstance>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Self::check(&inner)?;
        Ok(inner.room_npcs.get(&room).cloned().unwrap_or_default())
    }
}

struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, plaintext: &str) -> String {
        format!("plain:{}", plaintext)
    }

    fn verify(&self, plaintext: &str, hash: &str) -> bool {
        hash == format!("plain:{}", plaintext)
    }
}

// ---------------------------------------------------------------------------
// Fixture

const SWORD: u32 = 5;
const SHIELD: u32 = 6;
const KEY: u32 = 7;
const IDOL: u32 = 8;
const AXE: u32 = 9;

fn item(id: u32, name: &str) -> ItemDef {
    ItemDef {
        id,
        name: name.to_string(),
        description: format!("A plain {}.", name),
        invulnerable: false,
        unique: false,
        is_armor: false,
        is_weapon: false,
        power: 0,
        base_value: 0,
        bound: false,
    }
}

fn object(name: &str, grants: u32) -> PlacedObject {
    PlacedObject {
        id: grants,
        name: name.to_string(),
        description: format!("You see a {}.", name),
        movable: true,
        fail_take: format!("The {} resists.", name),
        take_success: format!("You take the {}.", name),
        grants,
    }
}

fn seed_world(store: &FakeStore) {
    let mut inner = store.inner.lock().unwrap();
    inner.rooms = vec![
        RoomDef {
            id: 1,
            name: "Town Square".to_string(),
            description: "A dusty square.".to_string(),
            exits: vec![
                Exit {
                    name: "north".to_string(),
                    to_room: 2,
                    item_key: 0,
                    fail_key: String::new(),
                },
                Exit {
                    name: "vault".to_string(),
                    to_room: 3,
                    item_key: KEY,
                    fail_key: "The vault door is locked.".to_string(),
                },
                Exit {
                    name: "chasm".to_string(),
                    to_room: 99,
                    item_key: 0,
                    fail_key: String::new(),
                },
            ],
        },
        RoomDef {
            id: 2,
            name: "Market".to_string(),
            description: "Stalls everywhere.".to_string(),
            exits: vec![Exit {
                name: "south".to_string(),
                to_room: 1,
                item_key: 0,
                fail_key: String::new(),
            }],
        },
        RoomDef {
            id: 3,
            name: "Vault".to_string(),
            description: "Cold and quiet.".to_string(),
            exits: Vec::new(),
        },
    ];

    let sword = ItemDef {
        is_weapon: true,
        base_value: 50,
        ..item(SWORD, "sword")
    };
    let axe = ItemDef {
        is_weapon: true,
        base_value: 20,
        ..item(AXE, "axe")
    };
    let shield = ItemDef {
        is_armor: true,
        base_value: 30,
        ..item(SHIELD, "shield")
    };
    let key = ItemDef {
        unique: true,
        ..item(KEY, "brass key")
    };
    let idol = ItemDef {
        invulnerable: true,
        ..item(IDOL, "idol")
    };
    inner.items = [sword, axe, shield, key, idol]
        .into_iter()
        .map(|def| (def.id, def))
        .collect();

    let mut chest = object("chest", KEY);
    chest.fail_take = "You already pried the key loose.".to_string();
    let mut statue = object("statue", 0);
    statue.movable = false;
    statue.fail_take = "The statue won't budge.".to_string();
    let mut bench = object("bench", 0);
    bench.take_success = "You shift the bench around a little.".to_string();
    inner.room_items.insert(
        1,
        vec![
            chest,
            statue,
            bench,
            object("sword", SWORD),
            object("axe", AXE),
            object("shield", SHIELD),
            object("idol", IDOL),
        ],
    );
    inner.room_npcs.insert(
        2,
        vec![NpcInstance {
            id: 1,
            name: "scrapbot".to_string(),
            description: "A battered trade robot.".to_string(),
            code: 1,
            arg: String::new(),
        }],
    );
}

struct Fixture {
    engine: Engine,
    mux: Arc<FakeMux>,
    store: Arc<FakeStore>,
}

impl Fixture {
    async fn new() -> Self {
        Self::with_policy(ExitPolicy::Fallback).await
    }

    async fn with_policy(policy: ExitPolicy) -> Self {
        let store = Arc::new(FakeStore::default());
        seed_world(&store);
        let mux = Arc::new(FakeMux::default());
        let config = EngineConfig {
            exit_policy: policy,
            ..EngineConfig::default()
        };
        let engine = Engine::new(
            config,
            store.clone(),
            Arc::new(PlainHasher),
            mux.clone(),
        )
        .await
        .unwrap();
        Self { engine, mux, store }
    }

    async fn step(&mut self, conn: ConnId, line: &str) {
        self.mux.line(conn, line);
        self.engine.tick().await;
    }

    async fn login_new(&mut self, conn: ConnId, name: &str, password: &str) {
        self.mux.connect(conn);
        self.engine.tick().await;
        self.step(conn, "new").await;
        self.step(conn, name).await;
        self.step(conn, password).await;
    }

    async fn login_existing(&mut self, conn: ConnId, name: &str, password: &str) {
        self.mux.connect(conn);
        self.engine.tick().await;
        self.step(conn, name).await;
        self.step(conn, password).await;
    }

    fn session(&self, conn: ConnId) -> &crate::session::Session {
        self.engine.sessions.get(conn).unwrap()
    }

    fn db_id(&self, conn: ConnId) -> PlayerDbId {
        self.session(conn).db_id.unwrap()
    }
}

// ---------------------------------------------------------------------------
// Login

#[tokio::test]
async fn name_and_room_are_set_together_through_every_login_phase() {
    let mut fx = Fixture::new().await;
    fx.mux.connect(1);
    fx.engine.tick().await;
    let s = fx.session(1);
    assert_eq!(s.name.is_some(), s.room.is_some());

    fx.step(1, "new").await;
    fx.step(1, "alice").await;
    let s = fx.session(1);
    assert!(s.claimed_name.is_some());
    assert_eq!(s.name.is_some(), s.room.is_some());

    fx.step(1, "hunter22hunter").await;
    let s = fx.session(1);
    assert!(s.name.is_some() && s.room.is_some());
}

#[tokio::test]
async fn unacceptable_new_names_are_rejected() {
    let mut fx = Fixture::new().await;
    fx.login_new(1, "alice", "hunter22hunter").await;

    for bad in ["new", "NEW", "x", "bad!name", "alice"] {
        fx.mux.connect(10);
        fx.engine.tick().await;
        fx.step(10, "new").await;
        fx.mux.clear_sent();
        fx.step(10, bad).await;
        assert!(
            fx.mux
                .received(10, "Sorry, that name is in use or inappropriate, try again."),
            "name {:?} should be rejected",
            bad
        );
        assert!(fx.session(10).claimed_name.is_none());
        fx.mux.drop_conn(10);
        fx.engine.tick().await;
    }
}

#[tokio::test]
async fn short_passwords_are_rejected_for_new_players_only() {
    let mut fx = Fixture::new().await;
    fx.mux.connect(1);
    fx.engine.tick().await;
    fx.step(1, "new").await;
    fx.step(1, "alice").await;
    fx.step(1, "short").await;
    assert!(fx.mux.received(1, "Password too short!"));
    assert!(fx.session(1).name.is_none());

    fx.step(1, "longenough").await;
    assert!(fx.session(1).name.is_some());
}

#[tokio::test]
async fn blank_input_during_login_is_ignored() {
    let mut fx = Fixture::new().await;
    fx.mux.connect(1);
    fx.engine.tick().await;
    fx.step(1, "   ").await;
    assert!(fx.session(1).claimed_name.is_none());
    fx.step(1, "new").await;
    fx.step(1, "alice").await;
    fx.step(1, "").await;
    assert!(fx.session(1).name.is_none());
}

#[tokio::test]
async fn wrong_password_disconnects_the_session() {
    let mut fx = Fixture::new().await;
    fx.login_new(1, "alice", "hunter22hunter").await;
    fx.step(1, "quit").await;
    fx.engine.tick().await;

    fx.login_existing(2, "alice", "wrongwrong").await;
    assert!(fx.mux.dropped(2));
    assert!(fx.engine.sessions.get(2).is_none());
}

#[tokio::test]
async fn the_earlier_session_wins_a_live_name_race() {
    let mut fx = Fixture::new().await;
    fx.login_new(1, "alice", "hunter22hunter").await;
    fx.mux.clear_sent();

    fx.login_existing(2, "alice", "hunter22hunter").await;
    assert!(fx.mux.dropped(2));
    assert!(fx.engine.sessions.get(2).is_none());
    // The loser never entered the game, so nobody hears a quit.
    fx.engine.tick().await;
    assert!(!fx.mux.received(1, "quit the game"));
    // The winner keeps playing.
    assert_eq!(fx.session(1).name.as_deref(), Some("alice"));
}

#[tokio::test]
async fn login_announces_welcomes_and_shows_the_room() {
    let mut fx = Fixture::new().await;
    fx.login_new(1, "alice", "hunter22hunter").await;
    assert!(fx.mux.received(1, "alice entered the game"));
    assert!(fx.mux.received(
        1,
        "Welcome to the game, alice. Type 'help' for a list of commands. Have fun!"
    ));
    assert!(fx.mux.received(1, "Town Square"));
    assert!(fx.mux.received(1, "Players: alice"));
    assert!(fx.mux.received(1, "Exits: north, vault, chasm"));
}

#[tokio::test]
async fn existing_players_are_hydrated_from_the_store() {
    let mut fx = Fixture::new().await;
    let hash = PlainHasher.hash("hunter22hunter");
    let id = fx.store.create_player("bob", &hash, 1).await.unwrap();
    fx.store.update_last_room(id, 2).await.unwrap();
    fx.store.set_attribute(id, "health", "50").await.unwrap();
    fx.store.set_attribute(id, "gold", "7").await.unwrap();
    fx.store.set_attribute(id, "color", "False").await.unwrap();
    fx.store
        .set_attribute(id, "weapon", &SWORD.to_string())
        .await
        .unwrap();
    fx.store.add_inventory(id, KEY).await.unwrap();

    fx.login_existing(1, "bob", "hunter22hunter").await;
    let s = fx.session(1);
    assert_eq!(s.health, 50);
    assert_eq!(s.gold, 7);
    assert!(!s.color);
    assert_eq!(s.weapon.as_ref().map(|w| w.id), Some(SWORD));
    assert_eq!(s.room, Some(2));
    assert_eq!(s.inventory.len(), 1);
    assert_eq!(s.inventory[0].id, KEY);
    // Stored color preference is pushed to the transport once.
    assert_eq!(fx.mux.toggle_count(1), 1);
}

#[tokio::test]
async fn a_name_claimed_by_two_connections_is_created_once() {
    let mut fx = Fixture::new().await;
    fx.mux.connect(1);
    fx.mux.connect(2);
    fx.engine.tick().await;

    // Both pass the name check before either has a durable record.
    fx.step(1, "new").await;
    fx.step(2, "new").await;
    fx.step(1, "zara").await;
    fx.step(2, "zara").await;

    // The first finishes, plays, and quits.
    fx.step(1, "hunter22hunter").await;
    fx.step(1, "quit").await;
    fx.engine.tick().await;

    // The second's password step finds the name taken and restarts naming.
    fx.step(2, "hunter22hunter").await;
    assert!(fx
        .mux
        .received(2, "Sorry, that name is in use or inappropriate, try again."));
    assert!(fx.session(2).claimed_name.is_none());
    assert!(fx.session(2).name.is_none());

    let records = fx
        .store
        .inner
        .lock()
        .unwrap()
        .players
        .iter()
        .filter(|rec| rec.name == "zara")
        .count();
    assert_eq!(records, 1);
}

// ---------------------------------------------------------------------------
// Items

#[tokio::test]
async fn take_then_drop_round_trips_memory_and_store() {
    let mut fx = Fixture::new().await;
    fx.login_new(1, "alice", "hunter22hunter").await;
    let id = fx.db_id(1);

    fx.step(1, "take sword").await;
    assert!(fx.mux.received(1, "You take the sword."));
    assert_eq!(fx.session(1).inventory.len(), 1);
    assert_eq!(fx.store.rows(id), vec![SWORD]);

    fx.step(1, "drop sword").await;
    assert!(fx
        .mux
        .received(1, "You dropped sword and it vanished in thin air!"));
    assert!(fx.session(1).inventory.is_empty());
    assert!(fx.store.rows(id).is_empty());
}

#[tokio::test]
async fn taking_a_unique_item_twice_is_refused_verbatim() {
    let mut fx = Fixture::new().await;
    fx.login_new(1, "alice", "hunter22hunter").await;

    fx.step(1, "take chest").await;
    assert_eq!(fx.session(1).inventory.len(), 1);
    fx.step(1, "take chest").await;
    assert!(fx.mux.received(1, "You already pried the key loose."));
    assert_eq!(fx.session(1).inventory.len(), 1);
    assert_eq!(fx.store.rows(fx.db_id(1)), vec![KEY]);
}

#[tokio::test]
async fn immovable_objects_and_missing_items_refuse_a_take() {
    let mut fx = Fixture::new().await;
    fx.login_new(1, "alice", "hunter22hunter").await;

    fx.step(1, "take statue").await;
    assert!(fx.mux.received(1, "The statue won't budge."));
    fx.step(1, "take unicorn").await;
    assert!(fx.mux.received(1, "take what?!"));
    assert!(fx.session(1).inventory.is_empty());
}

#[tokio::test]
async fn taking_an_object_that_grants_nothing_succeeds_without_an_item() {
    let mut fx = Fixture::new().await;
    fx.login_new(1, "alice", "hunter22hunter").await;

    fx.step(1, "take bench").await;
    assert!(fx.mux.received(1, "You shift the bench around a little."));
    assert!(fx.session(1).inventory.is_empty());
    assert!(fx.store.rows(fx.db_id(1)).is_empty());
}

#[tokio::test]
async fn invulnerable_items_cannot_be_dropped() {
    let mut fx = Fixture::new().await;
    fx.login_new(1, "alice", "hunter22hunter").await;
    fx.step(1, "take idol").await;
    fx.step(1, "drop idol").await;
    assert!(fx.mux.received(1, "You can't drop idol"));
    assert_eq!(fx.session(1).inventory.len(), 1);

    fx.step(1, "drop unicorn").await;
    assert!(fx.mux.received(1, "You have no unicorn to drop"));
}

#[tokio::test]
async fn equip_swap_keeps_net_inventory_size_constant() {
    let mut fx = Fixture::new().await;
    fx.login_new(1, "alice", "hunter22hunter").await;
    let id = fx.db_id(1);
    fx.step(1, "take sword").await;
    fx.step(1, "take axe").await;

    fx.step(1, "equip sword").await;
    assert!(fx.mux.received(1, "You equip your sword"));
    assert_eq!(fx.session(1).weapon.as_ref().map(|w| w.id), Some(SWORD));
    assert_eq!(fx.session(1).inventory.len(), 1);
    assert_eq!(fx.store.attribute(id, "weapon").as_deref(), Some("5"));
    assert_eq!(fx.store.rows(id), vec![AXE]);

    // Swapping returns the displaced weapon to the bag.
    fx.step(1, "equip axe").await;
    assert_eq!(fx.session(1).weapon.as_ref().map(|w| w.id), Some(AXE));
    assert_eq!(fx.session(1).inventory.len(), 1);
    assert_eq!(fx.session(1).inventory[0].id, SWORD);
    assert_eq!(fx.store.attribute(id, "weapon").as_deref(), Some("9"));
    assert_eq!(fx.store.rows(id), vec![SWORD]);
}

#[tokio::test]
async fn unequip_returns_the_slot_to_the_bag() {
    let mut fx = Fixture::new().await;
    fx.login_new(1, "alice", "hunter22hunter").await;
    let id = fx.db_id(1);
    fx.step(1, "take shield").await;
    fx.step(1, "equip shield").await;
    assert!(fx.session(1).armor.is_some());

    fx.step(1, "unequip armor").await;
    assert!(fx.mux.received(1, "You remove your shield"));
    assert!(fx.session(1).armor.is_none());
    assert_eq!(fx.session(1).inventory.len(), 1);
    assert_eq!(fx.store.attribute(id, "armor").as_deref(), Some("0"));
    assert_eq!(fx.store.rows(id), vec![SHIELD]);

    fx.step(1, "unequip armor").await;
    assert!(fx.mux.received(1, "You're not wearing any armor!"));
    fx.step(1, "unequip weapon").await;
    assert!(fx.mux.received(1, "You're not wielding a weapon!"));
    fx.step(1, "unequip hat").await;
    assert!(fx
        .mux
        .received(1, "Parameter must be either 'weapon' or 'armor'"));
}

#[tokio::test]
async fn examine_checks_objects_then_inventory_then_npcs() {
    let mut fx = Fixture::new().await;
    fx.login_new(1, "alice", "hunter22hunter").await;
    fx.step(1, "examine statue").await;
    assert!(fx.mux.received(1, "You see a statue."));

    fx.step(1, "take sword").await;
    fx.step(1, "examine sword").await;
    // The room object's description wins over the carried copy.
    assert!(fx.mux.received(1, "You see a sword."));

    fx.step(1, "go north").await;
    fx.step(1, "examine scrapbot").await;
    assert!(fx.mux.received(1, "A battered trade robot."));

    fx.step(1, "examine ghost").await;
    assert!(fx.mux.received(1, "examine what?!"));
}

// ---------------------------------------------------------------------------
// Movement

#[tokio::test]
async fn gated_exits_require_the_key_item() {
    let mut fx = Fixture::new().await;
    fx.login_new(1, "alice", "hunter22hunter").await;
    let id = fx.db_id(1);

    fx.step(1, "go vault").await;
    assert!(fx.mux.received(1, "The vault door is locked."));
    assert_eq!(fx.session(1).room, Some(1));
    assert_eq!(fx.store.last_room("alice"), Some(1));

    fx.step(1, "take chest").await;
    fx.step(1, "go vault").await;
    assert!(fx.mux.received(1, "You arrive at 'Vault'"));
    assert_eq!(fx.session(1).room, Some(3));
    assert_eq!(fx.store.last_room("alice"), Some(3));
    assert_eq!(fx.store.rows(id), vec![KEY]);
}

#[tokio::test]
async fn movement_is_announced_to_both_rooms() {
    let mut fx = Fixture::new().await;
    fx.login_new(1, "alice", "hunter22hunter").await;
    fx.login_new(2, "bob", "hunter22hunter").await;
    fx.step(2, "go north").await;
    fx.mux.clear_sent();

    fx.step(1, "go north").await;
    assert!(fx.mux.received(2, "alice arrived via exit 'north'"));
    assert!(fx.mux.received(1, "You arrive at 'Market'"));

    fx.step(1, "go south").await;
    assert!(fx.mux.received(2, "alice left via exit 'south'"));
}

#[tokio::test]
async fn unknown_exits_and_unknown_commands_report_back() {
    let mut fx = Fixture::new().await;
    fx.login_new(1, "alice", "hunter22hunter").await;
    fx.step(1, "go sideways").await;
    assert!(fx.mux.received(1, "Unknown exit 'sideways'"));
    fx.step(1, "dance").await;
    assert!(fx.mux.received(1, "Unknown command 'dance'"));
}

#[tokio::test]
async fn verbs_are_matched_case_sensitively() {
    let mut fx = Fixture::new().await;
    fx.login_new(1, "alice", "hunter22hunter").await;
    fx.login_new(2, "bob", "hunter22hunter").await;
    fx.mux.clear_sent();

    fx.step(1, "SAY hi").await;
    assert!(fx.mux.received(1, "Unknown command 'SAY'"));
    assert!(!fx.mux.received(2, "alice says: hi"));
}

#[tokio::test]
async fn fallback_policy_reroutes_a_dangling_exit() {
    let mut fx = Fixture::new().await;
    fx.login_new(1, "alice", "hunter22hunter").await;
    fx.step(1, "go chasm").await;
    assert_eq!(fx.session(1).room, Some(1));
    assert!(fx.mux.received(1, "You arrive at 'Town Square'"));
}

#[tokio::test]
async fn strict_policy_bars_a_dangling_exit() {
    let mut fx = Fixture::with_policy(ExitPolicy::Strict).await;
    fx.login_new(1, "alice", "hunter22hunter").await;
    fx.step(1, "go chasm").await;
    assert!(fx.mux.received(1, "The way is barred."));
    assert_eq!(fx.session(1).room, Some(1));
    assert_eq!(fx.store.last_room("alice"), Some(1));
}

// ---------------------------------------------------------------------------
// Chat and presence

#[tokio::test]
async fn say_reaches_only_the_speakers_room() {
    let mut fx = Fixture::new().await;
    fx.login_new(1, "alice", "hunter22hunter").await;
    fx.login_new(2, "bob", "hunter22hunter").await;
    fx.login_new(3, "carol", "hunter22hunter").await;
    fx.step(3, "go north").await;
    fx.mux.clear_sent();

    fx.step(1, "say hello there").await;
    assert!(fx.mux.received(1, "alice says: hello there"));
    assert!(fx.mux.received(2, "alice says: hello there"));
    assert!(!fx.mux.received(3, "alice says: hello there"));
}

#[tokio::test]
async fn quit_broadcasts_only_for_logged_in_players() {
    let mut fx = Fixture::new().await;
    fx.login_new(1, "alice", "hunter22hunter").await;
    fx.login_new(2, "bob", "hunter22hunter").await;

    // A connection that never logged in leaves silently.
    fx.mux.connect(3);
    fx.engine.tick().await;
    fx.mux.clear_sent();
    fx.mux.drop_conn(3);
    fx.engine.tick().await;
    assert!(!fx.mux.received(1, "quit the game"));

    fx.step(2, "quit").await;
    assert!(fx.mux.dropped(2));
    fx.engine.tick().await;
    assert!(fx.mux.received(1, "bob quit the game"));
    assert!(fx.engine.sessions.get(2).is_none());
}

#[tokio::test]
async fn duplicate_disconnect_events_are_no_ops() {
    let mut fx = Fixture::new().await;
    fx.login_new(1, "alice", "hunter22hunter").await;
    fx.login_new(2, "bob", "hunter22hunter").await;
    fx.mux.clear_sent();
    fx.mux.drop_conn(2);
    fx.mux.drop_conn(2);
    fx.engine.tick().await;
    let quits = fx
        .mux
        .plain_sent_to(1)
        .iter()
        .filter(|line| line.contains("bob quit the game"))
        .count();
    assert_eq!(quits, 1);
}

// ---------------------------------------------------------------------------
// Color and prompt

#[tokio::test]
async fn color_toggle_is_idempotent_and_persisted() {
    let mut fx = Fixture::new().await;
    fx.login_new(1, "alice", "hunter22hunter").await;
    let id = fx.db_id(1);

    fx.step(1, "color off").await;
    assert!(!fx.session(1).color);
    assert_eq!(fx.store.attribute(id, "color").as_deref(), Some("False"));
    assert_eq!(fx.mux.toggle_count(1), 1);

    // Already off, nothing changes.
    fx.step(1, "color off").await;
    assert_eq!(fx.mux.toggle_count(1), 1);

    fx.step(1, "color on").await;
    assert!(fx.session(1).color);
    assert_eq!(fx.store.attribute(id, "color").as_deref(), Some("True"));
    assert_eq!(fx.mux.toggle_count(1), 2);
}

#[tokio::test]
async fn every_command_ends_with_a_status_prompt() {
    let mut fx = Fixture::new().await;
    fx.login_new(1, "alice", "hunter22hunter").await;
    fx.step(1, "help").await;
    let sent = fx.mux.sent_to(1);
    let prompt = sent.last().unwrap();
    assert_eq!(prompt.ending, LineEnding::None);
    let text = prompt.as_plain_text();
    assert!(text.starts_with("\r\nalice ["));
    assert!(text.contains("0 gold"));
    assert!(text.contains("100 HP"));
    assert!(text.ends_with(":> "));
}

#[tokio::test]
async fn inventory_lists_slots_then_items_in_pickup_order() {
    let mut fx = Fixture::new().await;
    fx.login_new(1, "alice", "hunter22hunter").await;
    fx.step(1, "take sword").await;
    fx.step(1, "take shield").await;
    fx.mux.clear_sent();
    fx.step(1, "inventory").await;
    let lines = fx.mux.plain_sent_to(1);
    assert_eq!(lines[0], "Your Weapon: None");
    assert_eq!(lines[1], "Your Armor: None");
    assert_eq!(lines[2], "Your Inventory:");
    assert_eq!(lines[3], " - sword");
    assert_eq!(lines[4], " - shield");
}

// ---------------------------------------------------------------------------
// NPC interaction

#[tokio::test]
async fn scrapbot_pays_ten_percent_and_persists_the_gold() {
    let mut fx = Fixture::new().await;
    fx.login_new(1, "alice", "hunter22hunter").await;
    let id = fx.db_id(1);
    fx.step(1, "take sword").await;
    fx.step(1, "go north").await;

    fx.step(1, "target scrapbot").await;
    assert!(fx
        .mux
        .received(1, "Now targeting scrapbot enter 'bye' to stop targeting."));

    fx.step(1, "appraise sword").await;
    assert!(fx
        .mux
        .received(1, "That sword looks like it's worth 5 gold"));
    assert_eq!(fx.session(1).gold, 0);

    fx.step(1, "scrap sword").await;
    assert!(fx.mux.received(1, "Here's 5 gold for your sword"));
    assert_eq!(fx.session(1).gold, 5);
    assert!(fx.session(1).inventory.is_empty());
    assert_eq!(fx.store.attribute(id, "gold").as_deref(), Some("5"));
    assert!(fx.store.rows(id).is_empty());
}

#[tokio::test]
async fn scrapbot_refuses_worthless_and_missing_items() {
    let mut fx = Fixture::new().await;
    fx.login_new(1, "alice", "hunter22hunter").await;
    fx.step(1, "take chest").await;
    fx.step(1, "go north").await;
    fx.step(1, "target scrapbot").await;

    fx.step(1, "appraise brass key").await;
    assert!(fx.mux.received(1, "That item has no value!"));
    fx.step(1, "scrap unicorn").await;
    assert!(fx.mux.received(1, "scrap what?"));
    fx.step(1, "appraise unicorn").await;
    assert!(fx.mux.received(1, "appraise what?"));
}

#[tokio::test]
async fn targeting_routes_commands_until_bye() {
    let mut fx = Fixture::new().await;
    fx.login_new(1, "alice", "hunter22hunter").await;
    fx.step(1, "go north").await;
    fx.step(1, "target ghost").await;
    assert!(fx.mux.received(1, "I see no such NPC"));

    fx.step(1, "target scrapbot").await;
    assert!(fx.session(1).target.is_some());

    // Free-roam verbs are not reachable while targeting.
    fx.mux.clear_sent();
    fx.step(1, "look").await;
    assert!(fx.mux.received(1, "Unknown command 'look'"));

    // The targeted prompt names the NPC.
    let sent = fx.mux.sent_to(1);
    assert!(sent
        .last()
        .unwrap()
        .as_plain_text()
        .starts_with("\r\nalice -> scrapbot ["));

    fx.step(1, "bye").await;
    assert!(fx.session(1).target.is_none());
}

// ---------------------------------------------------------------------------
// Failure handling

#[tokio::test]
async fn a_store_failure_aborts_the_command_but_not_the_loop() {
    let mut fx = Fixture::new().await;
    fx.login_new(1, "alice", "hunter22hunter").await;

    fx.store.set_fail(true);
    fx.step(1, "take sword").await;
    assert!(fx.mux.received(1, "Something went wrong"));
    assert!(fx.session(1).inventory.is_empty());

    fx.store.set_fail(false);
    fx.step(1, "take sword").await;
    assert_eq!(fx.session(1).inventory.len(), 1);
}

#[tokio::test]
async fn run_marks_shutdown_complete_when_it_exits() {
    let mut fx = Fixture::new().await;
    let shutdown = crate::shutdown::ShutdownState::new();
    shutdown.initiate_shutdown();
    fx.engine.run(shutdown.clone()).await;
    assert!(shutdown.is_shutdown_complete());
}

#[tokio::test]
async fn commands_from_unknown_connections_are_dropped() {
    let mut fx = Fixture::new().await;
    fx.login_new(1, "alice", "hunter22hunter").await;
    fx.mux.clear_sent();
    fx.step(99, "say boo").await;
    assert!(fx.mux.sent_to(99).is_empty());
    assert!(!fx.mux.received(1, "boo"));
}
