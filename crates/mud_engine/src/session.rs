//! Live player sessions.
//!
//! One [`Session`] exists per connection from accept to disconnect. The
//! registry is plainly owned by the engine's dispatch task; nothing else
//! holds a reference, so there is no locking here.

use crate::mux::ConnId;
use crate::store::PlayerDbId;
use crate::world::{ItemDef, NpcInstance, RoomId};
use std::collections::HashMap;

/// Where a session is in the login flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for a name (or "new").
    Naming,
    /// Name claimed, waiting for a password.
    Authenticating,
    /// Logged in and playing.
    Interacting,
}

/// Mutable per-connection state.
///
/// `name` and `room` are set together at the moment login completes and
/// cleared together at removal, never one without the other. While the
/// session is authenticating, the name under negotiation lives in
/// `claimed_name` instead.
#[derive(Debug, Clone)]
pub struct Session {
    /// Name being negotiated during authentication.
    pub claimed_name: Option<String>,
    /// Live player name. Set only while interacting.
    pub name: Option<String>,
    /// Current room. Set only while interacting.
    pub room: Option<RoomId>,
    /// Durable player id. Set only while interacting.
    pub db_id: Option<PlayerDbId>,
    /// True when this login is creating a new player.
    pub new_player: bool,
    pub color: bool,
    pub health: i32,
    pub gold: i64,
    pub armor: Option<ItemDef>,
    pub weapon: Option<ItemDef>,
    /// Carried items in pickup order.
    pub inventory: Vec<ItemDef>,
    /// NPC currently being addressed, if any.
    pub target: Option<NpcInstance>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            claimed_name: None,
            name: None,
            room: None,
            db_id: None,
            new_player: false,
            color: true,
            health: 100,
            gold: 0,
            armor: None,
            weapon: None,
            inventory: Vec::new(),
            target: None,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.db_id.is_some() {
            Phase::Interacting
        } else if self.claimed_name.is_some() {
            Phase::Authenticating
        } else {
            Phase::Naming
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// All live sessions, keyed by connection id.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<ConnId, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    pub fn insert(&mut self, conn: ConnId) {
        self.sessions.insert(conn, Session::new());
    }

    pub fn remove(&mut self, conn: ConnId) -> Option<Session> {
        self.sessions.remove(&conn)
    }

    pub fn get(&self, conn: ConnId) -> Option<&Session> {
        self.sessions.get(&conn)
    }

    pub fn get_mut(&mut self, conn: ConnId) -> Option<&mut Session> {
        self.sessions.get_mut(&conn)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConnId, &Session)> {
        self.sessions.iter().map(|(conn, session)| (*conn, session))
    }

    /// Finds the connection already playing under `name`, if any.
    pub fn conn_for_live_name(&self, name: &str) -> Option<ConnId> {
        self.sessions
            .iter()
            .find(|(_, session)| session.name.as_deref() == Some(name))
            .map(|(conn, _)| *conn)
    }

    /// Names of players currently in `room`, in no particular order.
    pub fn names_in_room(&self, room: RoomId) -> Vec<String> {
        self.sessions
            .values()
            .filter(|session| session.room == Some(room))
            .filter_map(|session| session.name.clone())
            .collect()
    }
}
