//! Audience resolution for multi-recipient messages.
//!
//! Resolution is a pure function over the session registry so it can be
//! tested without a transport. Delivery order to each recipient follows the
//! mux's per-connection FIFO guarantee.

use crate::mux::ConnId;
use crate::session::SessionRegistry;
use crate::world::RoomId;

/// Who should receive a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Every logged-in player in a room.
    Room(RoomId),
    /// Every logged-in player in a room except one connection.
    RoomExcept(RoomId, ConnId),
    /// Every logged-in player anywhere. Sessions still logging in are
    /// excluded; they have no name yet.
    Global,
    /// Exactly one connection, logged in or not.
    One(ConnId),
}

/// Resolves an audience to the connections it currently names.
///
/// Results are sorted so delivery (and tests) are deterministic.
pub fn resolve(audience: Audience, sessions: &SessionRegistry) -> Vec<ConnId> {
    let mut conns: Vec<ConnId> = match audience {
        Audience::Room(room) => sessions
            .iter()
            .filter(|(_, s)| s.room == Some(room))
            .map(|(conn, _)| conn)
            .collect(),
        Audience::RoomExcept(room, except) => sessions
            .iter()
            .filter(|(conn, s)| *conn != except && s.room == Some(room))
            .map(|(conn, _)| conn)
            .collect(),
        Audience::Global => sessions
            .iter()
            .filter(|(_, s)| s.name.is_some())
            .map(|(conn, _)| conn)
            .collect(),
        Audience::One(conn) => vec![conn],
    };
    conns.sort_unstable();
    conns
}
