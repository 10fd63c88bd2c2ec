//! Room membership and fan-out

use std::collections::{HashMap, HashSet};
use std::fmt;

use tokio::sync::mpsc;
use tracing::debug;

use crate::game::RoomId;
use crate::ws::protocol::ServerMsg;

/// Observer room that receives every relayed action
pub const GLOBAL_ROOM: &str = "global";

/// Outbound queue of one connection (drained by its writer task)
pub type Outbound = mpsc::UnboundedSender<ServerMsg>;

/// Process-unique connection handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Membership change produced by one subscribe call
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RoomTransition {
    pub joined: Option<RoomId>,
    pub left: Option<RoomId>,
}

impl RoomTransition {
    pub fn is_empty(&self) -> bool {
        self.joined.is_none() && self.left.is_none()
    }
}

struct Member {
    outbound: Outbound,
    current_room: Option<RoomId>,
}

/// Tracks which room each connection is in.
///
/// A connection is in at most one room at a time. Addressing a single
/// connection goes through its ID, so there is no per-connection self room.
#[derive(Default)]
pub struct RoomRegistry {
    members: HashMap<ConnectionId, Member>,
    rooms: HashMap<RoomId, HashSet<ConnectionId>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection with no room
    pub fn connect(&mut self, id: ConnectionId, outbound: Outbound) {
        self.members.insert(
            id,
            Member {
                outbound,
                current_room: None,
            },
        );
    }

    /// Drop a connection from every room. Returns the room it was in.
    pub fn disconnect(&mut self, id: ConnectionId) -> Option<RoomId> {
        let member = self.members.remove(&id)?;
        let room = member.current_room?;
        self.leave(id, &room);
        Some(room)
    }

    /// Move a connection into `room`.
    ///
    /// Joins first, then leaves the previous room. Subscribing to the room the
    /// connection is already in yields an empty transition.
    pub fn subscribe(&mut self, id: ConnectionId, room: RoomId) -> RoomTransition {
        let Some(member) = self.members.get_mut(&id) else {
            return RoomTransition::default();
        };

        if member.current_room.as_ref() == Some(&room) {
            return RoomTransition::default();
        }

        self.rooms.entry(room.clone()).or_default().insert(id);
        let left = member.current_room.replace(room.clone());

        if let Some(prev) = &left {
            self.leave(id, prev);
        }

        RoomTransition {
            joined: Some(room),
            left,
        }
    }

    pub fn current_room(&self, id: ConnectionId) -> Option<&RoomId> {
        self.members.get(&id)?.current_room.as_ref()
    }

    pub fn is_member(&self, id: ConnectionId, room: &str) -> bool {
        self.rooms
            .get(room)
            .map(|members| members.contains(&id))
            .unwrap_or(false)
    }

    /// Queue a message for one connection. Returns false if it is gone.
    pub fn send_to(&self, id: ConnectionId, msg: ServerMsg) -> bool {
        let Some(member) = self.members.get(&id) else {
            return false;
        };
        if member.outbound.send(msg).is_err() {
            debug!(connection = %id, "Outbound channel closed");
            return false;
        }
        true
    }

    /// Queue a message for every member of `rooms` except `except`.
    /// Returns the number of connections reached.
    pub fn broadcast(&self, rooms: &[&str], except: ConnectionId, msg: &ServerMsg) -> usize {
        let mut delivered = 0;

        for (i, room) in rooms.iter().enumerate() {
            if rooms[..i].contains(room) {
                continue;
            }
            let Some(members) = self.rooms.get(*room) else {
                continue;
            };
            for &id in members.iter().filter(|&&id| id != except) {
                if self.send_to(id, msg.clone()) {
                    delivered += 1;
                }
            }
        }

        delivered
    }

    pub fn connection_count(&self) -> usize {
        self.members.len()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn leave(&mut self, id: ConnectionId, room: &RoomId) {
        if let Some(members) = self.rooms.get_mut(room) {
            members.remove(&id);
            if members.is_empty() {
                self.rooms.remove(room);
            }
        }
    }
}
