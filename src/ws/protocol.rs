//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};

use crate::game::{GameId, RelayedAction, RoomId};

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientMsg {
    /// Move this connection into a room, leaving the previous one
    Subscribe(RoomId),

    /// Apply an action to a game and relay it to peers
    GameAction(RelayedAction),
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerMsg {
    /// The game an action referenced no longer exists
    GameRemoved(GameId),

    /// Action applied by a peer, relayed verbatim
    GameAction(RelayedAction),
}
