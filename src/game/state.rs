//! Authoritative game state snapshot

use serde::{Deserialize, Serialize};

use super::action::{GameId, User, UserId};

/// Maximum players per game
pub const MAX_PLAYERS: usize = 2;
/// Width of each player's well in columns
pub const WELL_COLS: i32 = 10;
/// Column where a fresh piece spawns
pub const SPAWN_COL: i32 = 4;

/// Game lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Waiting for players to join and ready up
    Pending,
    /// All players ready, game in progress
    Playing,
}

/// Per-player state within a game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub user: User,
    pub ready: bool,
    /// Active piece column
    pub column: i32,
    /// Active piece rotation (0..4)
    pub rotation: u8,
    pub accelerating: bool,
    pub drops: u32,
    pub lines_cleared: u32,
    pub score: u32,
    /// Rows queued by opponents, not yet in the well
    pub pending_rows: u32,
    /// Rows already pushed into the well by opponents
    pub garbage_rows: u32,
}

impl PlayerState {
    pub fn new(user: User) -> Self {
        Self {
            user,
            ready: false,
            column: SPAWN_COL,
            rotation: 0,
            accelerating: false,
            drops: 0,
            lines_cleared: 0,
            score: 0,
            pending_rows: 0,
            garbage_rows: 0,
        }
    }
}

/// Serializable snapshot of one game.
///
/// Only replaced wholesale by the reducer; never edited in place by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub id: GameId,
    pub status: GameStatus,
    pub players: Vec<PlayerState>,
}

impl GameState {
    /// New pending game with its creator already joined
    pub fn new(id: GameId, creator: User) -> Self {
        Self {
            id,
            status: GameStatus::Pending,
            players: vec![PlayerState::new(creator)],
        }
    }

    pub fn player(&self, user_id: &UserId) -> Option<&PlayerState> {
        self.players.iter().find(|p| &p.user.id == user_id)
    }

    pub fn has_player(&self, user_id: &UserId) -> bool {
        self.player(user_id).is_some()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= MAX_PLAYERS
    }
}
