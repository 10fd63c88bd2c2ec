//! Liveness bookkeeping for games

use std::collections::HashMap;
use std::time::Duration;

use crate::game::GameId;
use crate::util::time::unix_millis;

/// Last-active unix timestamp (ms) per game
#[derive(Debug, Default)]
pub struct ActivityTracker {
    last_active: HashMap<GameId, u64>,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a game active now
    pub fn bump(&mut self, game_id: &GameId) {
        self.bump_at(game_id, unix_millis());
    }

    pub fn bump_at(&mut self, game_id: &GameId, at_millis: u64) {
        self.last_active.insert(game_id.clone(), at_millis);
    }

    pub fn last_active(&self, game_id: &GameId) -> Option<u64> {
        self.last_active.get(game_id).copied()
    }

    /// Games idle for longer than `ttl` as of `now_millis`
    pub fn stale(&self, now_millis: u64, ttl: Duration) -> Vec<GameId> {
        let ttl_millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        self.last_active
            .iter()
            .filter(|(_, at)| now_millis.saturating_sub(**at) > ttl_millis)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn forget(&mut self, game_id: &GameId) {
        self.last_active.remove(game_id);
    }
}
