//! In-memory authoritative game store

use std::collections::HashMap;

use crate::game::{GameId, GameState};

/// Game ID -> current authoritative state.
///
/// Owned by the hub task; every read-modify-write runs to completion before the
/// next command is handled, so no locking is needed.
#[derive(Debug, Default)]
pub struct GameStore {
    games: HashMap<GameId, GameState>,
}

impl GameStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, game_id: &GameId) -> Option<&GameState> {
        self.games.get(game_id)
    }

    /// Replace the state for a game
    pub fn set(&mut self, game_id: GameId, state: GameState) {
        self.games.insert(game_id, state);
    }

    pub fn has(&self, game_id: &GameId) -> bool {
        self.games.contains_key(game_id)
    }

    /// Insert a freshly created game keyed by its own ID
    pub fn insert_new(&mut self, state: GameState) {
        self.games.insert(state.id.clone(), state);
    }

    pub fn remove(&mut self, game_id: &GameId) -> Option<GameState> {
        self.games.remove(game_id)
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::action::fixtures::user;

    #[test]
    fn set_replaces_existing_entry() {
        let mut store = GameStore::new();
        let id = GameId::new("g1");
        store.insert_new(GameState::new(id.clone(), user("u1")));

        let replacement = GameState::new(id.clone(), user("u2"));
        store.set(id.clone(), replacement.clone());

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id), Some(&replacement));
    }

    #[test]
    fn remove_makes_game_missing() {
        let mut store = GameStore::new();
        let id = GameId::new("g1");
        store.insert_new(GameState::new(id.clone(), user("u1")));

        assert!(store.remove(&id).is_some());
        assert!(!store.has(&id));
        assert!(store.is_empty());
    }
}
