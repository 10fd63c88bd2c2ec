//! Game reducer - pure `(state, action) -> state` transitions

use super::action::{GameAction, UserId};
use super::state::{GameState, GameStatus, PlayerState, SPAWN_COL, WELL_COLS};

/// Pure, deterministic state transition applied by the relay for every accepted action.
pub trait Reducer: Send + 'static {
    fn reduce(&self, state: &GameState, action: &GameAction) -> GameState;
}

/// Default block-stacking rules
#[derive(Debug, Clone, Copy, Default)]
pub struct GameReducer;

impl Reducer for GameReducer {
    fn reduce(&self, state: &GameState, action: &GameAction) -> GameState {
        let mut next = state.clone();

        // Actions for another game never touch this one
        if action.game_id() != &state.id {
            return next;
        }

        match action {
            GameAction::JoinGame(p) => {
                if next.status == GameStatus::Pending
                    && !next.is_full()
                    && !next.has_player(&p.user.id)
                {
                    next.players.push(PlayerState::new(p.user.clone()));
                }
            }
            GameAction::PlayerReady(p) => {
                if let Some(player) = player_mut(&mut next, &p.user_id) {
                    player.ready = true;
                }
                if next.status == GameStatus::Pending && next.players.iter().all(|p| p.ready) {
                    next.status = GameStatus::Playing;
                }
            }
            GameAction::MoveLeft(p) => {
                if let Some(player) = playing_player_mut(&mut next, &p.user_id) {
                    player.column = (player.column - 1).max(0);
                }
            }
            GameAction::MoveRight(p) => {
                if let Some(player) = playing_player_mut(&mut next, &p.user_id) {
                    player.column = (player.column + 1).min(WELL_COLS - 1);
                }
            }
            GameAction::Rotate(p) => {
                if let Some(player) = playing_player_mut(&mut next, &p.user_id) {
                    player.rotation = (player.rotation + 1) % 4;
                }
            }
            GameAction::Drop(p) => {
                let Some(player) = playing_player_mut(&mut next, &p.user_id) else {
                    return next;
                };
                // Row counts come from the client, so counters saturate
                player.drops = player.drops.saturating_add(1);
                player.lines_cleared = player.lines_cleared.saturating_add(p.rows);
                player.score = player.score.saturating_add(p.rows);
                player.column = SPAWN_COL;
                player.rotation = 0;

                // Cleared rows are sent to every opponent
                for opponent in next.players.iter_mut().filter(|o| o.user.id != p.user_id) {
                    opponent.pending_rows = opponent.pending_rows.saturating_add(p.rows);
                }
            }
            GameAction::EnableAcceleration(p) => {
                if let Some(player) = playing_player_mut(&mut next, &p.user_id) {
                    player.accelerating = true;
                }
            }
            GameAction::DisableAcceleration(p) => {
                if let Some(player) = playing_player_mut(&mut next, &p.user_id) {
                    player.accelerating = false;
                }
            }
            GameAction::AppendPendingBlocks(p) => {
                if let Some(player) = playing_player_mut(&mut next, &p.user_id) {
                    player.garbage_rows = player.garbage_rows.saturating_add(player.pending_rows);
                    player.pending_rows = 0;
                }
            }
        }

        next
    }
}

fn player_mut<'a>(state: &'a mut GameState, user_id: &UserId) -> Option<&'a mut PlayerState> {
    state.players.iter_mut().find(|p| &p.user.id == user_id)
}

/// Gameplay actions only apply while the game is running
fn playing_player_mut<'a>(
    state: &'a mut GameState,
    user_id: &UserId,
) -> Option<&'a mut PlayerState> {
    if state.status != GameStatus::Playing {
        return None;
    }
    player_mut(state, user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::action::fixtures::*;
    use crate::game::action::GameId;

    fn apply(state: GameState, actions: &[GameAction]) -> GameState {
        actions
            .iter()
            .fold(state, |s, a| GameReducer.reduce(&s, a))
    }

    fn running_game() -> GameState {
        apply(
            GameState::new(GameId::new("g1"), user("u1")),
            &[
                join("g1", "u2"),
                GameAction::PlayerReady(player("g1", "u1")),
                GameAction::PlayerReady(player("g1", "u2")),
            ],
        )
    }

    #[test]
    fn join_adds_player_once() {
        let state = apply(
            GameState::new(GameId::new("g1"), user("u1")),
            &[join("g1", "u2"), join("g1", "u2")],
        );
        assert_eq!(state.players.len(), 2);
    }

    #[test]
    fn join_rejected_when_full() {
        let state = apply(
            GameState::new(GameId::new("g1"), user("u1")),
            &[join("g1", "u2"), join("g1", "u3")],
        );
        assert!(!state.has_player(&UserId::new("u3")));
    }

    #[test]
    fn game_starts_when_everyone_ready() {
        let state = apply(
            GameState::new(GameId::new("g1"), user("u1")),
            &[join("g1", "u2"), GameAction::PlayerReady(player("g1", "u1"))],
        );
        assert_eq!(state.status, GameStatus::Pending);

        assert_eq!(running_game().status, GameStatus::Playing);
    }

    #[test]
    fn moves_are_ignored_before_start() {
        let initial = GameState::new(GameId::new("g1"), user("u1"));
        let state = GameReducer.reduce(&initial, &GameAction::MoveLeft(player("g1", "u1")));
        assert_eq!(state, initial);
    }

    #[test]
    fn moves_clamp_to_well() {
        let lefts: Vec<_> = (0..20)
            .map(|_| GameAction::MoveLeft(player("g1", "u1")))
            .collect();
        let state = apply(running_game(), &lefts);
        assert_eq!(state.player(&UserId::new("u1")).unwrap().column, 0);

        let rights: Vec<_> = (0..20)
            .map(|_| GameAction::MoveRight(player("g1", "u1")))
            .collect();
        let state = apply(state, &rights);
        assert_eq!(state.player(&UserId::new("u1")).unwrap().column, WELL_COLS - 1);
    }

    #[test]
    fn rotation_wraps() {
        let rotations: Vec<_> = (0..5)
            .map(|_| GameAction::Rotate(player("g1", "u2")))
            .collect();
        let state = apply(running_game(), &rotations);
        assert_eq!(state.player(&UserId::new("u2")).unwrap().rotation, 1);
    }

    #[test]
    fn drop_scores_and_sends_rows_to_opponent() {
        let state = apply(
            running_game(),
            &[
                GameAction::Rotate(player("g1", "u1")),
                drop_rows("g1", "u1", 2),
                GameAction::AppendPendingBlocks(player("g1", "u2")),
            ],
        );

        let dropper = state.player(&UserId::new("u1")).unwrap();
        assert_eq!(dropper.drops, 1);
        assert_eq!(dropper.score, 2);
        assert_eq!(dropper.rotation, 0);
        assert_eq!(dropper.column, SPAWN_COL);

        let opponent = state.player(&UserId::new("u2")).unwrap();
        assert_eq!(opponent.pending_rows, 0);
        assert_eq!(opponent.garbage_rows, 2);
    }

    #[test]
    fn oversized_drops_saturate_counters() {
        let state = apply(
            running_game(),
            &[
                drop_rows("g1", "u1", u32::MAX),
                drop_rows("g1", "u1", u32::MAX),
                GameAction::AppendPendingBlocks(player("g1", "u2")),
                drop_rows("g1", "u1", 1),
                GameAction::AppendPendingBlocks(player("g1", "u2")),
            ],
        );

        let dropper = state.player(&UserId::new("u1")).unwrap();
        assert_eq!(dropper.drops, 3);
        assert_eq!(dropper.lines_cleared, u32::MAX);
        assert_eq!(dropper.score, u32::MAX);

        let opponent = state.player(&UserId::new("u2")).unwrap();
        assert_eq!(opponent.pending_rows, 0);
        assert_eq!(opponent.garbage_rows, u32::MAX);
    }

    #[test]
    fn acceleration_toggles() {
        let state = apply(
            running_game(),
            &[GameAction::EnableAcceleration(player("g1", "u1"))],
        );
        assert!(state.player(&UserId::new("u1")).unwrap().accelerating);

        let state = apply(state, &[GameAction::DisableAcceleration(player("g1", "u1"))]);
        assert!(!state.player(&UserId::new("u1")).unwrap().accelerating);
    }

    #[test]
    fn unknown_user_and_foreign_game_are_no_ops() {
        let state = running_game();
        assert_eq!(
            GameReducer.reduce(&state, &GameAction::Rotate(player("g1", "nobody"))),
            state
        );
        assert_eq!(
            GameReducer.reduce(&state, &GameAction::Rotate(player("g2", "u1"))),
            state
        );
    }

    #[test]
    fn reduce_does_not_mutate_input() {
        let state = running_game();
        let before = state.clone();
        let _ = GameReducer.reduce(&state, &drop_rows("g1", "u1", 4));
        assert_eq!(state, before);
    }
}
