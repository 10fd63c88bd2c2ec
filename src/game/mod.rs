//! Game domain: actions, state and the reducer

pub mod action;
pub mod reducer;
pub mod state;

pub use action::{ActionError, GameAction, GameId, RelayedAction, RoomId, User, UserId};
pub use reducer::{GameReducer, Reducer};
pub use state::GameState;
