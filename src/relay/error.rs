//! Relay errors

use crate::game::GameId;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("Received message for missing game {0}")]
    MissingGame(GameId),

    #[error("Relay hub is not running")]
    HubClosed,
}
