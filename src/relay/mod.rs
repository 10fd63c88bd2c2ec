//! Room relay: membership, authoritative game state and fan-out

pub mod activity;
pub mod error;
pub mod hub;
pub mod rooms;
pub mod store;

pub use error::RelayError;
pub use hub::{HubHandle, HubStats, RelayHub, SweepConfig};
pub use rooms::{ConnectionId, GLOBAL_ROOM};
