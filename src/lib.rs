//! Real-time game action relay.
//!
//! Clients connect over WebSocket, subscribe to one room at a time and send
//! game actions. Accepted actions are applied to the authoritative state by
//! the reducer and relayed to the game's room and the global observer room.

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod relay;
pub mod store;
pub mod util;
pub mod ws;

use axum::Router;

use crate::app::AppState;
use crate::config::Config;
use crate::game::GameReducer;
use crate::relay::{HubHandle, RelayHub, SweepConfig};
use crate::store::ActionLogError;

/// Open the action log, spawn the relay hub and build the router.
///
/// The hub runs until the router and every connection holding a handle are gone.
pub async fn build_app(config: Config) -> Result<Router, ActionLogError> {
    let action_log = store::action_log::open(&config.action_log).await?;

    let hub = RelayHub::new(Box::new(GameReducer), action_log);
    let (hub_handle, hub_commands) = HubHandle::channel();
    let sweep = SweepConfig {
        ttl: config.game_ttl,
        interval: config.sweep_interval,
    };
    tokio::spawn(hub.run(hub_commands, sweep));

    Ok(http::build_router(AppState::new(config, hub_handle)))
}
