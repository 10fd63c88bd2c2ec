//! Relay hub - single owner of games, rooms and liveness.
//!
//! Every connection event is funneled through one unbounded channel into
//! [`RelayHub::run`], which handles each command to completion before taking
//! the next. That serializes all read-modify-write on a game and all room
//! changes without locks, and keeps each connection's messages in the order
//! its reader task sent them. No order is imposed across connections.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::game::{GameId, GameState, Reducer, RelayedAction, RoomId, User};
use crate::store::ActionLog;
use crate::util::rate_limit::LogThrottle;
use crate::util::time::unix_millis;
use crate::ws::protocol::ServerMsg;

use super::activity::ActivityTracker;
use super::error::RelayError;
use super::rooms::{ConnectionId, Outbound, RoomRegistry, RoomTransition, GLOBAL_ROOM};
use super::store::GameStore;

/// Lower bound for the sweep timer period
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Commands processed by the hub task
pub enum HubCommand {
    Connect {
        connection: ConnectionId,
        outbound: Outbound,
    },
    Subscribe {
        connection: ConnectionId,
        room: RoomId,
    },
    Action {
        connection: ConnectionId,
        action: RelayedAction,
    },
    Disconnect {
        connection: ConnectionId,
    },
    CreateGame {
        creator: User,
        reply: oneshot::Sender<GameState>,
    },
    GetGame {
        game_id: GameId,
        reply: oneshot::Sender<Option<GameState>>,
    },
    Stats {
        reply: oneshot::Sender<HubStats>,
    },
}

/// Point-in-time hub counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubStats {
    pub games: usize,
    pub connections: usize,
    pub rooms: usize,
}

/// Inactive game eviction settings
#[derive(Debug, Clone, Copy)]
pub struct SweepConfig {
    /// Zero disables eviction
    pub ttl: Duration,
    pub interval: Duration,
}

/// Authoritative relay state
pub struct RelayHub {
    games: GameStore,
    rooms: RoomRegistry,
    activity: ActivityTracker,
    reducer: Box<dyn Reducer>,
    action_log: Arc<dyn ActionLog>,
    missing_game_log: LogThrottle,
}

impl RelayHub {
    pub fn new(reducer: Box<dyn Reducer>, action_log: Arc<dyn ActionLog>) -> Self {
        Self {
            games: GameStore::new(),
            rooms: RoomRegistry::new(),
            activity: ActivityTracker::new(),
            reducer,
            action_log,
            missing_game_log: LogThrottle::default(),
        }
    }

    pub fn connect(&mut self, connection: ConnectionId, outbound: Outbound) {
        self.rooms.connect(connection, outbound);
        debug!(connection = %connection, "Connection registered");
    }

    pub fn disconnect(&mut self, connection: ConnectionId) {
        let room = self.rooms.disconnect(connection);
        debug!(connection = %connection, room = ?room, "Connection removed");
    }

    /// Move a connection into `room`, leaving whatever room it was in
    pub fn subscribe(&mut self, connection: ConnectionId, room: RoomId) -> RoomTransition {
        info!(connection = %connection, room = %room, "subscribe");
        self.rooms.subscribe(connection, room)
    }

    /// Apply an action from `origin` and relay it.
    ///
    /// For a known game: log it, reduce, mark the game active, then relay the
    /// action as received to the game room and the global room except
    /// `origin`. Returns the number of peers reached. Tags the reducer does not
    /// know leave the state unchanged but are still logged and relayed.
    ///
    /// For a missing game only `origin` hears about it (`game-removed`); the
    /// store, log and liveness are left alone.
    pub fn handle_action(
        &mut self,
        origin: ConnectionId,
        action: RelayedAction,
    ) -> Result<usize, RelayError> {
        let game_id = action.game_id().clone();

        let Some(state) = self.games.get(&game_id) else {
            self.rooms
                .send_to(origin, ServerMsg::GameRemoved(game_id.clone()));
            return Err(RelayError::MissingGame(game_id));
        };

        self.action_log.append(&action);

        match action.decode() {
            Some(typed) => {
                let next = self.reducer.reduce(state, &typed);
                self.games.set(game_id.clone(), next);
            }
            None => {
                debug!(game_id = %game_id, action = action.kind(), "Unrecognized action, state unchanged");
            }
        }
        self.activity.bump(&game_id);

        let delivered = self.rooms.broadcast(
            &[game_id.as_str(), GLOBAL_ROOM],
            origin,
            &ServerMsg::GameAction(action),
        );
        Ok(delivered)
    }

    /// Create a pending game with `creator` already joined
    pub fn create_game(&mut self, creator: User) -> GameState {
        let state = GameState::new(GameId::generate(), creator);
        self.insert_game(state.clone());
        info!(game_id = %state.id, "Game created");
        state
    }

    /// Insert a game and mark it active
    pub fn insert_game(&mut self, state: GameState) {
        self.activity.bump(&state.id);
        self.games.insert_new(state);
    }

    pub fn game(&self, game_id: &GameId) -> Option<&GameState> {
        self.games.get(game_id)
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            games: self.games.len(),
            connections: self.rooms.connection_count(),
            rooms: self.rooms.room_count(),
        }
    }

    /// Drop games idle for longer than `ttl`. Rooms are left intact, so
    /// clients still watching learn about it on their next action.
    pub fn evict_inactive(&mut self, now_millis: u64, ttl: Duration) -> Vec<GameId> {
        let stale = self.activity.stale(now_millis, ttl);
        for game_id in &stale {
            self.games.remove(game_id);
            self.activity.forget(game_id);
            info!(game_id = %game_id, "Evicted inactive game");
        }
        stale
    }

    fn dispatch(&mut self, command: HubCommand) {
        match command {
            HubCommand::Connect {
                connection,
                outbound,
            } => self.connect(connection, outbound),
            HubCommand::Subscribe { connection, room } => {
                self.subscribe(connection, room);
            }
            HubCommand::Action { connection, action } => {
                let kind = action.kind().to_string();
                match self.handle_action(connection, action) {
                    Ok(delivered) => {
                        debug!(connection = %connection, action = %kind, delivered, "Action relayed");
                    }
                    Err(e) => self.report_rejected(connection, &e),
                }
            }
            HubCommand::Disconnect { connection } => self.disconnect(connection),
            HubCommand::CreateGame { creator, reply } => {
                let _ = reply.send(self.create_game(creator));
            }
            HubCommand::GetGame { game_id, reply } => {
                let _ = reply.send(self.game(&game_id).cloned());
            }
            HubCommand::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
        }
    }

    /// Clients that keep an expired game open can flood this, hence the throttle
    fn report_rejected(&mut self, connection: ConnectionId, err: &RelayError) {
        if let Some(suppressed) = self.missing_game_log.allow() {
            error!(connection = %connection, suppressed, error = %err, "Rejected game action");
        }
    }

    /// Process commands until every [`HubHandle`] is dropped
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<HubCommand>, sweep: SweepConfig) {
        let evict = !sweep.ttl.is_zero();
        info!(evict, ttl_secs = sweep.ttl.as_secs(), "Relay hub started");

        let mut sweep_timer = interval(sweep.interval.max(MIN_SWEEP_INTERVAL));
        sweep_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.dispatch(command),
                    None => break,
                },
                _ = sweep_timer.tick(), if evict => {
                    self.evict_inactive(unix_millis(), sweep.ttl);
                }
            }
        }

        info!("Relay hub stopped");
    }
}

/// Cloneable sender side of the hub
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::UnboundedSender<HubCommand>,
    next_connection: Arc<AtomicU64>,
}

impl HubHandle {
    /// Create a handle and the receiver to pass to [`RelayHub::run`]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<HubCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            tx,
            next_connection: Arc::new(AtomicU64::new(1)),
        };
        (handle, rx)
    }

    /// Register a new connection and return its ID
    pub fn connect(&self, outbound: Outbound) -> Result<ConnectionId, RelayError> {
        let connection = ConnectionId(self.next_connection.fetch_add(1, Ordering::Relaxed));
        self.send(HubCommand::Connect {
            connection,
            outbound,
        })?;
        Ok(connection)
    }

    pub fn subscribe(&self, connection: ConnectionId, room: RoomId) -> Result<(), RelayError> {
        self.send(HubCommand::Subscribe { connection, room })
    }

    pub fn action(
        &self,
        connection: ConnectionId,
        action: RelayedAction,
    ) -> Result<(), RelayError> {
        self.send(HubCommand::Action { connection, action })
    }

    pub fn disconnect(&self, connection: ConnectionId) -> Result<(), RelayError> {
        self.send(HubCommand::Disconnect { connection })
    }

    pub async fn create_game(&self, creator: User) -> Result<GameState, RelayError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::CreateGame { creator, reply })?;
        rx.await.map_err(|_| RelayError::HubClosed)
    }

    pub async fn game(&self, game_id: GameId) -> Result<Option<GameState>, RelayError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::GetGame { game_id, reply })?;
        rx.await.map_err(|_| RelayError::HubClosed)
    }

    pub async fn stats(&self) -> Result<HubStats, RelayError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::Stats { reply })?;
        rx.await.map_err(|_| RelayError::HubClosed)
    }

    fn send(&self, command: HubCommand) -> Result<(), RelayError> {
        self.tx.send(command).map_err(|_| RelayError::HubClosed)
    }
}
