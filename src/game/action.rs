//! Game actions - the unit of synchronization between clients

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

/// Opaque game session identifier (also used as a room name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random game ID
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for GameId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Rooms share the game ID namespace
pub type RoomId = GameId;

/// Opaque participant identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
}

/// Payload for actions addressed to one player of one game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRef {
    pub game_id: GameId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinPayload {
    pub game_id: GameId,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropPayload {
    pub game_id: GameId,
    pub user_id: UserId,
    /// Rows cleared by this drop
    pub rows: u32,
}

/// State-changing operation understood by the reducer.
///
/// Wire form is `{"type": "MOVE_LEFT", "payload": {"gameId": ..., "userId": ...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameAction {
    JoinGame(JoinPayload),
    PlayerReady(PlayerRef),
    MoveLeft(PlayerRef),
    MoveRight(PlayerRef),
    Rotate(PlayerRef),
    Drop(DropPayload),
    EnableAcceleration(PlayerRef),
    DisableAcceleration(PlayerRef),
    AppendPendingBlocks(PlayerRef),
}

impl GameAction {
    /// Game this action targets
    pub fn game_id(&self) -> &GameId {
        match self {
            Self::JoinGame(p) => &p.game_id,
            Self::Drop(p) => &p.game_id,
            Self::PlayerReady(p)
            | Self::MoveLeft(p)
            | Self::MoveRight(p)
            | Self::Rotate(p)
            | Self::EnableAcceleration(p)
            | Self::DisableAcceleration(p)
            | Self::AppendPendingBlocks(p) => &p.game_id,
        }
    }

    /// Acting user
    pub fn user_id(&self) -> &UserId {
        match self {
            Self::JoinGame(p) => &p.user.id,
            Self::Drop(p) => &p.user_id,
            Self::PlayerReady(p)
            | Self::MoveLeft(p)
            | Self::MoveRight(p)
            | Self::Rotate(p)
            | Self::EnableAcceleration(p)
            | Self::DisableAcceleration(p)
            | Self::AppendPendingBlocks(p) => &p.user_id,
        }
    }

    /// Wire tag, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JoinGame(_) => "JOIN_GAME",
            Self::PlayerReady(_) => "PLAYER_READY",
            Self::MoveLeft(_) => "MOVE_LEFT",
            Self::MoveRight(_) => "MOVE_RIGHT",
            Self::Rotate(_) => "ROTATE",
            Self::Drop(_) => "DROP",
            Self::EnableAcceleration(_) => "ENABLE_ACCELERATION",
            Self::DisableAcceleration(_) => "DISABLE_ACCELERATION",
            Self::AppendPendingBlocks(_) => "APPEND_PENDING_BLOCKS",
        }
    }
}

/// Why a client frame is not a routable action
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("action has no string `type`")]
    MissingType,

    #[error("action payload has no string `gameId`")]
    MissingGameId,
}

/// An action exactly as a client sent it.
///
/// Routing only needs `type` and `payload.gameId`; everything else is kept
/// untouched so peers and the action log see the frame the sender built,
/// including fields and tags this server does not know about.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayedAction {
    game_id: GameId,
    raw: Value,
}

impl RelayedAction {
    pub fn from_value(raw: Value) -> Result<Self, ActionError> {
        if !raw["type"].is_string() {
            return Err(ActionError::MissingType);
        }
        let game_id = raw["payload"]["gameId"]
            .as_str()
            .map(GameId::new)
            .ok_or(ActionError::MissingGameId)?;

        Ok(Self { game_id, raw })
    }

    pub fn game_id(&self) -> &GameId {
        &self.game_id
    }

    /// Wire tag as sent
    pub fn kind(&self) -> &str {
        self.raw["type"].as_str().unwrap_or_default()
    }

    /// Acting user, when the payload names one
    pub fn user_id(&self) -> Option<UserId> {
        let payload = &self.raw["payload"];
        payload["userId"]
            .as_str()
            .or_else(|| payload["user"]["id"].as_str())
            .map(UserId::new)
    }

    /// Typed form for the reducer; `None` for tags or shapes it does not know
    pub fn decode(&self) -> Option<GameAction> {
        GameAction::deserialize(&self.raw).ok()
    }

    pub fn as_value(&self) -> &Value {
        &self.raw
    }
}

impl Serialize for RelayedAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RelayedAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Self::from_value(raw).map_err(serde::de::Error::custom)
    }
}

/// Shorthand constructors used across tests
#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn player(game: &str, user: &str) -> PlayerRef {
        PlayerRef {
            game_id: GameId::new(game),
            user_id: UserId::new(user),
        }
    }

    pub fn user(id: &str) -> User {
        User {
            id: UserId::new(id),
            name: format!("Player {id}"),
        }
    }

    pub fn join(game: &str, id: &str) -> GameAction {
        GameAction::JoinGame(JoinPayload {
            game_id: GameId::new(game),
            user: user(id),
        })
    }

    pub fn drop_rows(game: &str, id: &str, rows: u32) -> GameAction {
        GameAction::Drop(DropPayload {
            game_id: GameId::new(game),
            user_id: UserId::new(id),
            rows,
        })
    }

    /// Wire form of a typed action, as a client would send it
    pub fn relayed(action: GameAction) -> RelayedAction {
        RelayedAction::from_value(serde_json::to_value(action).unwrap()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn decodes_player_action_from_wire_shape() {
        let json = r#"{"type":"MOVE_LEFT","payload":{"gameId":"g1","userId":"u1"}}"#;
        let action: GameAction = serde_json::from_str(json).unwrap();

        assert_eq!(action, GameAction::MoveLeft(player("g1", "u1")));
        assert_eq!(action.game_id().as_str(), "g1");
        assert_eq!(action.user_id().as_str(), "u1");
    }

    #[test]
    fn join_uses_embedded_user_id() {
        let json = r#"{"type":"JOIN_GAME","payload":{"gameId":"g1","user":{"id":"u7","name":"Ada"}}}"#;
        let action: GameAction = serde_json::from_str(json).unwrap();

        assert_eq!(action.kind(), "JOIN_GAME");
        assert_eq!(action.user_id().as_str(), "u7");
    }

    #[test]
    fn drop_carries_row_count() {
        let value = serde_json::to_value(drop_rows("g1", "u1", 3)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "type": "DROP",
                "payload": {"gameId": "g1", "userId": "u1", "rows": 3}
            })
        );
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let json = r#"{"type":"TELEPORT","payload":{"gameId":"g1","userId":"u1"}}"#;
        assert!(serde_json::from_str::<GameAction>(json).is_err());
    }

    #[test]
    fn multi_word_tags_use_screaming_snake_case() {
        let action = GameAction::AppendPendingBlocks(player("g1", "u1"));
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["type"], "APPEND_PENDING_BLOCKS");
    }

    #[test]
    fn relayed_action_keeps_extra_fields() {
        let raw = serde_json::json!({
            "type": "MOVE_LEFT",
            "payload": {"gameId": "g1", "userId": "u1", "seq": 7},
            "sentAt": 1700000000000u64
        });
        let action: RelayedAction = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(serde_json::to_value(&action).unwrap(), raw);
        assert_eq!(action.decode(), Some(GameAction::MoveLeft(player("g1", "u1"))));
    }

    #[test]
    fn relayed_action_accepts_unknown_tag() {
        let raw = serde_json::json!({"type": "TELEPORT", "payload": {"gameId": "g1", "userId": "u1"}});
        let action = RelayedAction::from_value(raw).unwrap();

        assert_eq!(action.game_id().as_str(), "g1");
        assert_eq!(action.kind(), "TELEPORT");
        assert_eq!(action.user_id(), Some(UserId::new("u1")));
        assert_eq!(action.decode(), None);
    }

    #[test]
    fn relayed_action_reads_join_user() {
        let action = relayed(join("g1", "u7"));
        assert_eq!(action.user_id(), Some(UserId::new("u7")));
    }

    #[test]
    fn relayed_action_needs_routing_fields() {
        let no_game = serde_json::json!({"type": "ROTATE", "payload": {"userId": "u1"}});
        assert_eq!(
            RelayedAction::from_value(no_game),
            Err(ActionError::MissingGameId)
        );

        let no_type = serde_json::json!({"payload": {"gameId": "g1"}});
        assert_eq!(RelayedAction::from_value(no_type), Err(ActionError::MissingType));
    }

    #[test]
    fn generated_ids_are_distinct() {
        assert_ne!(GameId::generate(), GameId::generate());
    }
}
