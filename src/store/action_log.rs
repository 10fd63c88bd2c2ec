//! Append-only action log.
//!
//! Appends are fire-and-forget: the relay never waits for a write, so an
//! action can reach peers and still be lost from the log if the process dies
//! before the write lands. Failed writes are logged and dropped.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{info, trace, warn};

use crate::config::ActionLogConfig;
use crate::game::{GameId, RelayedAction, UserId};

use super::supabase::SupabaseClient;

/// Supabase table receiving action records
pub const ACTIONS_TABLE: &str = "game_actions";

/// Sink for accepted actions
pub trait ActionLog: Send + Sync {
    /// Record an action. Must return without waiting on I/O.
    fn append(&self, action: &RelayedAction);
}

/// One persisted action
#[derive(Debug, Clone, Serialize)]
pub struct ActionRecord {
    pub game_id: GameId,
    pub user_id: Option<UserId>,
    pub action_type: String,
    /// Frame as received from the client
    pub action: RelayedAction,
    pub logged_at: DateTime<Utc>,
}

impl ActionRecord {
    pub fn new(action: &RelayedAction) -> Self {
        Self {
            game_id: action.game_id().clone(),
            user_id: action.user_id(),
            action_type: action.kind().to_string(),
            action: action.clone(),
            logged_at: Utc::now(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ActionLogError {
    #[error("Failed to open action log {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Build the configured sink
pub async fn open(config: &ActionLogConfig) -> Result<Arc<dyn ActionLog>, ActionLogError> {
    match config {
        ActionLogConfig::Disabled => {
            info!("Action log disabled");
            Ok(Arc::new(DisabledActionLog))
        }
        ActionLogConfig::File(path) => {
            info!(path = %path.display(), "Action log writing to file");
            Ok(Arc::new(FileActionLog::open(path).await?))
        }
        ActionLogConfig::Supabase {
            url,
            service_role_key,
        } => {
            info!(table = ACTIONS_TABLE, "Action log writing to Supabase");
            Ok(Arc::new(SupabaseActionLog::new(SupabaseClient::new(
                url,
                service_role_key,
            ))))
        }
    }
}

/// Discards every action
pub struct DisabledActionLog;

impl ActionLog for DisabledActionLog {
    fn append(&self, action: &RelayedAction) {
        trace!(game_id = %action.game_id(), action = action.kind(), "Action not persisted");
    }
}

/// JSON-lines file, written by a dedicated task
pub struct FileActionLog {
    tx: mpsc::UnboundedSender<ActionRecord>,
}

impl FileActionLog {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, ActionLogError> {
        let path = path.as_ref().to_path_buf();
        let open_err = |source| ActionLogError::Open {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(open_err)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(open_err)?;

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(write_records(file, rx, path));

        Ok(Self { tx })
    }
}

impl ActionLog for FileActionLog {
    fn append(&self, action: &RelayedAction) {
        if self.tx.send(ActionRecord::new(action)).is_err() {
            warn!(game_id = %action.game_id(), "Action log writer stopped, dropping action");
        }
    }
}

async fn write_records(
    mut file: File,
    mut rx: mpsc::UnboundedReceiver<ActionRecord>,
    path: PathBuf,
) {
    while let Some(record) = rx.recv().await {
        let mut line = match serde_json::to_vec(&record) {
            Ok(line) => line,
            Err(e) => {
                warn!(game_id = %record.game_id, error = %e, "Failed to encode action record");
                continue;
            }
        };
        line.push(b'\n');

        let written = async {
            file.write_all(&line).await?;
            file.flush().await
        };
        if let Err(e) = written.await {
            warn!(path = %path.display(), game_id = %record.game_id, error = %e, "Failed to append action");
        }
    }
}

/// PostgREST insert per action, each on its own detached task
pub struct SupabaseActionLog {
    client: SupabaseClient,
}

impl SupabaseActionLog {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

impl ActionLog for SupabaseActionLog {
    fn append(&self, action: &RelayedAction) {
        let client = self.client.clone();
        let record = ActionRecord::new(action);

        tokio::spawn(async move {
            if let Err(e) = client.insert(ACTIONS_TABLE, &record).await {
                warn!(game_id = %record.game_id, error = %e, "Failed to persist action");
            }
        });
    }
}

/// Captures appended actions for assertions
#[cfg(test)]
#[derive(Default)]
pub struct MemoryActionLog {
    actions: std::sync::Mutex<Vec<RelayedAction>>,
}

#[cfg(test)]
impl MemoryActionLog {
    pub fn actions(&self) -> Vec<RelayedAction> {
        self.actions.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl ActionLog for MemoryActionLog {
    fn append(&self, action: &RelayedAction) {
        self.actions.lock().unwrap().push(action.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::action::fixtures::{drop_rows, player, relayed};
    use crate::game::GameAction;
    use std::time::Duration;

    #[test]
    fn record_captures_routing_fields() {
        let record = ActionRecord::new(&relayed(drop_rows("g1", "u1", 2)));

        assert_eq!(record.game_id.as_str(), "g1");
        assert_eq!(record.user_id, Some(UserId::new("u1")));
        assert_eq!(record.action_type, "DROP");
    }

    #[test]
    fn record_keeps_unknown_frames_whole() {
        let raw = serde_json::json!({"type": "EMOTE", "payload": {"gameId": "g1", "emoji": "wave"}});
        let record = ActionRecord::new(&RelayedAction::from_value(raw.clone()).unwrap());

        assert_eq!(record.user_id, None);
        assert_eq!(record.action_type, "EMOTE");
        assert_eq!(serde_json::to_value(&record).unwrap()["action"], raw);
    }

    #[tokio::test]
    async fn file_log_appends_json_lines() {
        let path = std::env::temp_dir()
            .join(format!("relay-test-{}", uuid::Uuid::new_v4()))
            .join("actions.jsonl");
        let log = tokio_test::assert_ok!(FileActionLog::open(&path).await);

        log.append(&relayed(GameAction::Rotate(player("g1", "u1"))));
        log.append(&relayed(drop_rows("g1", "u1", 1)));

        let mut lines = Vec::new();
        for _ in 0..100 {
            let contents = tokio::fs::read_to_string(&path).await.unwrap_or_default();
            lines = contents.lines().map(str::to_owned).collect::<Vec<_>>();
            if lines.len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first["action_type"], "ROTATE");
        assert_eq!(first["action"]["payload"]["gameId"], "g1");

        let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    }

    #[tokio::test]
    async fn open_disabled_sink() {
        let log = tokio_test::assert_ok!(open(&ActionLogConfig::Disabled).await);
        log.append(&relayed(GameAction::Rotate(player("g1", "u1"))));
    }
}
