use std::fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use crate::datetime::Timestamp;
use crate::snapshot::SnapshotKind;

/// Work item posted by the dashboard and consumed by the sync worker.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    SyncNational,
    SyncLive {
        #[serde(default)]
        #[serde(skip_serializing_if = "Option::is_none")]
        show_id: Option<String>,
        #[serde(default)]
        #[serde(skip_serializing_if = "Option::is_none")]
        prelims_url: Option<String>,
        #[serde(default)]
        #[serde(skip_serializing_if = "Option::is_none")]
        finals_url: Option<String>,
        #[serde(default)]
        #[serde(skip_serializing_if = "Option::is_none")]
        event_name: Option<String>,
        #[serde(default)]
        #[serde(skip_serializing_if = "Option::is_none")]
        event_type: Option<String>,
    },
    SyncArchive {
        show_id: String,
        #[serde(default)]
        #[serde(skip_serializing_if = "Option::is_none")]
        event_name: Option<String>,
    },
    SyncProjection {
        #[serde(default)]
        #[serde(skip_serializing_if = "Option::is_none")]
        show_name: Option<String>,
        #[serde(default)]
        #[serde(skip_serializing_if = "Option::is_none")]
        prelims_url: Option<String>,
        #[serde(default)]
        #[serde(skip_serializing_if = "Option::is_none")]
        finals_url: Option<String>,
        #[serde(default)]
        #[serde(skip_serializing_if = "Option::is_none")]
        event_type: Option<String>,
    },
}

impl Command {
    pub fn action(&self) -> &'static str {
        match self {
            Command::SyncNational => "sync_national",
            Command::SyncLive { .. } => "sync_live",
            Command::SyncArchive { .. } => "sync_archive",
            Command::SyncProjection { .. } => "sync_projection",
        }
    }
    /// Snapshot written by this command.
    pub fn snapshot_kind(&self) -> SnapshotKind {
        match self {
            Command::SyncNational => SnapshotKind::Discovery,
            Command::SyncLive { .. } => SnapshotKind::Live,
            Command::SyncArchive { .. } => SnapshotKind::Archive,
            Command::SyncProjection { .. } => SnapshotKind::Projection,
        }
    }
    pub fn event_name(&self) -> &str {
        let name = match self {
            Command::SyncNational => None,
            Command::SyncLive { event_name, .. } => event_name.as_deref(),
            Command::SyncArchive { event_name, .. } => event_name.as_deref(),
            Command::SyncProjection { show_name, .. } => show_name.as_deref(),
        };
        name.unwrap_or_default()
    }
}
impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.action())
    }
}

/// A queued command as stored, payload not decoded yet.
#[derive(Serialize, Deserialize, FromRow, Clone, Debug)]
pub struct CommandRecord {
    pub id: i64,
    pub action: String,
    pub payload: String,
    pub created: Timestamp,
}
impl CommandRecord {
    pub fn decode(&self) -> Result<Command, serde_json::Error> {
        serde_json::from_str(&self.payload)
    }
}

pub async fn enqueue_command(command: &Command, pool: &SqlitePool) -> anyhow::Result<i64> {
    let payload = serde_json::to_string(command)?;
    let id: (i64, ) = sqlx::query_as("INSERT INTO commands (action, payload, created) VALUES (?, ?, ?) RETURNING id")
        .bind(command.action())
        .bind(payload)
        .bind(Timestamp::now().to_iso_string())
        .fetch_one(pool)
        .await?;
    info!("Command {command} queued, id: {}", id.0);
    Ok(id.0)
}

/// Removes the oldest queued command and returns it; a claimed command is never seen again.
pub async fn claim_command(pool: &SqlitePool) -> Result<Option<CommandRecord>, sqlx::Error> {
    sqlx::query_as::<_, CommandRecord>("DELETE FROM commands WHERE id=(SELECT MIN(id) FROM commands) RETURNING *")
        .fetch_optional(pool)
        .await
}

#[cfg(test)]
pub async fn pending_commands(pool: &SqlitePool) -> Result<Vec<CommandRecord>, sqlx::Error> {
    sqlx::query_as::<_, CommandRecord>("SELECT * FROM commands ORDER BY id")
        .fetch_all(pool)
        .await
}

pub async fn clear_commands(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let res = sqlx::query("DELETE FROM commands").execute(pool).await?;
    Ok(res.rows_affected())
}
