use std::fmt::{Display, Formatter};
use std::str::FromStr;
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use crate::datetime::Timestamp;
use crate::impl_sqlx_json_text_type_and_decode;
use crate::roster::{ClassSlotMap, RosterEntry};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotKind {
    Live,
    Archive,
    Projection,
    Discovery,
}
impl FromStr for SnapshotKind {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "live" => Ok(Self::Live),
            "archive" => Ok(Self::Archive),
            "projection" => Ok(Self::Projection),
            "discovery" => Ok(Self::Discovery),
            _ => Err(anyhow!("Unknown snapshot kind: {s}")),
        }
    }
}
impl Display for SnapshotKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotKind::Live => f.write_str("live"),
            SnapshotKind::Archive => f.write_str("archive"),
            SnapshotKind::Projection => f.write_str("projection"),
            SnapshotKind::Discovery => f.write_str("discovery"),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotStatus {
    Loading,
    Complete,
    Failed,
    Empty,
}
impl FromStr for SnapshotStatus {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "loading" => Ok(Self::Loading),
            "complete" => Ok(Self::Complete),
            "failed" => Ok(Self::Failed),
            "empty" => Ok(Self::Empty),
            _ => Err(anyhow!("Unknown snapshot status: {s}")),
        }
    }
}
impl Display for SnapshotStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotStatus::Loading => f.write_str("loading"),
            SnapshotStatus::Complete => f.write_str("complete"),
            SnapshotStatus::Failed => f.write_str("failed"),
            SnapshotStatus::Empty => f.write_str("empty"),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct SnapshotData {
    #[serde(default)]
    pub roster: Vec<RosterEntry>,
    #[serde(default)]
    pub slots: ClassSlotMap,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    /// number of discovered events, discovery only
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}
impl_sqlx_json_text_type_and_decode!(SnapshotData);

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EventSnapshot {
    pub kind: SnapshotKind,
    pub event_name: String,
    pub status: SnapshotStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub data: SnapshotData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<Timestamp>,
}
impl EventSnapshot {
    pub fn new(kind: SnapshotKind, event_name: &str, status: SnapshotStatus, data: SnapshotData) -> Self {
        Self { kind, event_name: event_name.to_string(), status, error: None, data, last_updated: None }
    }
    pub fn failed(kind: SnapshotKind, event_name: &str, error: &str) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(kind, event_name, SnapshotStatus::Failed, SnapshotData::default())
        }
    }
    /// What a reader sees before the first sync of that kind.
    pub fn missing(kind: SnapshotKind) -> Self {
        Self::new(kind, "", SnapshotStatus::Empty, SnapshotData::default())
    }
}

#[derive(FromRow)]
struct SnapshotRecord {
    kind: String,
    event_name: String,
    status: String,
    error: Option<String>,
    data: SnapshotData,
    updated: Timestamp,
}
impl TryFrom<SnapshotRecord> for EventSnapshot {
    type Error = anyhow::Error;
    fn try_from(rec: SnapshotRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            kind: rec.kind.parse()?,
            event_name: rec.event_name,
            status: rec.status.parse()?,
            error: rec.error,
            data: rec.data,
            last_updated: Some(rec.updated),
        })
    }
}

/// Writes the whole snapshot in one statement; readers see the old or the new one, never a mix.
pub async fn replace_snapshot(snapshot: &EventSnapshot, pool: &SqlitePool) -> anyhow::Result<()> {
    let data = serde_json::to_string(&snapshot.data)?;
    sqlx::query("INSERT OR REPLACE INTO snapshots (kind, event_name, status, error, data, updated) VALUES (?, ?, ?, ?, ?, ?)")
        .bind(snapshot.kind.to_string())
        .bind(&snapshot.event_name)
        .bind(snapshot.status.to_string())
        .bind(&snapshot.error)
        .bind(data)
        .bind(Timestamp::now().to_iso_string())
        .execute(pool)
        .await?;
    info!("Snapshot {} replaced, status: {}, entries: {}", snapshot.kind, snapshot.status, snapshot.data.roster.len());
    Ok(())
}

/// Flags a running sync; the stored roster stays as it is.
pub async fn mark_loading(kind: SnapshotKind, event_name: &str, pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO snapshots (kind, event_name, status, error, updated) VALUES (?, ?, ?, NULL, ?)
            ON CONFLICT(kind) DO UPDATE SET event_name=excluded.event_name, status=excluded.status, error=NULL, updated=excluded.updated")
        .bind(kind.to_string())
        .bind(event_name)
        .bind(SnapshotStatus::Loading.to_string())
        .bind(Timestamp::now().to_iso_string())
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn load_snapshot(kind: SnapshotKind, pool: &SqlitePool) -> anyhow::Result<Option<EventSnapshot>> {
    let rec = sqlx::query_as::<_, SnapshotRecord>("SELECT * FROM snapshots WHERE kind=?")
        .bind(kind.to_string())
        .fetch_optional(pool)
        .await?;
    rec.map(EventSnapshot::try_from).transpose()
}
