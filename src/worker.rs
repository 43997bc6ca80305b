use std::sync::Arc;
use std::time::Duration;
use async_broadcast::{Sender, TrySendError};
use rocket::fairing::AdHoc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use crate::command::{claim_command, clear_commands, CommandRecord};
use crate::db::DbPool;
use crate::fetch::HttpFetcher;
use crate::snapshot::{load_snapshot, replace_snapshot, EventSnapshot, SnapshotKind, SnapshotStatus};
use crate::sync::SyncContext;
use crate::AppState;

/// `worker` table of the Rocket configuration.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    pub enabled: bool,
    pub poll_interval_ms: u64,
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
    pub clear_commands_on_start: bool,
    pub calendar_url: String,
    pub scores_index_url: String,
    /// `{show_id}` is replaced with the show id
    pub score_event_url: String,
    pub site_root: String,
}
impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: 2000,
            fetch_timeout_secs: 20,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36".to_string(),
            clear_commands_on_start: true,
            calendar_url: "https://www.wgi.org/color-guard/cg-calendar/".to_string(),
            scores_index_url: "https://www.wgi.org/scores/color-guard-scores/".to_string(),
            score_event_url: "https://www.wgi.org/scores/color-guard-score-event/?ShowId={show_id}".to_string(),
            site_root: "https://www.wgi.org".to_string(),
        }
    }
}

/// Sent to dashboard subscribers after every executed command.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SnapshotNotice {
    pub command_id: i64,
    pub action: String,
    pub kind: SnapshotKind,
    pub status: Option<SnapshotStatus>,
}

pub struct Worker {
    sync: SyncContext,
    notices: Sender<SnapshotNotice>,
}

impl Worker {
    pub fn new(sync: SyncContext, notices: Sender<SnapshotNotice>) -> Self {
        Self { sync, notices }
    }

    fn pool(&self) -> &SqlitePool {
        &self.sync.pool
    }

    pub async fn run(self) {
        let poll_interval = Duration::from_millis(self.sync.cfg.poll_interval_ms);
        if self.sync.cfg.clear_commands_on_start {
            match clear_commands(self.pool()).await {
                Ok(0) => {}
                Ok(n) => info!("Dropped {n} stale commands"),
                Err(e) => error!("Cannot clear stale commands: {e}"),
            }
        }
        info!("Sync worker online, polling every {} ms", poll_interval.as_millis());
        loop {
            match self.poll_once().await {
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(e) => error!("Command queue error: {e}"),
            }
            rocket::tokio::time::sleep(poll_interval).await;
        }
    }

    /// Executes the oldest queued command, if any, and returns its id.
    /// The command leaves the queue before it runs, so it never runs twice.
    pub async fn poll_once(&self) -> Result<Option<i64>, sqlx::Error> {
        let Some(rec) = claim_command(self.pool()).await? else {
            return Ok(None)
        };
        if let Some(notice) = self.execute(&rec).await {
            self.notify(notice);
        }
        Ok(Some(rec.id))
    }

    async fn execute(&self, rec: &CommandRecord) -> Option<SnapshotNotice> {
        let command = match rec.decode() {
            Ok(command) => command,
            Err(e) => {
                warn!("Dropping undecodable command {} ({}): {e}", rec.id, rec.action);
                return None
            }
        };
        info!("Executing command {}: {command}", rec.id);
        let kind = command.snapshot_kind();
        if let Err(e) = self.sync.execute(&command).await {
            error!("Command {} ({command}) failed: {e:?}", rec.id);
            let failed = EventSnapshot::failed(kind, command.event_name(), &e.to_string());
            if let Err(e) = replace_snapshot(&failed, self.pool()).await {
                error!("Cannot store failure of command {}: {e}", rec.id);
            }
        }
        let status = match load_snapshot(kind, self.pool()).await {
            Ok(snapshot) => snapshot.map(|s| s.status),
            Err(e) => {
                error!("Cannot read {kind} snapshot: {e}");
                None
            }
        };
        Some(SnapshotNotice { command_id: rec.id, action: command.action().to_string(), kind, status })
    }

    fn notify(&self, notice: SnapshotNotice) {
        match self.notices.try_broadcast(notice) {
            Ok(_) => {}
            // nobody listening
            Err(TrySendError::Inactive(_)) => {}
            Err(e) => warn!("Snapshot notice not delivered: {e}"),
        }
    }
}

fn worker_config(rocket: &rocket::Rocket<rocket::Orbit>) -> WorkerConfig {
    let figment = rocket.figment();
    if !figment.contains("worker") {
        return WorkerConfig::default()
    }
    figment.extract_inner::<WorkerConfig>("worker").unwrap_or_else(|e| {
        warn!("Invalid worker configuration, using defaults: {e}");
        WorkerConfig::default()
    })
}

/// Spawns the sync worker once the server is up.
pub fn stage() -> AdHoc {
    AdHoc::on_liftoff("Sync worker", |rocket| Box::pin(async move {
        let cfg = worker_config(rocket);
        if !cfg.enabled || cfg!(test) {
            info!("Sync worker disabled");
            return
        }
        let (Some(db), Some(state)) = (rocket.state::<DbPool>(), rocket.state::<AppState>()) else {
            error!("Sync worker not started, database or application state missing");
            return
        };
        let fetcher = match HttpFetcher::new(&cfg) {
            Ok(fetcher) => fetcher,
            Err(e) => {
                error!("Sync worker not started: {e:?}");
                return
            }
        };
        let sync = SyncContext {
            pool: db.0.clone(),
            fetcher: Arc::new(fetcher),
            rules: state.rules.clone(),
            adapters: state.adapters.clone(),
            cfg,
        };
        rocket::tokio::spawn(Worker::new(sync, state.notices.clone()).run());
    }))
}
