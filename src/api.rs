use async_broadcast::RecvError;
use rocket::http::ContentType;
use rocket::response::status::Custom;
use rocket::response::stream::{Event, EventStream};
use rocket::serde::json::Json;
use rocket::{Build, Rocket, State};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use crate::advancement::{compute_standings, Standings, StandingsRequest};
use crate::classes::normalize_class;
use crate::command::{enqueue_command, Command};
use crate::db::DbPool;
use crate::events::{load_events, EventMetadata};
use crate::ruleset::Ruleset;
use crate::season::{load_season_records, season_stats, SeasonStats};
use crate::snapshot::{load_snapshot, EventSnapshot, SnapshotKind};
use crate::util::{status_any_error, status_not_found, status_sqlx_error};
use crate::AppState;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct QueuedCommand {
    pub id: i64,
    pub action: String,
}

#[post("/api/commands", data = "<command>")]
async fn post_command(command: Json<Command>, db: &State<DbPool>) -> Result<Json<QueuedCommand>, Custom<String>> {
    let id = enqueue_command(&command, &db.0).await.map_err(status_any_error)?;
    Ok(Json(QueuedCommand { id, action: command.action().to_string() }))
}

fn parse_kind(kind: &str) -> Result<SnapshotKind, Custom<String>> {
    kind.parse().map_err(|_| status_not_found(&format!("snapshot {kind}")))
}

async fn snapshot_or_missing(kind: SnapshotKind, pool: &SqlitePool) -> Result<EventSnapshot, Custom<String>> {
    let snapshot = load_snapshot(kind, pool).await.map_err(status_any_error)?;
    Ok(snapshot.unwrap_or_else(|| EventSnapshot::missing(kind)))
}

#[get("/api/snapshot/<kind>")]
async fn get_snapshot(kind: &str, db: &State<DbPool>) -> Result<Json<EventSnapshot>, Custom<String>> {
    let kind = parse_kind(kind)?;
    Ok(Json(snapshot_or_missing(kind, &db.0).await?))
}

async fn standings(kind: &str, request: &StandingsRequest, pool: &SqlitePool, rules: &Ruleset) -> Result<Json<Standings>, Custom<String>> {
    let kind = parse_kind(kind)?;
    let snapshot = snapshot_or_missing(kind, pool).await?;
    let data = &snapshot.data;
    Ok(Json(compute_standings(&data.roster, &data.slots, data.event_type.as_deref(), request, rules)))
}

#[get("/api/snapshot/<kind>/standings?<class_name>&<highlight>")]
async fn get_standings(kind: &str, class_name: Option<String>, highlight: Option<String>, db: &State<DbPool>, state: &State<AppState>) -> Result<Json<Standings>, Custom<String>> {
    let request = StandingsRequest { class_name, highlight, ..Default::default() };
    standings(kind, &request, &db.0, &state.rules).await
}

/// Same as the GET variant, with per-class slot overrides for this one computation.
#[post("/api/snapshot/<kind>/standings", data = "<request>")]
async fn post_standings(kind: &str, request: Json<StandingsRequest>, db: &State<DbPool>, state: &State<AppState>) -> Result<Json<Standings>, Custom<String>> {
    standings(kind, &request, &db.0, &state.rules).await
}

#[get("/api/snapshot/events")]
fn snapshot_events(state: &State<AppState>) -> EventStream![] {
    let mut notices = state.notices_receiver.activate_cloned();
    EventStream! {
        loop {
            let notice = match notices.recv().await {
                Ok(notice) => notice,
                Err(RecvError::Overflowed(skipped)) => {
                    warn!("Slow snapshot subscriber, {skipped} notices skipped");
                    continue;
                }
                Err(e) => {
                    error!("Read snapshot notice error: {e}");
                    break;
                }
            };
            match serde_json::to_string(&notice) {
                Ok(json) => {
                    yield Event::data(json);
                }
                Err(e) => {
                    error!("Serde error: {e}");
                    break;
                }
            }
        }
    }
}

#[get("/api/events")]
async fn get_events(db: &State<DbPool>) -> Result<Json<Vec<EventMetadata>>, Custom<String>> {
    let events = load_events(&db.0).await.map_err(status_sqlx_error)?;
    Ok(Json(events))
}

async fn season_for(class_name: Option<&str>, pool: &SqlitePool, rules: &Ruleset) -> Result<Vec<SeasonStats>, Custom<String>> {
    let class_base = class_name
        .filter(|name| !name.trim().is_empty())
        .map(|name| normalize_class(name, rules));
    let records = load_season_records(class_base.as_deref(), pool).await.map_err(status_sqlx_error)?;
    Ok(season_stats(&records))
}

#[get("/api/season?<class_name>")]
async fn get_season(class_name: Option<&str>, db: &State<DbPool>, state: &State<AppState>) -> Result<Json<Vec<SeasonStats>>, Custom<String>> {
    Ok(Json(season_for(class_name, &db.0, &state.rules).await?))
}

#[derive(Serialize)]
struct SeasonCsvRow<'a> {
    class: &'a str,
    rank: usize,
    competitor: &'a str,
    average: String,
    season_high: String,
    shows: u32,
}

pub fn season_csv(stats: &[SeasonStats]) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    let mut rank = 0;
    let mut prev_class = None;
    for s in stats {
        if prev_class != Some(s.class_base.as_str()) {
            rank = 0;
            prev_class = Some(s.class_base.as_str());
        }
        rank += 1;
        writer.serialize(SeasonCsvRow {
            class: &s.class_base,
            rank,
            competitor: &s.competitor,
            average: format!("{:.3}", s.average),
            season_high: format!("{:.3}", s.season_high),
            shows: s.show_count,
        })?;
    }
    let data = writer.into_inner().map_err(|e| anyhow::anyhow!("CSV flush error: {e}"))?;
    Ok(String::from_utf8(data)?)
}

#[get("/api/season/export?<class_name>")]
async fn export_season(class_name: Option<&str>, db: &State<DbPool>, state: &State<AppState>) -> Result<(ContentType, String), Custom<String>> {
    let stats = season_for(class_name, &db.0, &state.rules).await?;
    let csv = season_csv(&stats).map_err(status_any_error)?;
    Ok((ContentType::CSV, csv))
}

pub fn extend(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket.mount("/", routes![
        post_command,
        get_snapshot,
        get_standings,
        post_standings,
        snapshot_events,
        get_events,
        get_season,
        export_season,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(class_base: &str, competitor: &str, average: f64) -> SeasonStats {
        SeasonStats {
            competitor_id: competitor.to_lowercase(),
            competitor: competitor.to_string(),
            class_base: class_base.to_string(),
            average,
            season_high: average + 1.0,
            show_count: 2,
        }
    }

    #[test]
    fn csv_ranks_restart_per_class() {
        let csv = season_csv(&[
            stats("Independent Open", "Pulse", 80.0),
            stats("Independent Open", "Rhythm, Inc", 75.12345),
            stats("Scholastic A", "Avon HS", 70.0),
        ]).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines, vec![
            "class,rank,competitor,average,season_high,shows",
            "Independent Open,1,Pulse,80.000,81.000,2",
            "Independent Open,2,\"Rhythm, Inc\",75.123,76.123,2",
            "Scholastic A,1,Avon HS,70.000,71.000,2",
        ]);
    }
}
