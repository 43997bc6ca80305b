use std::sync::Arc;
use indexmap::IndexMap;
use itertools::Itertools;
use scraper::Html;
use sqlx::SqlitePool;
use crate::adapters::links::{event_detail_links, schedule_links, show_links};
use crate::adapters::{Adapters, Document, DocumentError, DocumentKind, SourceAdapter};
use crate::advancement::annotate_roster;
use crate::command::Command;
use crate::events::{replace_events, EventMetadata};
use crate::fetch::DocumentFetcher;
use crate::roster::{count_slots, ClassSlotMap, Roster, ScheduleRow, ScoreRow};
use crate::ruleset::Ruleset;
use crate::season::{load_season_records, replace_season_records, season_stats, SeasonLedger};
use crate::snapshot::{mark_loading, replace_snapshot, EventSnapshot, SnapshotData, SnapshotKind, SnapshotStatus};
use crate::worker::WorkerConfig;

pub const NO_PRELIMS_URL: &str = "No prelims schedule URL given.";
pub const NO_COMPETITORS: &str = "No competitors found in the prelims schedule. Is the schedule posted yet?";
pub const NO_EVENTS: &str = "No events found";

fn parse_document(url: &str, data: &[u8]) -> Result<Document, DocumentError> {
    Document::parse(DocumentKind::detect(url, data), data)
}

fn schedule_rows(adapters: &Adapters, url: &str, data: &[u8]) -> Result<Vec<ScheduleRow>, DocumentError> {
    let doc = parse_document(url, data)?;
    let rows: Vec<ScheduleRow> = match doc.kind() {
        DocumentKind::Html => adapters.html_schedule.records(&doc)?.collect(),
        DocumentKind::Pdf => adapters.pdf_schedule.records(&doc)?.collect(),
    };
    Ok(rows)
}

/// One class label per finals performance.
fn finals_labels(adapters: &Adapters, url: &str, data: &[u8]) -> Result<Vec<String>, DocumentError> {
    let doc = parse_document(url, data)?;
    let labels: Vec<String> = match doc.kind() {
        DocumentKind::Html => adapters.html_finals.records(&doc)?.collect(),
        DocumentKind::Pdf => adapters.pdf_finals.records(&doc)?.collect(),
    };
    Ok(labels)
}

fn score_rows(adapters: &Adapters, url: &str, data: &[u8]) -> Result<Vec<ScoreRow>, DocumentError> {
    let doc = parse_document(url, data)?;
    let rows: Vec<ScoreRow> = adapters.score_table.records(&doc)?.collect();
    Ok(rows)
}

fn scan_html<T>(data: &[u8], scan: impl FnOnce(&Html) -> T) -> Result<T, DocumentError> {
    let doc = Document::parse(DocumentKind::Html, data)?;
    Ok(scan(doc.html("link scanner")?))
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// Everything a sync job needs; cheap to clone.
#[derive(Clone)]
pub struct SyncContext {
    pub pool: SqlitePool,
    pub fetcher: Arc<dyn DocumentFetcher>,
    pub rules: Arc<Ruleset>,
    pub adapters: Arc<Adapters>,
    pub cfg: WorkerConfig,
}

impl SyncContext {
    pub async fn execute(&self, command: &Command) -> anyhow::Result<()> {
        match command {
            Command::SyncNational => self.sync_national().await,
            Command::SyncLive { show_id, prelims_url, finals_url, event_name, event_type } => {
                self.sync_live(show_id.as_deref(), prelims_url.as_deref(), finals_url.as_deref(), event_name.as_deref(), event_type.as_deref()).await
            }
            Command::SyncArchive { show_id, event_name } => {
                self.sync_archive(show_id, event_name.as_deref()).await
            }
            Command::SyncProjection { show_name, prelims_url, finals_url, event_type } => {
                self.sync_projection(show_name.as_deref(), prelims_url.as_deref(), finals_url.as_deref(), event_type.as_deref()).await
            }
        }
    }

    /// Fetches `url` and runs `parse` over it. A failed fetch or an unreadable document
    /// abandons the pass with a single warning.
    async fn load<T>(&self, url: &str, parse: impl FnOnce(&[u8]) -> Result<T, DocumentError>) -> Option<T> {
        let data = match self.fetcher.fetch(url).await {
            Ok(data) => data,
            Err(e) => {
                warn!("Skipping pass, {e}");
                return None
            }
        };
        match parse(&data) {
            Ok(records) => Some(records),
            Err(e) => {
                warn!("Skipping pass, {url}: {e}");
                None
            }
        }
    }

    fn score_url(&self, show_id: &str) -> String {
        self.cfg.score_event_url.replace("{show_id}", show_id.trim())
    }

    async fn load_schedule(&self, url: &str, roster: &mut Roster) {
        if let Some(rows) = self.load(url, |data| schedule_rows(&self.adapters, url, data)).await {
            debug!("{} schedule rows from {url}", rows.len());
            for row in &rows {
                roster.merge_schedule(row, &self.rules);
            }
        }
    }

    async fn load_slots(&self, url: &str) -> ClassSlotMap {
        match self.load(url, |data| finals_labels(&self.adapters, url, data)).await {
            Some(labels) => count_slots(labels.iter().map(String::as_str), &self.rules),
            None => ClassSlotMap::new(),
        }
    }

    async fn load_scores(&self, show_id: &str) -> Option<Vec<ScoreRow>> {
        let url = self.score_url(show_id);
        self.load(&url, |data| score_rows(&self.adapters, &url, data)).await
    }

    fn event_type(&self, event_type: Option<&str>, event_name: &str) -> Option<String> {
        non_empty(event_type)
            .map(String::from)
            .or_else(|| self.rules.event_type_for_name(event_name))
    }

    pub async fn sync_live(&self, show_id: Option<&str>, prelims_url: Option<&str>, finals_url: Option<&str>, event_name: Option<&str>, event_type: Option<&str>) -> anyhow::Result<()> {
        let event_name = event_name.unwrap_or_default();
        mark_loading(SnapshotKind::Live, event_name, &self.pool).await?;

        let mut roster = Roster::new();
        if let Some(url) = non_empty(prelims_url) {
            self.load_schedule(url, &mut roster).await;
        }
        let slots = match non_empty(finals_url) {
            Some(url) => self.load_slots(url).await,
            None => ClassSlotMap::new(),
        };
        if let Some(show_id) = non_empty(show_id) {
            if let Some(rows) = self.load_scores(show_id).await {
                for row in &rows {
                    roster.merge_score(row, &self.rules);
                }
            }
        }

        let status = if roster.is_empty() { SnapshotStatus::Empty } else { SnapshotStatus::Complete };
        let event_type = self.event_type(event_type, event_name);
        let entries = annotate_roster(roster.into_entries(), &slots, event_type.as_deref(), &self.rules);
        info!("Live sync of '{event_name}': {} competitors, {} classes with slots", entries.len(), slots.len());
        let data = SnapshotData { roster: entries, slots, event_type, count: None };
        replace_snapshot(&EventSnapshot::new(SnapshotKind::Live, event_name, status, data), &self.pool).await
    }

    pub async fn sync_archive(&self, show_id: &str, event_name: Option<&str>) -> anyhow::Result<()> {
        let event_name = event_name.unwrap_or_default();
        mark_loading(SnapshotKind::Archive, event_name, &self.pool).await?;

        let mut roster = Roster::new();
        if let Some(rows) = self.load_scores(show_id).await {
            for row in &rows {
                roster.merge_score(row, &self.rules);
            }
        }
        let status = if roster.is_empty() { SnapshotStatus::Empty } else { SnapshotStatus::Complete };
        let mut entries = roster.into_entries();
        entries.sort_by(|a, b| a.class_base.cmp(&b.class_base)
            .then(b.best_score().total_cmp(&a.best_score())));
        info!("Archive sync of '{event_name}' (show {show_id}): {} scores", entries.len());
        let data = SnapshotData { roster: entries, ..Default::default() };
        replace_snapshot(&EventSnapshot::new(SnapshotKind::Archive, event_name, status, data), &self.pool).await
    }

    pub async fn sync_projection(&self, show_name: Option<&str>, prelims_url: Option<&str>, finals_url: Option<&str>, event_type: Option<&str>) -> anyhow::Result<()> {
        let show_name = show_name.unwrap_or_default();
        mark_loading(SnapshotKind::Projection, show_name, &self.pool).await?;

        let Some(prelims_url) = non_empty(prelims_url) else {
            return replace_snapshot(&EventSnapshot::failed(SnapshotKind::Projection, show_name, NO_PRELIMS_URL), &self.pool).await
        };
        let mut roster = Roster::new();
        self.load_schedule(prelims_url, &mut roster).await;
        if roster.is_empty() {
            return replace_snapshot(&EventSnapshot::failed(SnapshotKind::Projection, show_name, NO_COMPETITORS), &self.pool).await
        }
        let slots = match non_empty(finals_url) {
            Some(url) => self.load_slots(url).await,
            None => ClassSlotMap::new(),
        };

        let records = load_season_records(None, &self.pool).await?;
        roster.apply_projection(&season_stats(&records));
        let event_type = self.event_type(event_type, show_name);
        let entries = annotate_roster(roster.into_entries(), &slots, event_type.as_deref(), &self.rules);
        info!("Projection for '{show_name}': {} competitors from {} season records", entries.len(), records.len());
        let data = SnapshotData { roster: entries, slots, event_type, count: None };
        replace_snapshot(&EventSnapshot::new(SnapshotKind::Projection, show_name, SnapshotStatus::Complete, data), &self.pool).await
    }

    pub async fn sync_national(&self) -> anyhow::Result<()> {
        mark_loading(SnapshotKind::Discovery, "", &self.pool).await?;
        let rules = &self.rules;
        let site_root = self.cfg.site_root.as_str();

        let calendar = self.load(&self.cfg.calendar_url, |data| scan_html(data, |html| event_detail_links(html, site_root)))
            .await
            .unwrap_or_default();
        info!("Discovery: {} event pages on the calendar", calendar.len());

        let mut events: IndexMap<String, EventMetadata> = IndexMap::new();
        for (name, link) in calendar {
            if name.is_empty() {
                continue;
            }
            let (prelims_url, finals_url) = self.load(&link.url, |data| scan_html(data, |html| schedule_links(html, &rules.excluded_link_marker, site_root)))
                .await
                .unwrap_or_default();
            let event = EventMetadata {
                name: name.clone(),
                prelims_url: prelims_url.unwrap_or_default(),
                finals_url: finals_url.unwrap_or_default(),
                show_id: String::new(),
                event_type: rules.event_type_for_name(&link.label),
            };
            events.insert(name, event);
        }

        let shows = self.load(&self.cfg.scores_index_url, |data| scan_html(data, show_links))
            .await
            .unwrap_or_default();
        for show in &shows {
            let show_name = show.name.to_lowercase();
            let matched = events.values_mut().find(|event| {
                let event_name = event.name.to_lowercase();
                event_name.contains(&show_name) || show_name.contains(&event_name)
            });
            if let Some(event) = matched {
                event.show_id = show.show_id.clone();
                if event.event_type.is_none() {
                    event.event_type = rules.event_type_for_name(&show.label);
                }
                continue;
            }
            events.insert(show.name.clone(), EventMetadata {
                name: show.name.clone(),
                show_id: show.show_id.clone(),
                event_type: rules.event_type_for_name(&show.label),
                ..Default::default()
            });
        }

        // shows sharing a city ("Dayton Regional", "Dayton Regional+") stay separate
        let mut ledger = SeasonLedger::new();
        for show in shows.iter().unique_by(|show| show.show_id.as_str()) {
            let season_show = if show.label.is_empty() { &show.name } else { &show.label };
            if let Some(rows) = self.load_scores(&show.show_id).await {
                for row in &rows {
                    ledger.add_score(season_show, row, rules);
                }
            }
        }
        if ledger.is_empty() {
            info!("Discovery: no season scores found, season ledger kept");
        } else {
            replace_season_records(&ledger.into_records(), &self.pool).await?;
        }

        let events: Vec<EventMetadata> = events.into_values().collect();
        if events.is_empty() {
            return replace_snapshot(&EventSnapshot::failed(SnapshotKind::Discovery, "", NO_EVENTS), &self.pool).await
        }
        replace_events(&events, &self.pool).await?;
        info!("Discovery complete, {} events", events.len());
        let data = SnapshotData { count: Some(events.len()), ..Default::default() };
        replace_snapshot(&EventSnapshot::new(SnapshotKind::Discovery, "", SnapshotStatus::Complete, data), &self.pool).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::events::load_events;
    use crate::fetch::test::StaticFetcher;
    use crate::roster::{Status, FINISHED};
    use crate::season::SeasonRecord;
    use crate::snapshot::load_snapshot;

    pub(crate) const PRELIMS_URL: &str = "https://sched.test/prelims";
    pub(crate) const FINALS_URL: &str = "https://sched.test/finals";
    pub(crate) const SCORES_URL: &str = "https://scores.test/event/?ShowId=77";

    pub(crate) const PRELIMS: &str = r#"<table>
        <tr><td>8:10 AM</td><td>Avon HS</td><td>Independent Open</td></tr>
        <tr><td>8:20 AM</td><td>Carmel HS</td><td>Independent Open</td></tr>
        <tr><td>8:30 AM</td><td>Pulse</td><td>Independent Open</td></tr>
        <tr><td>8:40 AM</td><td>Lunch Break</td><td>-</td></tr>
        </table>"#;
    // performers are not known until prelims end
    pub(crate) const FINALS: &str = r#"<table>
        <tr><td>6:00 PM</td><td></td><td>Independent Open</td></tr>
        <tr><td>6:10 PM</td><td></td><td>Independent Open</td></tr>
        </table>"#;
    pub(crate) const SCORES: &str = r#"<table>
        <tr><th>Independent Open - Prelims</th></tr>
        <tr><td>1</td><td>Carmel HS</td><td>81.2 View Recap</td></tr>
        <tr><td>2</td><td>Avon HS</td><td>79.9</td></tr>
        <tr><td>3</td><td>Walk In WG</td><td>70.0</td></tr>
        </table>"#;

    pub(crate) fn worker_config() -> WorkerConfig {
        WorkerConfig {
            score_event_url: "https://scores.test/event/?ShowId={show_id}".to_string(),
            calendar_url: "https://site.test/calendar".to_string(),
            scores_index_url: "https://site.test/scores".to_string(),
            site_root: "https://site.test".to_string(),
            ..Default::default()
        }
    }

    pub(crate) async fn context(fetcher: StaticFetcher) -> SyncContext {
        let rules = Ruleset::default();
        SyncContext {
            pool: crate::db::open_pool("sqlite::memory:").await.unwrap(),
            fetcher: Arc::new(fetcher),
            adapters: Arc::new(Adapters::new(&rules).unwrap()),
            rules: Arc::new(rules),
            cfg: worker_config(),
        }
    }

    fn live_command() -> Command {
        Command::SyncLive {
            show_id: Some("77".to_string()),
            prelims_url: Some(PRELIMS_URL.to_string()),
            finals_url: Some(FINALS_URL.to_string()),
            event_name: Some("Dayton".to_string()),
            event_type: None,
        }
    }

    #[rocket::async_test]
    async fn live_sync_merges_three_passes() {
        let ctx = context(StaticFetcher::default()
            .with(PRELIMS_URL, PRELIMS)
            .with(FINALS_URL, FINALS)
            .with(SCORES_URL, SCORES)).await;
        ctx.execute(&live_command()).await.unwrap();

        let snapshot = load_snapshot(SnapshotKind::Live, &ctx.pool).await.unwrap().unwrap();
        assert_eq!(snapshot.status, SnapshotStatus::Complete);
        assert_eq!(snapshot.event_name, "Dayton");
        assert_eq!(snapshot.data.slots.get("Independent Open"), Some(&2));
        let by_name = |name: &str| snapshot.data.roster.iter().find(|e| e.competitor == name).unwrap();
        assert_eq!(snapshot.data.roster.len(), 4);
        assert_eq!(by_name("Carmel HS").status, Status::Advanced);
        assert_eq!(by_name("Carmel HS").rank, Some(1));
        assert_eq!(by_name("Avon HS").status, Status::Advanced);
        assert_eq!(by_name("Avon HS").scheduled_time, "8:10 AM");
        assert_eq!(by_name("Walk In WG").scheduled_time, FINISHED);
        assert_eq!(by_name("Walk In WG").status, Status::BelowCutline);
        assert_eq!(by_name("Pulse").status, Status::Pending);
    }

    #[rocket::async_test]
    async fn live_sync_tolerates_missing_documents() {
        let ctx = context(StaticFetcher::default().with(SCORES_URL, SCORES)).await;
        ctx.execute(&live_command()).await.unwrap();
        let snapshot = load_snapshot(SnapshotKind::Live, &ctx.pool).await.unwrap().unwrap();
        assert_eq!(snapshot.status, SnapshotStatus::Complete);
        assert_eq!(snapshot.data.roster.len(), 3);
        assert!(snapshot.data.slots.is_empty());
        // no finals schedule, three competitors stay within the fallback
        assert!(snapshot.data.roster.iter().all(|e| e.status == Status::Advanced));
    }

    #[rocket::async_test]
    async fn live_sync_without_data_is_empty() {
        let ctx = context(StaticFetcher::default().with(PRELIMS_URL, "   ")).await;
        ctx.execute(&live_command()).await.unwrap();
        let snapshot = load_snapshot(SnapshotKind::Live, &ctx.pool).await.unwrap().unwrap();
        assert_eq!(snapshot.status, SnapshotStatus::Empty);
        assert!(snapshot.data.roster.is_empty());
    }

    #[rocket::async_test]
    async fn archive_is_sorted_by_class_and_score() {
        let scores = r#"<table>
            <tr><th>Scholastic Open</th></tr>
            <tr><td>1</td><td>Zeta HS</td><td>70.5</td></tr>
            <tr><th>Independent A - Finals</th></tr>
            <tr><td>1</td><td>Beta</td><td>60.0</td></tr>
            <tr><td>2</td><td>Alpha</td><td>65.0</td></tr>
            </table>"#;
        let ctx = context(StaticFetcher::default().with(SCORES_URL, scores)).await;
        ctx.execute(&Command::SyncArchive { show_id: "77".to_string(), event_name: Some("Avon".to_string()) }).await.unwrap();
        let snapshot = load_snapshot(SnapshotKind::Archive, &ctx.pool).await.unwrap().unwrap();
        assert_eq!(snapshot.status, SnapshotStatus::Complete);
        let names: Vec<_> = snapshot.data.roster.iter().map(|e| e.competitor.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta", "Zeta HS"]);
        assert_eq!(snapshot.data.roster[0].final_score, 65.0);
    }

    #[rocket::async_test]
    async fn projection_uses_season_averages() {
        let ctx = context(StaticFetcher::default()
            .with(PRELIMS_URL, PRELIMS)
            .with(FINALS_URL, FINALS)).await;
        let record = |show: &str, id: &str, score: f64| SeasonRecord {
            show: show.to_string(),
            class_base: "Independent Open".to_string(),
            competitor_id: id.to_string(),
            competitor: id.to_string(),
            score,
        };
        replace_season_records(&[
            record("Dayton", "avon hs", 70.0),
            record("Indy", "avon hs", 75.0),
            record("Dayton", "pulse", 80.0),
        ], &ctx.pool).await.unwrap();

        ctx.execute(&Command::SyncProjection {
            show_name: Some("Avon".to_string()),
            prelims_url: Some(PRELIMS_URL.to_string()),
            finals_url: Some(FINALS_URL.to_string()),
            event_type: None,
        }).await.unwrap();
        let snapshot = load_snapshot(SnapshotKind::Projection, &ctx.pool).await.unwrap().unwrap();
        assert_eq!(snapshot.status, SnapshotStatus::Complete);
        let by_name = |name: &str| snapshot.data.roster.iter().find(|e| e.competitor == name).unwrap();
        assert_eq!(by_name("Avon HS").prelim_score, 72.5);
        assert_eq!(by_name("Avon HS").shows_attended, 2);
        assert_eq!(by_name("Avon HS").status, Status::Advanced);
        assert_eq!(by_name("Pulse").status, Status::Advanced);
        assert_eq!(by_name("Carmel HS").prelim_score, 0.0);
        assert_eq!(by_name("Carmel HS").status, Status::Pending);
    }

    #[rocket::async_test]
    async fn projection_failures_are_reported() {
        let ctx = context(StaticFetcher::default().with(PRELIMS_URL, "<p>TBA</p>")).await;
        for (prelims_url, error) in [(None, NO_PRELIMS_URL), (Some(PRELIMS_URL.to_string()), NO_COMPETITORS)] {
            ctx.execute(&Command::SyncProjection { show_name: None, prelims_url, finals_url: None, event_type: None }).await.unwrap();
            let snapshot = load_snapshot(SnapshotKind::Projection, &ctx.pool).await.unwrap().unwrap();
            assert_eq!(snapshot.status, SnapshotStatus::Failed);
            assert_eq!(snapshot.error.as_deref(), Some(error));
        }
    }

    #[rocket::async_test]
    async fn discovery_builds_event_list_and_ledger() {
        let calendar = r#"
            <div><h3>Dayton Regional, Dayton OH</h3><a href="/event-details-page/?id=1">Details</a></div>
            <div><h3>Indianapolis Regional+</h3><a href="/event-details-page/?id=2">Details</a></div>"#;
        let dayton = r#"<a href="/files/dayton-prelims.pdf">Prelims Schedule</a><a href="/files/dayton-finals.pdf">Finals Schedule</a>"#;
        let index = r#"<table>
            <tr><td>Dayton Regional</td><td><a href="/scores/?ShowId=77">View Scores</a></td></tr>
            <tr><td>Atlanta Regional</td><td><a href="/scores/?ShowId=88">View Scores</a></td></tr>
            </table>"#;
        let ctx = context(StaticFetcher::default()
            .with("https://site.test/calendar", calendar)
            .with("https://site.test/event-details-page/?id=1", dayton)
            .with("https://site.test/scores", index)
            .with(SCORES_URL, SCORES)).await;
        ctx.execute(&Command::SyncNational).await.unwrap();

        let events = load_events(&ctx.pool).await.unwrap();
        assert_eq!(events, vec![
            EventMetadata {
                name: "Dayton".to_string(),
                prelims_url: "https://site.test/files/dayton-prelims.pdf".to_string(),
                finals_url: "https://site.test/files/dayton-finals.pdf".to_string(),
                show_id: "77".to_string(),
                event_type: None,
            },
            EventMetadata {
                name: "Indianapolis +".to_string(),
                event_type: Some("regional_plus".to_string()),
                ..Default::default()
            },
            EventMetadata { name: "Atlanta".to_string(), show_id: "88".to_string(), ..Default::default() },
        ]);
        let discovery = load_snapshot(SnapshotKind::Discovery, &ctx.pool).await.unwrap().unwrap();
        assert_eq!(discovery.status, SnapshotStatus::Complete);
        assert_eq!(discovery.data.count, Some(3));

        let records = load_season_records(Some("Independent Open"), &ctx.pool).await.unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.show == "Dayton Regional"));
    }

    #[rocket::async_test]
    async fn same_city_shows_count_separately() {
        let index = r#"<table>
            <tr><td>Dayton Regional</td><td><a href="/scores/?ShowId=77">View Scores</a></td></tr>
            <tr><td>Dayton Regional+</td><td><a href="/scores/?ShowId=78">View Scores</a></td></tr>
            </table>"#;
        let plus_scores = r#"<table>
            <tr><th>Independent Open - Prelims</th></tr>
            <tr><td>1</td><td>Carmel HS</td><td>60.0</td></tr>
            </table>"#;
        let ctx = context(StaticFetcher::default()
            .with("https://site.test/scores", index)
            .with(SCORES_URL, SCORES)
            .with("https://scores.test/event/?ShowId=78", plus_scores)).await;
        ctx.execute(&Command::SyncNational).await.unwrap();

        let records = load_season_records(Some("Independent Open"), &ctx.pool).await.unwrap();
        let carmel: Vec<_> = records.iter().filter(|r| r.competitor_id == "carmel hs").map(|r| r.show.as_str()).collect();
        assert_eq!(carmel, vec!["Dayton Regional", "Dayton Regional+"]);
        let stats = season_stats(&records);
        let carmel = stats.iter().find(|s| s.competitor_id == "carmel hs").unwrap();
        assert_eq!(carmel.show_count, 2);
        assert!((carmel.average - 70.6).abs() < 1e-9);
        assert_eq!(carmel.season_high, 81.2);
    }

    #[rocket::async_test]
    async fn discovery_without_events_fails() {
        let ctx = context(StaticFetcher::default()).await;
        ctx.execute(&Command::SyncNational).await.unwrap();
        let discovery = load_snapshot(SnapshotKind::Discovery, &ctx.pool).await.unwrap().unwrap();
        assert_eq!(discovery.status, SnapshotStatus::Failed);
        assert_eq!(discovery.error.as_deref(), Some(NO_EVENTS));
        assert!(load_events(&ctx.pool).await.unwrap().is_empty());
    }
}
