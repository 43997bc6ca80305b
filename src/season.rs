use std::collections::BTreeMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use crate::classes::normalize_class;
use crate::roster::{competitor_id, ScoreRow};
use crate::ruleset::Ruleset;
use crate::util::normalize_ws;

#[derive(Serialize, Deserialize, FromRow, Clone, Debug, PartialEq)]
pub struct SeasonRecord {
    pub show: String,
    pub class_base: String,
    pub competitor_id: String,
    pub competitor: String,
    pub score: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SeasonStats {
    pub competitor_id: String,
    pub competitor: String,
    pub class_base: String,
    pub average: f64,
    pub season_high: f64,
    pub show_count: u32,
}

/// Collects the scores of one show, keeping the best score per class and competitor.
#[derive(Default, Debug)]
pub struct SeasonLedger {
    records: IndexMap<(String, String, String), SeasonRecord>,
}
impl SeasonLedger {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn add_score(&mut self, show: &str, row: &ScoreRow, rules: &Ruleset) {
        let id = competitor_id(&row.competitor);
        if id.is_empty() || row.score <= 0.0 {
            return
        }
        let class_base = normalize_class(&row.class_raw, rules);
        let key = (show.to_string(), class_base.clone(), id.clone());
        let rec = self.records.entry(key).or_insert_with(|| SeasonRecord {
            show: show.to_string(),
            class_base,
            competitor_id: id,
            competitor: normalize_ws(&row.competitor),
            score: 0.0,
        });
        rec.score = rec.score.max(row.score);
    }
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
    pub fn into_records(self) -> Vec<SeasonRecord> {
        self.records.into_values().collect()
    }
}

/// Season aggregates per (class, competitor), classes in name order, best average first.
pub fn season_stats(records: &[SeasonRecord]) -> Vec<SeasonStats> {
    let mut groups: BTreeMap<(&str, &str), Vec<&SeasonRecord>> = BTreeMap::new();
    for rec in records {
        groups.entry((rec.class_base.as_str(), rec.competitor_id.as_str())).or_default().push(rec);
    }
    let mut stats: Vec<SeasonStats> = groups.into_values()
        .filter_map(|recs| {
            let first = recs.first()?;
            let total: f64 = recs.iter().map(|r| r.score).sum();
            let season_high = recs.iter().map(|r| r.score).fold(0.0, f64::max);
            Some(SeasonStats {
                competitor_id: first.competitor_id.clone(),
                competitor: first.competitor.clone(),
                class_base: first.class_base.clone(),
                average: total / recs.len() as f64,
                season_high,
                show_count: recs.len() as u32,
            })
        })
        .collect();
    stats.sort_by(|a, b| a.class_base.cmp(&b.class_base)
        .then(b.average.total_cmp(&a.average)));
    stats
}

pub async fn replace_season_records(records: &[SeasonRecord], pool: &SqlitePool) -> anyhow::Result<()> {
    let mut txn = pool.begin().await?;
    sqlx::query("DELETE FROM season_records").execute(&mut *txn).await?;
    for rec in records {
        sqlx::query("INSERT INTO season_records (show, class_base, competitor_id, competitor, score) VALUES (?, ?, ?, ?, ?)")
            .bind(&rec.show)
            .bind(&rec.class_base)
            .bind(&rec.competitor_id)
            .bind(&rec.competitor)
            .bind(rec.score)
            .execute(&mut *txn)
            .await?;
    }
    txn.commit().await?;
    info!("Season ledger replaced, {} records", records.len());
    Ok(())
}

pub async fn load_season_records(class_base: Option<&str>, pool: &SqlitePool) -> Result<Vec<SeasonRecord>, sqlx::Error> {
    let qs = "SELECT show, class_base, competitor_id, competitor, score FROM season_records";
    match class_base {
        Some(class_base) => sqlx::query_as::<_, SeasonRecord>(&format!("{qs} WHERE class_base=? ORDER BY id"))
            .bind(class_base)
            .fetch_all(pool)
            .await,
        None => sqlx::query_as::<_, SeasonRecord>(&format!("{qs} ORDER BY id"))
            .fetch_all(pool)
            .await,
    }
}
