use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use crate::classes::normalize_class;
use crate::ruleset::Ruleset;
use crate::season::SeasonStats;
use crate::util::normalize_ws;

/// Scheduled time of a competitor known only from a results table.
pub const FINISHED: &str = "Finished";

pub type ClassSlotMap = BTreeMap<String, u32>;

/// Join key derived from a display name: lower case, whitespace collapsed.
pub fn competitor_id(name: &str) -> String {
    normalize_ws(name).to_lowercase()
}

#[derive(Serialize, Deserialize, Default, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    Pending,
    Advanced,
    BelowCutline,
    PodAdvanced,
    Wildcard,
}
impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Pending => f.write_str("pending"),
            Status::Advanced => f.write_str("advanced"),
            Status::BelowCutline => f.write_str("below-cutline"),
            Status::PodAdvanced => f.write_str("pod-advanced"),
            Status::Wildcard => f.write_str("wildcard"),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Prelims,
    Finals,
}
impl Phase {
    pub fn from_class_label(label: &str) -> Self {
        if label.to_lowercase().contains("final") { Phase::Finals } else { Phase::Prelims }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RosterEntry {
    pub competitor_id: String,
    pub competitor: String,
    pub class_raw: String,
    pub class_base: String,
    pub scheduled_time: String,
    #[serde(default)]
    pub prelim_score: f64,
    #[serde(default)]
    pub final_score: f64,
    #[serde(default)]
    pub shows_attended: u32,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod: Option<String>,
}
impl RosterEntry {
    pub fn new(competitor: &str, class_raw: &str, scheduled_time: &str, rules: &Ruleset) -> Self {
        Self {
            competitor_id: competitor_id(competitor),
            competitor: normalize_ws(competitor),
            class_raw: class_raw.to_string(),
            class_base: normalize_class(class_raw, rules),
            scheduled_time: scheduled_time.to_string(),
            prelim_score: 0.0,
            final_score: 0.0,
            shows_attended: 0,
            status: Status::Pending,
            rank: None,
            pod: None,
        }
    }
    /// Score used for ranking; 0.0 means not scored yet.
    pub fn ranking_score(&self) -> f64 {
        self.prelim_score
    }
    pub fn is_scored(&self) -> bool {
        self.ranking_score() > 0.0
    }
    pub fn best_score(&self) -> f64 {
        self.prelim_score.max(self.final_score)
    }
}

/// One row of a schedule document, before normalization.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduleRow {
    pub competitor: String,
    pub class_raw: String,
    pub time: String,
}

/// One row of a results table, before normalization.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoreRow {
    pub competitor: String,
    pub class_raw: String,
    pub phase: Phase,
    pub score: f64,
}

type RosterKey = (String, String);

/// Merged roster of one event, one entry per (competitor_id, class_base), in first-seen order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Roster {
    entries: IndexMap<RosterKey, RosterEntry>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn into_entries(self) -> Vec<RosterEntry> {
        self.entries.into_values().collect()
    }
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    #[cfg(test)]
    pub fn get(&self, competitor_id: &str, class_base: &str) -> Option<&RosterEntry> {
        self.entries.get(&(competitor_id.to_string(), class_base.to_string()))
    }

    fn resolve_key(&self, competitor_id: &str, class_base: &str) -> Option<RosterKey> {
        let key = (competitor_id.to_string(), class_base.to_string());
        if self.entries.contains_key(&key) {
            return Some(key)
        }
        // schedules and result tables label the same division differently
        self.entries.keys()
            .filter(|(id, _)| id == competitor_id)
            .exactly_one()
            .ok()
            .cloned()
    }

    pub fn merge_schedule(&mut self, row: &ScheduleRow, rules: &Ruleset) {
        let incoming = RosterEntry::new(&row.competitor, &row.class_raw, &row.time, rules);
        if incoming.competitor_id.is_empty() {
            return
        }
        let key = (incoming.competitor_id.clone(), incoming.class_base.clone());
        match self.entries.get_mut(&key) {
            Some(entry) => {
                if !incoming.class_raw.is_empty() {
                    entry.class_raw = incoming.class_raw;
                }
                if !incoming.scheduled_time.is_empty() {
                    entry.scheduled_time = incoming.scheduled_time;
                }
            }
            None => {
                self.entries.insert(key, incoming);
            }
        }
    }

    pub fn merge_score(&mut self, row: &ScoreRow, rules: &Ruleset) {
        let id = competitor_id(&row.competitor);
        if id.is_empty() {
            return
        }
        let class_base = normalize_class(&row.class_raw, rules);
        let key = match self.resolve_key(&id, &class_base) {
            Some(key) => key,
            None => {
                let entry = RosterEntry::new(&row.competitor, &row.class_raw, FINISHED, rules);
                let key = (entry.competitor_id.clone(), entry.class_base.clone());
                self.entries.insert(key.clone(), entry);
                key
            }
        };
        if let Some(entry) = self.entries.get_mut(&key) {
            let score = match row.phase {
                Phase::Prelims => &mut entry.prelim_score,
                Phase::Finals => &mut entry.final_score,
            };
            *score = score.max(row.score);
        }
    }

    /// Replaces every prelims score with the competitor's season average.
    pub fn apply_projection(&mut self, stats: &[SeasonStats]) {
        for entry in self.entries.values_mut() {
            let found = stats.iter()
                .find(|s| s.competitor_id == entry.competitor_id && s.class_base == entry.class_base);
            match found {
                Some(s) => {
                    entry.prelim_score = (s.average * 1000.0).round() / 1000.0;
                    entry.shows_attended = s.show_count;
                }
                None => {
                    entry.prelim_score = 0.0;
                    entry.shows_attended = 0;
                }
            }
        }
    }
}

/// Finals berths per class, one per finals-schedule row.
pub fn count_slots<'a>(class_labels: impl IntoIterator<Item = &'a str>, rules: &Ruleset) -> ClassSlotMap {
    let mut slots = ClassSlotMap::new();
    for label in class_labels {
        if label.trim().is_empty() {
            continue;
        }
        *slots.entry(normalize_class(label, rules)).or_insert(0) += 1;
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(name: &str, class_raw: &str, time: &str) -> ScheduleRow {
        ScheduleRow { competitor: name.to_string(), class_raw: class_raw.to_string(), time: time.to_string() }
    }
    fn score(name: &str, class_raw: &str, score: f64) -> ScoreRow {
        ScoreRow { competitor: name.to_string(), class_raw: class_raw.to_string(), phase: Phase::from_class_label(class_raw), score }
    }

    #[test]
    fn test_competitor_id() {
        assert_eq!(competitor_id("  Lincoln   HS  Varsity "), "lincoln hs varsity");
        assert_eq!(competitor_id(""), "");
    }

    #[test]
    fn merge_is_idempotent() {
        let rules = Ruleset::default();
        let schedule_rows = [schedule("Avon HS", "SA - Round 1", "9:00 AM"), schedule("Carmel HS", "SO", "9:10 AM")];
        let score_rows = [score("Avon HS", "Scholastic A - Round 1", 71.2), score("Zionsville", "Scholastic Open Prelims", 80.0)];
        let mut once = Roster::new();
        for row in &schedule_rows { once.merge_schedule(row, &rules); }
        for row in &score_rows { once.merge_score(row, &rules); }
        let mut twice = once.clone();
        for row in &schedule_rows { twice.merge_schedule(row, &rules); }
        for row in &score_rows { twice.merge_score(row, &rules); }
        assert_eq!(once, twice);
        assert_eq!(once.len(), 3);
    }

    #[test]
    fn merge_keeps_max_score() {
        let rules = Ruleset::default();
        let mut roster = Roster::new();
        roster.merge_schedule(&schedule("Avon HS", "SA - Round 2", "9:00 AM"), &rules);
        roster.merge_score(&score("Avon HS", "Scholastic A", 70.5), &rules);
        roster.merge_score(&score("avon  hs", "Scholastic A", 68.0), &rules);
        roster.merge_score(&score("Avon HS", "Scholastic A Finals", 74.25), &rules);
        let entry = roster.get("avon hs", "Scholastic A").unwrap();
        assert_eq!(entry.prelim_score, 70.5);
        assert_eq!(entry.final_score, 74.25);
        assert_eq!(entry.scheduled_time, "9:00 AM");
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn score_only_competitor_is_synthesized() {
        let rules = Ruleset::default();
        let mut roster = Roster::new();
        roster.merge_score(&score("Late Entry WG", "Independent A", 65.0), &rules);
        let entry = roster.get("late entry wg", "Independent A").unwrap();
        assert_eq!(entry.scheduled_time, FINISHED);
        assert_eq!(entry.prelim_score, 65.0);
    }

    #[test]
    fn score_under_other_label_joins_sole_entry() {
        let rules = Ruleset::default();
        let mut roster = Roster::new();
        roster.merge_schedule(&schedule("Avon HS", "SA", "9:00 AM"), &rules);
        roster.merge_score(&score("Avon HS", "Unknown Class", 70.0), &rules);
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.get("avon hs", "Scholastic A").unwrap().prelim_score, 70.0);
    }

    #[test]
    fn later_schedule_pass_overwrites_time() {
        let rules = Ruleset::default();
        let mut roster = Roster::new();
        roster.merge_schedule(&schedule("Avon HS", "SA", "9:00 AM"), &rules);
        roster.merge_schedule(&schedule("Avon HS", "SA", "9:30 AM"), &rules);
        roster.merge_schedule(&schedule("Avon HS", "SA", ""), &rules);
        assert_eq!(roster.get("avon hs", "Scholastic A").unwrap().scheduled_time, "9:30 AM");
    }

    #[test]
    fn test_apply_projection() {
        let rules = Ruleset::default();
        let mut roster = Roster::new();
        roster.merge_schedule(&schedule("Avon HS", "SA", "9:00 AM"), &rules);
        roster.merge_schedule(&schedule("Carmel HS", "SA", "9:10 AM"), &rules);
        let stats = vec![SeasonStats {
            competitor_id: "avon hs".to_string(),
            competitor: "Avon HS".to_string(),
            class_base: "Scholastic A".to_string(),
            average: 70.12345,
            season_high: 72.0,
            show_count: 3,
        }];
        roster.apply_projection(&stats);
        let avon = roster.get("avon hs", "Scholastic A").unwrap();
        assert_eq!(avon.prelim_score, 70.123);
        assert_eq!(avon.shows_attended, 3);
        assert_eq!(roster.get("carmel hs", "Scholastic A").unwrap().prelim_score, 0.0);
    }

    #[test]
    fn test_count_slots() {
        let rules = Ruleset::default();
        let slots = count_slots(["SA", "SA", "Scholastic A", "IO", "", "Independent Open Finals"], &rules);
        assert_eq!(slots.get("Scholastic A"), Some(&3));
        assert_eq!(slots.get("Independent Open"), Some(&2));
        assert_eq!(slots.len(), 2);
    }
}
