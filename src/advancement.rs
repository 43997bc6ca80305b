use std::cmp::Ordering;
use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use crate::classes::{normalize_class, round_number};
use crate::datetime::parse_time_of_day;
use crate::roster::{competitor_id, ClassSlotMap, RosterEntry, Status};
use crate::ruleset::{PodRule, Ruleset};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    Standard,
    PodWildcard,
    /// zero finals slots, nobody is ranked
    Skipped,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StandingsEntry {
    #[serde(flatten)]
    pub entry: RosterEntry,
    #[serde(default)]
    pub highlighted: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ClassStandings {
    pub class_base: String,
    pub rule: RuleKind,
    pub slots: u32,
    pub entries: Vec<StandingsEntry>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Standings {
    pub classes: Vec<ClassStandings>,
}

/// Dashboard view options; the override replaces discovered slot counts for one computation.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct StandingsRequest {
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub highlight: Option<String>,
    #[serde(default)]
    pub slots_override: ClassSlotMap,
}

pub fn resolve_slots(class_base: &str, class_size: usize, discovered: &ClassSlotMap, slots_override: &ClassSlotMap, fallback: u32) -> u32 {
    slots_override.get(class_base)
        .or_else(|| discovered.get(class_base))
        .copied()
        .unwrap_or_else(|| fallback.min(class_size as u32))
}

fn by_score_desc(entries: &[RosterEntry], indices: &mut [usize]) {
    indices.sort_by(|&a, &b| entries[b].ranking_score().total_cmp(&entries[a].ranking_score()));
}

fn apply_standard_rule(entries: &mut [RosterEntry], slots: u32) {
    let mut scored: Vec<usize> = (0..entries.len()).filter(|&i| entries[i].is_scored()).collect();
    by_score_desc(entries, &mut scored);
    for (pos, &i) in scored.iter().enumerate() {
        entries[i].status = if pos < slots as usize { Status::Advanced } else { Status::BelowCutline };
    }
}

fn apply_pod_rule(entries: &mut [RosterEntry], rule: &PodRule) {
    for pod in &rule.pods {
        let mut members: Vec<usize> = (0..entries.len())
            .filter(|&i| round_number(&entries[i].class_raw).is_some_and(|round| pod.rounds.contains(&round)))
            .collect();
        for &i in &members {
            entries[i].pod = Some(pod.name.clone());
        }
        members.retain(|&i| entries[i].is_scored());
        by_score_desc(entries, &mut members);
        for &i in members.iter().take(rule.per_pod) {
            entries[i].status = Status::PodAdvanced;
        }
    }
    let mut remainder: Vec<usize> = (0..entries.len())
        .filter(|&i| entries[i].is_scored() && entries[i].status != Status::PodAdvanced)
        .collect();
    by_score_desc(entries, &mut remainder);
    for (pos, &i) in remainder.iter().enumerate() {
        entries[i].status = if pos < rule.wildcards { Status::Wildcard } else { Status::BelowCutline };
    }
}

/// Scored entries by score, best first; then unscored by scheduled time; unreadable times last.
pub fn display_cmp(a: &RosterEntry, b: &RosterEntry) -> Ordering {
    match (a.is_scored(), b.is_scored()) {
        (true, true) => b.ranking_score().total_cmp(&a.ranking_score()),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => match (parse_time_of_day(&a.scheduled_time), parse_time_of_day(&b.scheduled_time)) {
            (Some(ta), Some(tb)) => ta.cmp(&tb),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}

/// Assigns status and rank within one class and returns its members in display order.
pub fn rank_class(mut entries: Vec<RosterEntry>, slots: u32, pod_rule: Option<&PodRule>) -> (RuleKind, Vec<RosterEntry>) {
    for entry in entries.iter_mut() {
        entry.status = Status::Pending;
        entry.rank = None;
        entry.pod = None;
    }
    let rule = match pod_rule {
        Some(pod_rule) => {
            apply_pod_rule(&mut entries, pod_rule);
            RuleKind::PodWildcard
        }
        None if slots == 0 => RuleKind::Skipped,
        None => {
            apply_standard_rule(&mut entries, slots);
            RuleKind::Standard
        }
    };
    entries.sort_by(display_cmp);
    if rule != RuleKind::Skipped {
        for (pos, entry) in entries.iter_mut().filter(|e| e.is_scored()).enumerate() {
            entry.rank = Some(pos as u32 + 1);
        }
    }
    (rule, entries)
}

/// Ranks every class of a roster.
pub fn compute_standings(roster: &[RosterEntry], discovered: &ClassSlotMap, event_type: Option<&str>, request: &StandingsRequest, rules: &Ruleset) -> Standings {
    let mut classes: BTreeMap<&str, Vec<RosterEntry>> = BTreeMap::new();
    for entry in roster {
        classes.entry(entry.class_base.as_str()).or_default().push(entry.clone());
    }
    let class_filter = request.class_name.as_deref()
        .filter(|name| !name.trim().is_empty())
        .map(|name| normalize_class(name, rules));
    let highlight = request.highlight.as_deref().map(competitor_id).filter(|id| !id.is_empty());
    let classes = classes.into_iter()
        .filter(|(class_base, _)| class_filter.as_deref().is_none_or(|filter| filter == *class_base))
        .map(|(class_base, members)| {
            let pod_rule = rules.pod_rule_for(event_type, class_base);
            let slots = match pod_rule {
                Some(rule) => (rule.pods.len() * rule.per_pod + rule.wildcards) as u32,
                None => resolve_slots(class_base, members.len(), discovered, &request.slots_override, rules.fallback_slots),
            };
            let (rule, members) = rank_class(members, slots, pod_rule);
            let entries = members.into_iter()
                .map(|entry| StandingsEntry {
                    highlighted: highlight.as_deref() == Some(entry.competitor_id.as_str()),
                    entry,
                })
                .collect();
            ClassStandings { class_base: class_base.to_string(), rule, slots, entries }
        })
        .collect();
    Standings { classes }
}

/// Flattens standings back into a roster carrying the derived status and rank.
pub fn annotate_roster(roster: Vec<RosterEntry>, discovered: &ClassSlotMap, event_type: Option<&str>, rules: &Ruleset) -> Vec<RosterEntry> {
    compute_standings(&roster, discovered, event_type, &StandingsRequest::default(), rules)
        .classes
        .into_iter()
        .flat_map(|class| class.entries.into_iter().map(|e| e.entry))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, class_raw: &str, time: &str, score: f64) -> RosterEntry {
        let mut entry = RosterEntry::new(name, class_raw, time, &Ruleset::default());
        entry.prelim_score = score;
        entry
    }

    fn statuses(entries: &[RosterEntry]) -> Vec<(&str, Status)> {
        entries.iter().map(|e| (e.competitor.as_str(), e.status)).collect()
    }

    #[test]
    fn standard_rule_top_n() {
        let entries = vec![
            entry("A", "SO", "9:00 AM", 90.0),
            entry("B", "SO", "9:10 AM", 85.0),
            entry("C", "SO", "9:20 AM", 80.0),
            entry("D", "SO", "9:30 AM", 70.0),
            entry("E", "SO", "9:40 AM", 0.0),
        ];
        let (rule, ranked) = rank_class(entries, 3, None);
        assert_eq!(rule, RuleKind::Standard);
        assert_eq!(statuses(&ranked), vec![
            ("A", Status::Advanced),
            ("B", Status::Advanced),
            ("C", Status::Advanced),
            ("D", Status::BelowCutline),
            ("E", Status::Pending),
        ]);
        assert_eq!(ranked.iter().map(|e| e.rank).collect::<Vec<_>>(), vec![Some(1), Some(2), Some(3), Some(4), None]);
    }

    #[test]
    fn ties_keep_input_order() {
        let entries = vec![
            entry("First", "SO", "", 80.0),
            entry("Top", "SO", "", 85.0),
            entry("Second", "SO", "", 80.0),
            entry("Third", "SO", "", 80.0),
        ];
        let (_, ranked) = rank_class(entries, 2, None);
        assert_eq!(statuses(&ranked), vec![
            ("Top", Status::Advanced),
            ("First", Status::Advanced),
            ("Second", Status::BelowCutline),
            ("Third", Status::BelowCutline),
        ]);
    }

    #[test]
    fn zero_slots_skip_class() {
        let entries = vec![entry("A", "SO", "", 90.0), entry("B", "SO", "", 0.0)];
        let (rule, ranked) = rank_class(entries, 0, None);
        assert_eq!(rule, RuleKind::Skipped);
        assert!(ranked.iter().all(|e| e.status == Status::Pending && e.rank.is_none()));
    }

    #[test]
    fn unscored_sort_by_time_unparsable_last() {
        let entries = vec![
            entry("Late", "SO", "1:15 PM", 0.0),
            entry("Unknown1", "SO", "TBA", 0.0),
            entry("Early", "SO", "9:05 AM", 0.0),
            entry("Unknown2", "SO", "", 0.0),
            entry("Scored", "SO", "3:00 PM", 60.0),
            entry("Noon", "SO", "12:00 PM", 0.0),
        ];
        let (_, ranked) = rank_class(entries, 10, None);
        let names: Vec<_> = ranked.iter().map(|e| e.competitor.as_str()).collect();
        assert_eq!(names, vec!["Scored", "Early", "Noon", "Late", "Unknown1", "Unknown2"]);
    }

    #[test]
    fn pod_rule_splits_pods_and_wildcards() {
        let rule = PodRule::default();
        let mut entries = vec![];
        for i in 0..10 {
            let round = if i % 2 == 0 { 1 } else { 2 };
            entries.push(entry(&format!("P1-{i}"), &format!("SA - Round {round}"), "", 90.0 - i as f64));
        }
        for i in 0..10 {
            let round = if i % 2 == 0 { 3 } else { 4 };
            entries.push(entry(&format!("P2-{i}"), &format!("SA - Round {round}"), "", 89.5 - i as f64));
        }
        entries.push(entry("Unscored", "SA - Round 3", "8:00 AM", 0.0));
        let (kind, ranked) = rank_class(entries, 0, Some(&rule));
        assert_eq!(kind, RuleKind::PodWildcard);

        let count = |status: Status, pod: &str| ranked.iter()
            .filter(|e| e.status == status && e.competitor.starts_with(pod))
            .count();
        assert_eq!(count(Status::PodAdvanced, "P1"), 5);
        assert_eq!(count(Status::PodAdvanced, "P2"), 5);
        assert_eq!(ranked.iter().filter(|e| e.status == Status::Wildcard).count(), 5);
        assert_eq!(ranked.iter().filter(|e| e.status == Status::BelowCutline).count(), 5);

        // remainder scores: P1-5..9 = 85..81, P2-5..9 = 84.5..80.5
        let mut wildcards: Vec<_> = ranked.iter().filter(|e| e.status == Status::Wildcard).map(|e| e.competitor.as_str()).collect();
        wildcards.sort();
        assert_eq!(wildcards, vec!["P1-5", "P1-6", "P1-7", "P2-5", "P2-6"]);

        let unscored = ranked.iter().find(|e| e.competitor == "Unscored").unwrap();
        assert_eq!(unscored.status, Status::Pending);
        assert_eq!(unscored.pod.as_deref(), Some("Pod 2"));
    }

    #[test]
    fn compute_standings_resolves_slots_and_rules() {
        let rules = Ruleset::default();
        let roster = vec![
            entry("Avon HS", "SA - Round 1", "", 80.0),
            entry("Carmel HS", "SA - Round 3", "", 82.0),
            entry("Pulse", "IO", "", 70.0),
            entry("Rhythm", "IO", "", 75.0),
            entry("Zero", "IW", "", 60.0),
        ];
        let discovered: ClassSlotMap = [("Independent Open".to_string(), 2), ("Independent World".to_string(), 0)].into_iter().collect();
        let request = StandingsRequest { highlight: Some(" pulse ".to_string()), ..Default::default() };
        let standings = compute_standings(&roster, &discovered, Some("regional_plus"), &request, &rules);
        let rules_by_class: Vec<_> = standings.classes.iter().map(|c| (c.class_base.as_str(), c.rule, c.slots)).collect();
        assert_eq!(rules_by_class, vec![
            ("Independent Open", RuleKind::Standard, 2),
            ("Independent World", RuleKind::Skipped, 0),
            ("Scholastic A", RuleKind::PodWildcard, 15),
        ]);
        let io = &standings.classes[0];
        assert_eq!(io.entries[0].entry.competitor, "Rhythm");
        assert!(io.entries[1].highlighted);
        assert!(!io.entries[0].highlighted);

        let request = StandingsRequest {
            class_name: Some("IO".to_string()),
            slots_override: [("Independent Open".to_string(), 1)].into_iter().collect(),
            ..Default::default()
        };
        let standings = compute_standings(&roster, &discovered, None, &request, &rules);
        assert_eq!(standings.classes.len(), 1);
        assert_eq!(standings.classes[0].slots, 1);
        assert_eq!(standings.classes[0].entries[1].entry.status, Status::BelowCutline);
    }

    #[test]
    fn fallback_slots_capped_by_class_size() {
        let empty = ClassSlotMap::new();
        assert_eq!(resolve_slots("Scholastic A", 4, &empty, &empty, 10), 4);
        assert_eq!(resolve_slots("Scholastic A", 40, &empty, &empty, 10), 10);
    }
}
