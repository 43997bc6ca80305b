use std::collections::BTreeMap;
use std::path::Path;
use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Column roles of a schedule table row.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ScheduleColumns {
    pub time_col: usize,
    pub name_col: usize,
    pub class_col: usize,
    pub min_cells: usize,
}
impl Default for ScheduleColumns {
    fn default() -> Self {
        Self { time_col: 0, name_col: 1, class_col: 2, min_cells: 3 }
    }
}

/// Column roles of a results table row.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ScoreColumns {
    pub name_col: usize,
    pub score_col: usize,
    pub min_cells: usize,
    /// css class marking a division header row
    pub division_marker: String,
    /// text removed from the score cell before parsing, compared upper-cased
    pub score_noise: Vec<String>,
}
impl Default for ScoreColumns {
    fn default() -> Self {
        Self {
            name_col: 1,
            score_col: 2,
            min_cells: 3,
            division_marker: "division-name".to_string(),
            score_noise: vec!["VIEW RECAP".to_string()],
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PodSpec {
    pub name: String,
    pub rounds: Vec<u32>,
}

/// Two-heat qualification format, active for one division under one event type.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct PodRule {
    pub division: String,
    pub event_type: String,
    pub pods: Vec<PodSpec>,
    pub per_pod: usize,
    pub wildcards: usize,
}
impl Default for PodRule {
    fn default() -> Self {
        Self {
            division: "Scholastic A".to_string(),
            event_type: "regional_plus".to_string(),
            pods: vec![
                PodSpec { name: "Pod 1".to_string(), rounds: vec![1, 2] },
                PodSpec { name: "Pod 2".to_string(), rounds: vec![3, 4] },
            ],
            per_pod: 5,
            wildcards: 5,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EventTypeMarker {
    /// substring of the event name, compared case-insensitively
    pub marker: String,
    pub event_type: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Ruleset {
    pub default_division: String,
    pub unknown_class: String,
    pub fallback_slots: u32,
    pub class_abbreviations: BTreeMap<String, String>,
    /// regex fragments, matched case-insensitively on word boundaries
    pub org_keywords: Vec<String>,
    pub control_tokens: Vec<String>,
    pub excluded_link_marker: String,
    pub schedule_columns: ScheduleColumns,
    pub score_columns: ScoreColumns,
    pub pod_rule: Option<PodRule>,
    pub event_type_markers: Vec<EventTypeMarker>,
}

impl Default for Ruleset {
    fn default() -> Self {
        let class_abbreviations = [
            ("SRA", "Scholastic Regional A"),
            ("SA", "Scholastic A"),
            ("SO", "Scholastic Open"),
            ("SW", "Scholastic World"),
            ("IRA", "Independent Regional A"),
            ("IA", "Independent A"),
            ("IO", "Independent Open"),
            ("IW", "Independent World"),
        ].into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        let org_keywords = [
            "High School", "HS", "Academy", "Winterguard", "WG", "Independent",
            "Performing Arts", "Visual Productions", r"Nuance\s+\w+",
        ].into_iter().map(String::from).collect();
        Self {
            default_division: "Scholastic A".to_string(),
            unknown_class: "Unknown Class".to_string(),
            fallback_slots: 10,
            class_abbreviations,
            org_keywords,
            control_tokens: vec!["Group".to_string(), "Class".to_string(), "Break".to_string()],
            excluded_link_marker: "regional a".to_string(),
            schedule_columns: Default::default(),
            score_columns: Default::default(),
            pod_rule: Some(PodRule::default()),
            event_type_markers: vec![EventTypeMarker { marker: "Regional+".to_string(), event_type: "regional_plus".to_string() }],
        }
    }
}

impl Ruleset {
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let ruleset: Ruleset = serde_yaml::from_str(yaml)?;
        if ruleset.default_division.trim().is_empty() {
            anyhow::bail!("default_division must not be empty");
        }
        Ok(ruleset)
    }
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read ruleset file {}", path.display()))?;
        Self::from_yaml(&yaml).with_context(|| format!("Invalid ruleset file {}", path.display()))
    }
    /// Abbreviations sorted longest first, so alternations prefer `SRA` over `SA`.
    pub fn abbreviations_longest_first(&self) -> Vec<&str> {
        let mut abbrs: Vec<&str> = self.class_abbreviations.keys().map(String::as_str).collect();
        abbrs.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        abbrs
    }
    pub fn expand_abbreviation(&self, label: &str) -> Option<&str> {
        self.class_abbreviations.get(&label.to_uppercase()).map(String::as_str)
    }
    pub fn event_type_for_name(&self, event_name: &str) -> Option<String> {
        let name = event_name.to_lowercase();
        self.event_type_markers.iter()
            .find(|m| name.contains(&m.marker.to_lowercase()))
            .map(|m| m.event_type.clone())
    }
    pub fn pod_rule_for(&self, event_type: Option<&str>, class_base: &str) -> Option<&PodRule> {
        let event_type = event_type?;
        self.pod_rule.as_ref()
            .filter(|rule| rule.event_type == event_type && rule.division == class_base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let ruleset = Ruleset::from_yaml("fallback_slots: 12\npod_rule: null\n").unwrap();
        assert_eq!(ruleset.fallback_slots, 12);
        assert_eq!(ruleset.default_division, "Scholastic A");
        assert!(ruleset.pod_rule.is_none());
        assert_eq!(ruleset.expand_abbreviation("io"), Some("Independent Open"));
    }

    #[test]
    fn empty_default_division_is_rejected() {
        assert!(Ruleset::from_yaml("default_division: ' '").is_err());
    }

    #[test]
    fn pod_rule_needs_event_type_and_division() {
        let ruleset = Ruleset::default();
        assert!(ruleset.pod_rule_for(Some("regional_plus"), "Scholastic A").is_some());
        assert!(ruleset.pod_rule_for(Some("regional_plus"), "Scholastic Open").is_none());
        assert!(ruleset.pod_rule_for(None, "Scholastic A").is_none());
        assert_eq!(ruleset.event_type_for_name("Dayton REGIONAL+"), Some("regional_plus".to_string()));
        assert_eq!(ruleset.event_type_for_name("Dayton Regional"), None);
    }

    #[test]
    fn abbreviations_prefer_longer() {
        let ruleset = Ruleset::default();
        let abbrs = ruleset.abbreviations_longest_first();
        let sra = abbrs.iter().position(|a| *a == "SRA").unwrap();
        let sa = abbrs.iter().position(|a| *a == "SA").unwrap();
        assert!(sra < sa);
    }

    #[test]
    fn shipped_ruleset_matches_defaults() {
        let ruleset = Ruleset::load(Path::new("ruleset.yaml")).unwrap();
        assert_eq!(ruleset, Ruleset::default());
    }
}
