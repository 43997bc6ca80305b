use once_cell::sync::Lazy;
use regex::Regex;
use crate::ruleset::Ruleset;
use crate::util::normalize_ws;

static ROUND_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*round\s*\d+\s*$").expect("static regex"));
static QUALIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*(?:-|\()?\s*(?:prelims?|finals?|round\s*\d+|semi.*)\)?").expect("static regex")
});
static ROUND_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)round\D*(\d+)").expect("static regex"));

/// Rewrites a scraped class label to its canonical division.
/// Never returns an empty string.
pub fn normalize_class(raw: &str, rules: &Ruleset) -> String {
    if ROUND_ONLY.is_match(raw) {
        return rules.default_division.clone();
    }
    let stripped = QUALIFIER.replace_all(raw, "");
    let stripped = normalize_ws(&stripped);
    let stripped = stripped.trim_matches(|c: char| c == '-' || c.is_whitespace());
    if stripped.is_empty() {
        return rules.default_division.clone();
    }
    match rules.expand_abbreviation(stripped) {
        Some(full) => full.to_string(),
        None => stripped.to_string(),
    }
}

/// Round number carried by a raw class label, `"SA - Round 2"` -> `2`.
pub fn round_number(raw: &str) -> Option<u32> {
    ROUND_NUMBER.captures(raw)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
