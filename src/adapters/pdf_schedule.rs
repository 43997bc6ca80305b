use anyhow::bail;
use once_cell::sync::Lazy;
use regex::Regex;
use crate::adapters::{Document, DocumentError, SourceAdapter};
use crate::roster::ScheduleRow;
use crate::ruleset::Ruleset;
use crate::util::normalize_ws;

// watermark letters come out as very short lines
const MIN_LINE_LEN: usize = 5;

static STATE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(\w{2}\)").expect("static regex"));
static ZIP_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{5}\b").expect("static regex"));
static LEADING_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\s+").expect("static regex"));
static TRUNCATED_TAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s+from\s+\w+(?:…|\.\.\.)?$").expect("static regex"));
const TIME: &str = r"(\d{1,2}:\d{2})\s*([AP]M)";

fn abbreviation_alternation(rules: &Ruleset) -> anyhow::Result<String> {
    let abbrs = rules.abbreviations_longest_first();
    if abbrs.is_empty() {
        bail!("class_abbreviations must not be empty");
    }
    Ok(abbrs.iter().map(|a| regex::escape(a)).collect::<Vec<_>>().join("|"))
}

fn format_time(hm: &str, meridiem: &str) -> String {
    format!("{hm} {}", meridiem.to_uppercase())
}

/// Line grammar of a prelims schedule PDF:
/// `<name, city, state> <class abbreviation> [- ROUND <n>] <h:mm AM|PM>`.
pub struct PdfScheduleAdapter {
    line: Regex,
    org_unit: Option<Regex>,
}

impl PdfScheduleAdapter {
    pub fn new(rules: &Ruleset) -> anyhow::Result<Self> {
        let abbrs = abbreviation_alternation(rules)?;
        let line = Regex::new(&format!(r"(?i)^(.*?)\s+({abbrs})(?:\s*-\s*ROUND\D*(\d+))?\s+{TIME}$"))?;
        let keywords = rules.org_keywords.join("|");
        let org_unit = if keywords.is_empty() {
            None
        } else {
            Some(Regex::new(&format!(r"(?i)^.*?\b(?:{keywords})\b(?:\s+(?:JV|Varsity|(?-i:[A-Z]))\b)?"))?)
        };
        Ok(Self { line, org_unit })
    }

    /// Parses one text line; `None` for anything that is not a schedule entry.
    pub fn parse_schedule_line(&self, line: &str) -> Option<ScheduleRow> {
        let line = line.trim();
        if line.chars().count() < MIN_LINE_LEN {
            return None
        }
        let caps = self.line.captures(line)?;
        let abbr = caps.get(2)?.as_str().to_uppercase();
        let class_raw = match caps.get(3) {
            Some(round) => format!("{abbr} - Round {}", round.as_str()),
            None => abbr,
        };
        let time = format_time(caps.get(4)?.as_str(), caps.get(5)?.as_str());
        let competitor = self.clean_competitor_name(caps.get(1)?.as_str());
        if competitor.is_empty() {
            return None
        }
        Some(ScheduleRow { competitor, class_raw, time })
    }

    /// Cuts the location and layout debris off the text in front of the class column.
    pub fn clean_competitor_name(&self, prefix: &str) -> String {
        let prefix = normalize_ws(prefix);
        let name = match prefix.rsplit_once(',') {
            Some((before_state, _)) => {
                let before_state = STATE_CODE.replace_all(before_state, "");
                let before_state = normalize_ws(&ZIP_CODE.replace_all(&before_state, ""));
                match self.org_unit.as_ref().and_then(|re| re.find(&before_state)) {
                    Some(m) => m.as_str().to_string(),
                    None => match before_state.rsplit_once(' ') {
                        Some((head, _city)) => head.to_string(),
                        None => before_state.clone(),
                    },
                }
            }
            None => prefix.clone(),
        };
        let name = strip_glued_capital(name.trim_end_matches(',').trim());
        let name = LEADING_DIGITS.replace(name, "");
        let name = TRUNCATED_TAIL.replace(&name, "");
        normalize_ws(&name)
    }
}

/// `"DEast Lincoln"` -> `"East Lincoln"`; a stray capital glued to a capitalised word.
fn strip_glued_capital(name: &str) -> &str {
    let mut chars = name.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(a), Some(b), Some(c)) if a.is_ascii_uppercase() && b.is_ascii_uppercase() && c.is_lowercase() => &name[1..],
        _ => name,
    }
}

impl SourceAdapter for PdfScheduleAdapter {
    type Record = ScheduleRow;

    fn name(&self) -> &'static str {
        "PDF schedule adapter"
    }

    fn records<'d>(&'d self, doc: &'d Document) -> Result<Box<dyn Iterator<Item = ScheduleRow> + 'd>, DocumentError> {
        let text = doc.text(self.name())?;
        Ok(Box::new(text.lines().filter_map(move |line| self.parse_schedule_line(line))))
    }
}

/// Finals schedules only matter for their class column: `... <class abbreviation> <time>`.
pub struct PdfFinalsAdapter {
    line: Regex,
}

impl PdfFinalsAdapter {
    pub fn new(rules: &Ruleset) -> anyhow::Result<Self> {
        let abbrs = abbreviation_alternation(rules)?;
        let line = Regex::new(&format!(r"(?i)\b({abbrs})(?:\s*-\s*ROUND\D*\d+)?\s+{TIME}$"))?;
        Ok(Self { line })
    }

    pub fn parse_finals_line(&self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.chars().count() < MIN_LINE_LEN {
            return None
        }
        self.line.captures(line)
            .and_then(|caps| caps.get(1))
            .map(|abbr| abbr.as_str().to_uppercase())
    }
}

impl SourceAdapter for PdfFinalsAdapter {
    type Record = String;

    fn name(&self) -> &'static str {
        "PDF finals adapter"
    }

    fn records<'d>(&'d self, doc: &'d Document) -> Result<Box<dyn Iterator<Item = String> + 'd>, DocumentError> {
        let text = doc.text(self.name())?;
        Ok(Box::new(text.lines().filter_map(move |line| self.parse_finals_line(line))))
    }
}
