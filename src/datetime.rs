use chrono::{DateTime, FixedOffset, NaiveTime, SecondsFormat, TimeDelta};
use rocket::serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Copy)]
pub struct Timestamp(pub DateTime<FixedOffset>);
impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Local::now().fixed_offset()).trimmed_to_sec()
    }
    pub fn trimmed_to_sec(&self) -> Self {
        let nanos = self.0.timestamp_subsec_nanos();
        if let Some(dt) = self.0.checked_sub_signed(TimeDelta::nanoseconds(nanos as i64)) {
            Timestamp(dt)
        } else {
            *self
        }
    }
    pub fn to_iso_string(self) -> String {
        if self.0.timestamp_subsec_millis() == 0 {
            self.0.to_rfc3339_opts(SecondsFormat::Secs, true)
        } else {
            self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
        }
    }
    pub fn from_iso_string(datetime_str: &str) -> Result<Self, anyhow::Error> {
        let dt = DateTime::parse_from_rfc3339(datetime_str)?;
        Ok(Self(dt))
    }
}

impl From<DateTime<FixedOffset>> for Timestamp {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Self(value)
    }
}
impl<DB: sqlx::Database> sqlx::Type<DB> for Timestamp
where
    str: sqlx::Type<DB>,
{
    fn type_info() -> <DB as sqlx::Database>::TypeInfo {
        // TEXT columns only
        <&str as sqlx::Type<DB>>::type_info()
    }
}
impl<'r, DB: sqlx::Database> sqlx::Decode<'r, DB> for Timestamp
where
    &'r str: sqlx::Decode<'r, DB>,
{
    fn decode(value: <DB as sqlx::Database>::ValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let value = <&str as sqlx::Decode<DB>>::decode(value)?;
        Ok(Timestamp::from_iso_string(value)?)
    }
}

/// Parses a schedule time of day, `"1:15 PM"`, `"1:15PM"` or `"13:15"`.
pub fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    let s = s.trim().to_uppercase();
    let compact = s.replace(' ', "");
    for (text, format) in [
        (s.as_str(), "%I:%M %p"),
        (compact.as_str(), "%I:%M%p"),
        (s.as_str(), "%H:%M"),
        (s.as_str(), "%H:%M:%S"),
    ] {
        if let Ok(tm) = NaiveTime::parse_from_str(text, format) {
            return Some(tm)
        }
    }
    None
}

#[test]
fn test_trimmed_to_sec() {
    let dt = Timestamp::now();
    assert_eq!(dt.0.timestamp_subsec_nanos(), 0);
}

#[test]
fn test_parse_timestamp() {
    for (dtstr, dtstr2) in &[
        ("1970-03-05 14:32:45+00:00", "1970-03-05T14:32:45Z"),
        ("2025-03-05T14:32:45Z", "2025-03-05T14:32:45Z"),
        ("2025-03-05T14:32:45-05:00", "2025-03-05T14:32:45-05:00"),
        ("2025-03-17T21:27:04.095+01:00", "2025-03-17T21:27:04.095+01:00")
    ] {
        let dt = Timestamp::from_iso_string(dtstr)
            .map_err(|e| println!("parse {dtstr} error: {e}")).unwrap();
        assert_eq!(&dt.to_iso_string(), dtstr2)
    }
}

#[test]
fn test_parse_time_of_day() {
    for (s, expected) in &[
        ("1:15 PM", Some((13, 15))),
        ("1:15pm", Some((13, 15))),
        (" 09:05 AM ", Some((9, 5))),
        ("12:00 AM", Some((0, 0))),
        ("13:15", Some((13, 15))),
        ("Finished", None),
        ("", None),
    ] {
        let expected = expected.map(|(h, m)| NaiveTime::from_hms_opt(h, m, 0).unwrap());
        assert_eq!(parse_time_of_day(s), expected, "time: {s:?}");
    }
}
