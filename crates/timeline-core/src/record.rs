use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::calendar::inclusive_days;
use crate::datetime::record_date_serde;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    #[default]
    Project,
    Event,
}

impl RecordKind {
    pub fn as_key(self) -> &'static str {
        match self {
            RecordKind::Project => "project",
            RecordKind::Event => "event",
        }
    }

    pub fn from_key(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "project" | "projects" => Some(RecordKind::Project),
            "event" | "events" => Some(RecordKind::Event),
            _ => None,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

/// A project or event laid out on the timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub kind: RecordKind,

    #[serde(with = "record_date_serde")]
    pub start: NaiveDate,

    #[serde(with = "record_date_serde")]
    pub end: NaiveDate,

    #[serde(default)]
    pub group: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub color: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Record {
    pub fn new(id: impl Into<String>, title: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind: RecordKind::Project,
            start,
            end,
            group: None,
            tags: vec![],
            color: None,
            extra: BTreeMap::new(),
        }
    }

    /// Ordered `(first, last)` days covered by the record.
    pub fn span(&self) -> (NaiveDate, NaiveDate) {
        if self.end < self.start {
            (self.end, self.start)
        } else {
            (self.start, self.end)
        }
    }

    pub fn is_inverted(&self) -> bool {
        self.end < self.start
    }

    pub fn duration_days(&self) -> i64 {
        let (first, last) = self.span();
        inclusive_days(first, last)
    }

    pub fn overlaps(&self, first: NaiveDate, last: NaiveDate) -> bool {
        let (start, end) = self.span();
        start <= last && end >= first
    }

    pub fn is_active_on(&self, day: NaiveDate) -> bool {
        self.overlaps(day, day)
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
        Uint(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Int(n) => n.to_string(),
        RawId::Uint(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{Record, RecordKind};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn deserializes_numeric_ids_and_defaults() {
        let raw = r#"{"id": 42, "title": "Onboarding", "start": "2025-10-15", "end": "2025-10-20", "room": "B12"}"#;
        let record: Record = serde_json::from_str(raw).expect("parse record");
        assert_eq!(record.id, "42");
        assert_eq!(record.kind, RecordKind::Project);
        assert!(record.tags.is_empty());
        assert_eq!(record.extra.get("room"), Some(&serde_json::json!("B12")));
        assert_eq!(record.duration_days(), 6);
    }

    #[test]
    fn inverted_span_is_ordered() {
        let record = Record::new("x", "x", date(2025, 10, 20), date(2025, 10, 15));
        assert!(record.is_inverted());
        assert_eq!(record.span(), (date(2025, 10, 15), date(2025, 10, 20)));
        assert!(record.is_active_on(date(2025, 10, 17)));
    }

    #[test]
    fn serializes_plain_dates() {
        let mut record = Record::new("e1", "Kickoff", date(2025, 1, 2), date(2025, 1, 2));
        record.kind = RecordKind::Event;
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["start"], "2025-01-02");
        assert_eq!(json["kind"], "event");
    }
}
