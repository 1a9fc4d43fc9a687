use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::calendar::{first_day_of_month, last_day_of_month, shift_months};
use crate::record::Record;
use crate::timeline::Window;

const NO_VALUE: &str = "(none)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupBy {
    #[default]
    Group,
    Kind,
    Tag,
    Month,
}

impl FromStr for GroupBy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "group" | "groups" => Ok(GroupBy::Group),
            "kind" | "kinds" => Ok(GroupBy::Kind),
            "tag" | "tags" => Ok(GroupBy::Tag),
            "month" | "months" => Ok(GroupBy::Month),
            other => Err(anyhow!("unknown summary grouping: {other} (expected group, kind, tag or month)")),
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self {
            GroupBy::Group => "group",
            GroupBy::Kind => "kind",
            GroupBy::Tag => "tag",
            GroupBy::Month => "month",
        };
        f.write_str(key)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GroupSummary {
    pub key: String,
    pub count: usize,
    pub earliest_start: NaiveDate,
    pub latest_end: NaiveDate,
    pub total_days: i64,
    pub active_today: usize,
}

impl GroupSummary {
    fn new(key: String, record: &Record, today: NaiveDate) -> Self {
        let (first, last) = record.span();
        Self {
            key,
            count: 1,
            earliest_start: first,
            latest_end: last,
            total_days: record.duration_days(),
            active_today: usize::from(record.is_active_on(today)),
        }
    }

    fn absorb(&mut self, record: &Record, today: NaiveDate) {
        let (first, last) = record.span();
        self.count += 1;
        self.earliest_start = self.earliest_start.min(first);
        self.latest_end = self.latest_end.max(last);
        self.total_days += record.duration_days();
        self.active_today += usize::from(record.is_active_on(today));
    }
}

fn keys_for(record: &Record, group_by: GroupBy) -> Vec<String> {
    match group_by {
        GroupBy::Group => vec![record.group.clone().unwrap_or_else(|| NO_VALUE.to_string())],
        GroupBy::Kind => vec![record.kind.to_string()],
        GroupBy::Tag if record.tags.is_empty() => vec![NO_VALUE.to_string()],
        GroupBy::Tag => {
            let mut tags = record.tags.clone();
            tags.sort();
            tags.dedup();
            tags
        }
        GroupBy::Month => vec![record.span().0.format("%Y-%m").to_string()],
    }
}

/// Per-key totals, sorted by key.
#[tracing::instrument(skip(records), fields(count = records.len()))]
pub fn summarize(records: &[Record], group_by: GroupBy, today: NaiveDate) -> Vec<GroupSummary> {
    let mut groups: BTreeMap<String, GroupSummary> = BTreeMap::new();

    for record in records {
        for key in keys_for(record, group_by) {
            match groups.get_mut(&key) {
                Some(summary) => summary.absorb(record, today),
                None => {
                    groups.insert(key.clone(), GroupSummary::new(key, record, today));
                }
            }
        }
    }

    groups.into_values().collect()
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MonthLoad {
    pub month: String,
    pub records: usize,
}

/// Number of records overlapping each calendar month touched by `window`.
pub fn monthly_load(records: &[Record], window: &Window) -> Vec<MonthLoad> {
    let mut out = Vec::new();
    let mut month = first_day_of_month(window.start.year(), window.start.month());

    while month <= window.end {
        let month_last = last_day_of_month(month.year(), month.month());
        let count = records
            .iter()
            .filter(|record| record.overlaps(month, month_last))
            .count();
        out.push(MonthLoad {
            month: month.format("%Y-%m").to_string(),
            records: count,
        });
        match shift_months(month, 1) {
            Some(next) if next > month => month = next,
            _ => break,
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::record::RecordKind;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn sample() -> Vec<Record> {
        let mut a = Record::new("a", "Intro", date(2025, 10, 1), date(2025, 10, 5));
        a.group = Some("Ana".to_string());
        a.tags = vec!["onsite".to_string(), "intro".to_string()];

        let mut b = Record::new("b", "Advanced", date(2025, 11, 3), date(2025, 11, 4));
        b.group = Some("Ana".to_string());
        b.kind = RecordKind::Event;

        let mut c = Record::new("c", "Workshop", date(2025, 10, 3), date(2025, 10, 3));
        c.tags = vec!["onsite".to_string()];

        vec![a, b, c]
    }

    #[test]
    fn groups_by_group_with_fallback_key() {
        let summaries = summarize(&sample(), GroupBy::Group, date(2025, 10, 3));
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].key, "(none)");
        let ana = &summaries[1];
        assert_eq!(ana.key, "Ana");
        assert_eq!(ana.count, 2);
        assert_eq!(ana.earliest_start, date(2025, 10, 1));
        assert_eq!(ana.latest_end, date(2025, 11, 4));
        assert_eq!(ana.total_days, 7);
        assert_eq!(ana.active_today, 1);
    }

    #[test]
    fn tags_count_each_record_once_per_tag() {
        let summaries = summarize(&sample(), GroupBy::Tag, date(2025, 1, 1));
        let keys: Vec<_> = summaries.iter().map(|s| (s.key.as_str(), s.count)).collect();
        assert_eq!(keys, vec![("(none)", 1), ("intro", 1), ("onsite", 2)]);
    }

    #[test]
    fn month_buckets_use_start_month() {
        let summaries = summarize(&sample(), GroupBy::Month, date(2025, 1, 1));
        let keys: Vec<_> = summaries.iter().map(|s| (s.key.as_str(), s.count)).collect();
        assert_eq!(keys, vec![("2025-10", 2), ("2025-11", 1)]);
    }

    #[test]
    fn monthly_load_counts_overlaps() {
        let window = Window::new(date(2025, 9, 20), date(2025, 11, 2));
        let load = monthly_load(&sample(), &window);
        let rows: Vec<_> = load.iter().map(|m| (m.month.as_str(), m.records)).collect();
        assert_eq!(rows, vec![("2025-09", 0), ("2025-10", 2), ("2025-11", 1)]);
    }

    #[test]
    fn monthly_load_stops_at_the_last_date() {
        let max = NaiveDate::MAX;
        let records = vec![Record::new("late", "Late", max - chrono::Days::new(2), max)];
        let window = Window::new(max - chrono::Days::new(40), max);
        let counts: Vec<usize> = monthly_load(&records, &window).iter().map(|m| m.records).collect();
        assert_eq!(counts, vec![0, 1]);
    }

    #[test]
    fn parses_grouping_names() {
        assert_eq!("tags".parse::<GroupBy>().expect("tag"), GroupBy::Tag);
        assert!("instructor".parse::<GroupBy>().is_err());
    }
}
