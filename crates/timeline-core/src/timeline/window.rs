use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Granularity;
use crate::calendar::{add_days, first_day_of_month, inclusive_days, last_day_of_month};
use crate::record::Record;

/// Inclusive range of days visible on a timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Window {
    pub fn new(a: NaiveDate, b: NaiveDate) -> Self {
        if b < a {
            Self { start: b, end: a }
        } else {
            Self { start: a, end: b }
        }
    }

    /// The calendar month containing `date`.
    pub fn month_of(date: NaiveDate) -> Self {
        Self {
            start: first_day_of_month(date.year(), date.month()),
            end: last_day_of_month(date.year(), date.month()),
        }
    }

    /// Inclusive day count; at least 1.
    pub fn day_count(&self) -> i64 {
        inclusive_days(self.start, self.end)
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Days from the window start to `day`; negative before the window.
    pub fn offset_of(&self, day: NaiveDate) -> i64 {
        (day - self.start).num_days()
    }
}

/// Resolves the visible window using the default padding for `granularity`.
pub fn resolve_window(records: &[Record], granularity: Granularity, today: NaiveDate) -> Window {
    resolve_window_padded(records, granularity.default_padding_days(), today)
}

/// Covers every record span plus `padding_days` on each side. An empty input
/// falls back to the month containing `today`.
#[tracing::instrument(skip(records), fields(count = records.len()))]
pub fn resolve_window_padded(records: &[Record], padding_days: i64, today: NaiveDate) -> Window {
    let bounds = records.iter().map(Record::span).fold(None, |acc, (first, last)| match acc {
        None => Some((first, last)),
        Some((lo, hi)) => Some((first.min(lo), last.max(hi))),
    });

    let Some((lo, hi)) = bounds else {
        debug!(%today, "no records; using current month");
        return Window::month_of(today);
    };

    let padding = padding_days.max(0);
    let window = Window::new(add_days(lo, -padding), add_days(hi, padding));
    debug!(start = %window.start, end = %window.end, padding, "resolved window");
    window
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn empty_input_is_current_month() {
        let window = resolve_window(&[], Granularity::Week, date(2025, 2, 14));
        assert_eq!(window, Window::new(date(2025, 2, 1), date(2025, 2, 28)));
    }

    #[test]
    fn window_covers_all_records_plus_padding() {
        let records = vec![
            Record::new("a", "a", date(2025, 10, 15), date(2025, 10, 20)),
            Record::new("b", "b", date(2025, 10, 2), date(2025, 10, 9)),
            Record::new("c", "c", date(2025, 11, 3), date(2025, 10, 25)),
        ];
        let today = date(2025, 1, 1);

        let day = resolve_window(&records, Granularity::Day, today);
        assert_eq!(day, Window::new(date(2025, 9, 29), date(2025, 11, 6)));

        let month = resolve_window(&records, Granularity::Month, today);
        assert_eq!(month.start, date(2025, 9, 2));
        assert_eq!(month.end, date(2025, 12, 3));

        for record in &records {
            let (first, last) = record.span();
            assert!(month.start <= first);
            assert!(month.end >= last);
        }
    }

    #[test]
    fn single_day_window_has_one_day() {
        let records = vec![Record::new("a", "a", date(2025, 3, 3), date(2025, 3, 3))];
        let window = resolve_window_padded(&records, 0, date(2025, 1, 1));
        assert_eq!(window.day_count(), 1);
        assert!(window.contains(date(2025, 3, 3)));
    }
}
