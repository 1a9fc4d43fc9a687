use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::{Granularity, Window};
use crate::calendar::{add_days, checked_add_days, first_day_of_month, is_weekend, last_day_of_month, start_of_week, weekday_short};

/// One header column of the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub label: String,
    pub sublabel: String,
    pub is_weekend: bool,
    pub is_today: bool,
}

impl Column {
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

/// Ordered, non-overlapping columns spanning `window`. Week and month columns
/// cover whole weeks / months, so the first and last may extend past the
/// window.
#[tracing::instrument(skip(window), fields(start = %window.start, end = %window.end))]
pub fn generate_headers(window: &Window, granularity: Granularity, week_start: Weekday, today: NaiveDate) -> Vec<Column> {
    let columns = match granularity {
        Granularity::Day => day_columns(window, today),
        Granularity::Week => week_columns(window, week_start, today),
        Granularity::Month => month_columns(window, today),
    };
    tracing::debug!(count = columns.len(), "generated header columns");
    columns
}

fn day_columns(window: &Window, today: NaiveDate) -> Vec<Column> {
    let mut out = Vec::with_capacity(window.day_count() as usize);
    let mut day = window.start;
    while day <= window.end {
        out.push(Column {
            start: day,
            end: day,
            label: day.day().to_string(),
            sublabel: weekday_short(day.weekday()).to_string(),
            is_weekend: is_weekend(day),
            is_today: day == today,
        });
        let Some(next) = day.succ_opt() else {
            break;
        };
        day = next;
    }
    out
}

fn week_columns(window: &Window, week_start: Weekday, today: NaiveDate) -> Vec<Column> {
    let mut out = Vec::new();
    let mut start = start_of_week(window.start, week_start);
    while start <= window.end {
        let end = add_days(start, 6);
        out.push(Column {
            start,
            end,
            label: format!("W{:02}", start.iso_week().week()),
            sublabel: format!("{} - {}", start.format("%b %d"), end.format("%b %d")),
            is_weekend: false,
            is_today: start <= today && today <= end,
        });
        let Some(next) = checked_add_days(start, 7) else {
            break;
        };
        start = next;
    }
    out
}

fn month_columns(window: &Window, today: NaiveDate) -> Vec<Column> {
    let mut out = Vec::new();
    let mut start = first_day_of_month(window.start.year(), window.start.month());
    while start <= window.end {
        let end = last_day_of_month(start.year(), start.month());
        out.push(Column {
            start,
            end,
            label: start.format("%b").to_string(),
            sublabel: start.year().to_string(),
            is_weekend: false,
            is_today: start <= today && today <= end,
        });
        let Some(next) = end.succ_opt() else {
            break;
        };
        start = next;
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Weekday};

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn day_columns_match_inclusive_day_count() {
        let window = Window::new(date(2025, 10, 1), date(2025, 10, 31));
        let columns = generate_headers(&window, Granularity::Day, Weekday::Mon, date(2025, 10, 15));
        assert_eq!(columns.len() as i64, window.day_count());
        assert_eq!(columns[0].label, "1");
        assert_eq!(columns[0].sublabel, "Wed");
        assert!(columns[3].is_weekend);
        assert_eq!(columns.iter().filter(|c| c.is_today).count(), 1);
        assert!(columns[14].is_today);
    }

    #[test]
    fn week_columns_align_to_week_start() {
        let window = Window::new(date(2025, 10, 1), date(2025, 10, 31));
        let columns = generate_headers(&window, Granularity::Week, Weekday::Mon, date(2025, 1, 1));
        assert_eq!(columns.len(), 5);
        assert_eq!(columns[0].start, date(2025, 9, 29));
        assert_eq!(columns[4].end, date(2025, 11, 2));
        assert_eq!(columns[0].label, "W40");
        for pair in columns.windows(2) {
            assert_eq!(add_days(pair[0].end, 1), pair[1].start);
        }

        let sunday = generate_headers(&window, Granularity::Week, Weekday::Sun, date(2025, 1, 1));
        assert_eq!(sunday[0].start, date(2025, 9, 28));
    }

    #[test]
    fn columns_stop_at_the_last_date() {
        let max = NaiveDate::MAX;
        let window = Window::new(max - chrono::Days::new(40), max);
        let today = date(2025, 1, 1);

        let days = generate_headers(&window, Granularity::Day, Weekday::Mon, today);
        assert_eq!(days.len(), 41);
        assert_eq!(days.last().map(|c| c.end), Some(max));

        let weeks = generate_headers(&window, Granularity::Week, Weekday::Mon, today);
        assert!(weeks.len() <= 8);
        assert!(weeks.iter().all(|c| c.start <= c.end));
        for pair in weeks.windows(2) {
            assert!(pair[0].end < pair[1].start);
        }

        let months = generate_headers(&window, Granularity::Month, Weekday::Mon, today);
        assert_eq!(months.len(), 2);
        assert_eq!(months[1].end, max);
    }

    #[test]
    fn month_columns_cover_touched_months() {
        let window = Window::new(date(2025, 11, 20), date(2026, 2, 3));
        let columns = generate_headers(&window, Granularity::Month, Weekday::Mon, date(2026, 1, 9));
        let labels: Vec<_> = columns.iter().map(|c| format!("{} {}", c.label, c.sublabel)).collect();
        assert_eq!(labels, vec!["Nov 2025", "Dec 2025", "Jan 2026", "Feb 2026"]);
        assert!(columns[2].is_today);
        assert_eq!(columns[1].end, date(2025, 12, 31));
    }
}
