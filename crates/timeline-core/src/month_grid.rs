//! Month calendar view: week rows of day cells with record segments stacked
//! into lanes per row.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

use crate::calendar::{add_days, checked_add_days, first_day_of_month, is_weekend, last_day_of_month, start_of_week, weekday_labels};
use crate::record::Record;
use crate::timeline::assign_lanes;

const MAX_WEEK_ROWS: i64 = 6;

#[derive(Debug, Clone, Serialize)]
pub struct DayCell {
    pub date: NaiveDate,
    pub in_month: bool,
    pub is_today: bool,
    pub is_weekend: bool,
}

/// The part of a record that falls inside one week row.
#[derive(Debug, Clone, Serialize)]
pub struct Segment {
    pub record_id: String,
    pub title: String,
    pub start_col: usize,
    pub span: usize,
    pub lane: usize,
    pub continues_before: bool,
    pub continues_after: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekRow {
    pub start: NaiveDate,
    pub days: Vec<DayCell>,
    pub segments: Vec<Segment>,
    pub lane_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthGrid {
    pub first: NaiveDate,
    pub last: NaiveDate,
    pub week_start: String,
    pub weekday_labels: Vec<&'static str>,
    pub weeks: Vec<WeekRow>,
}

impl MonthGrid {
    pub fn title(&self) -> String {
        self.first.format("%B %Y").to_string()
    }
}

#[tracing::instrument(skip(records), fields(count = records.len()))]
pub fn build_month_grid(focus: NaiveDate, records: &[Record], week_start: Weekday, today: NaiveDate) -> MonthGrid {
    let first = first_day_of_month(focus.year(), focus.month());
    let last = last_day_of_month(focus.year(), focus.month());
    let grid_start = start_of_week(first, week_start);

    let mut weeks = Vec::new();
    for row in 0..MAX_WEEK_ROWS {
        let Some(row_start) = checked_add_days(grid_start, row * 7) else {
            break;
        };
        let row_end = add_days(row_start, 6);
        if row_end < first || row_start > last {
            continue;
        }
        weeks.push(build_week_row(row_start, row_end, first, last, records, today));
    }

    tracing::debug!(weeks = weeks.len(), "built month grid");

    MonthGrid {
        first,
        last,
        week_start: format!("{week_start:?}"),
        weekday_labels: weekday_labels(week_start),
        weeks,
    }
}

fn build_week_row(
    row_start: NaiveDate,
    row_end: NaiveDate,
    month_first: NaiveDate,
    month_last: NaiveDate,
    records: &[Record],
    today: NaiveDate,
) -> WeekRow {
    let days = (0..7)
        .map(|offset| {
            let date = add_days(row_start, offset);
            DayCell {
                date,
                in_month: month_first <= date && date <= month_last,
                is_today: date == today,
                is_weekend: is_weekend(date),
            }
        })
        .collect();

    let hits: Vec<(&Record, NaiveDate, NaiveDate)> = records
        .iter()
        .filter(|record| record.overlaps(row_start, row_end))
        .map(|record| {
            let (first, last) = record.span();
            (record, first.max(row_start), last.min(row_end))
        })
        .collect();

    let spans: Vec<(NaiveDate, NaiveDate)> = hits.iter().map(|(_, first, last)| (*first, *last)).collect();
    let lanes = assign_lanes(&spans);

    let segments = hits
        .iter()
        .zip(lanes.lanes.iter())
        .map(|((record, first, last), &lane)| {
            let (record_first, record_last) = record.span();
            Segment {
                record_id: record.id.clone(),
                title: record.title.clone(),
                start_col: (*first - row_start).num_days() as usize,
                span: ((*last - *first).num_days() + 1) as usize,
                lane,
                continues_before: record_first < row_start,
                continues_after: record_last > row_end,
            }
        })
        .collect();

    WeekRow {
        start: row_start,
        days,
        segments,
        lane_count: lanes.lane_count,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Weekday};

    use super::build_month_grid;
    use crate::record::Record;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn grid_rows_cover_the_month() {
        let grid = build_month_grid(date(2026, 2, 15), &[], Weekday::Mon, date(2026, 2, 18));
        assert_eq!(grid.first, date(2026, 2, 1));
        assert_eq!(grid.weeks.len(), 5);
        assert_eq!(grid.weeks[0].start, date(2026, 1, 26));
        assert!(!grid.weeks[0].days[0].in_month);
        assert!(grid.weeks[0].days[6].in_month);
        assert_eq!(grid.title(), "February 2026");
        let todays: usize = grid
            .weeks
            .iter()
            .map(|w| w.days.iter().filter(|d| d.is_today).count())
            .sum();
        assert_eq!(todays, 1);
    }

    #[test]
    fn multi_week_record_is_split_into_segments() {
        let records = vec![
            Record::new("course", "Course", date(2025, 10, 8), date(2025, 10, 15)),
            Record::new("exam", "Exam", date(2025, 10, 9), date(2025, 10, 9)),
        ];
        let grid = build_month_grid(date(2025, 10, 1), &records, Weekday::Mon, date(2025, 1, 1));

        // Oct 6 - Oct 12
        let second = &grid.weeks[1];
        assert_eq!(second.start, date(2025, 10, 6));
        let course = second
            .segments
            .iter()
            .find(|s| s.record_id == "course")
            .expect("course segment");
        assert_eq!(course.start_col, 2);
        assert_eq!(course.span, 5);
        assert!(!course.continues_before);
        assert!(course.continues_after);
        assert_eq!(second.lane_count, 2);

        let third = &grid.weeks[2];
        let tail = third
            .segments
            .iter()
            .find(|s| s.record_id == "course")
            .expect("course tail");
        assert_eq!(tail.start_col, 0);
        assert_eq!(tail.span, 3);
        assert!(tail.continues_before);
        assert!(!tail.continues_after);
    }
}
