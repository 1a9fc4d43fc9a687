use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use super::position::position_for;
use super::window::resolve_window_padded;
use super::{Column, Granularity, Window, assign_lanes, generate_headers};
use crate::record::{Record, RecordKind};
use crate::settings::TimelineSettings;

/// Explicit bounds that replace the resolved window edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowOverride {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl WindowOverride {
    pub fn is_empty(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    fn apply(&self, resolved: Window) -> Window {
        Window::new(self.from.unwrap_or(resolved.start), self.to.unwrap_or(resolved.end))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Bar {
    pub record_id: String,
    pub title: String,
    pub kind: RecordKind,
    pub group: Option<String>,
    pub color: Option<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub left: f64,
    pub width: f64,
    pub lane: usize,
    pub clipped_start: bool,
    pub clipped_end: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelineLayout {
    pub granularity: Granularity,
    pub window: Window,
    pub today: NaiveDate,
    pub columns: Vec<Column>,
    pub column_width: f64,
    pub total_width: f64,
    pub bars: Vec<Bar>,
    pub lane_count: usize,
}

impl TimelineLayout {
    pub fn bar(&self, record_id: &str) -> Option<&Bar> {
        self.bars.iter().find(|bar| bar.record_id == record_id)
    }
}

/// Computes the complete timeline for `records`. Pure; callers rebuild it
/// whenever the records, settings or date change.
#[tracing::instrument(skip(records, settings), fields(count = records.len(), granularity = %settings.granularity))]
pub fn build_layout(
    records: &[Record],
    settings: &TimelineSettings,
    today: NaiveDate,
    window_override: WindowOverride,
) -> TimelineLayout {
    let granularity = settings.granularity;
    let resolved = resolve_window_padded(records, settings.padding.get(granularity), today);
    let window = window_override.apply(resolved);
    if !window_override.is_empty() {
        debug!(start = %window.start, end = %window.end, "applied window override");
    }

    let columns = generate_headers(&window, granularity, settings.week_start, today);
    let column_width = settings.column_width.get(granularity);
    let total_width = columns.len() as f64 * column_width;

    let visible: Vec<&Record> = if settings.clip {
        records
            .iter()
            .filter(|record| record.overlaps(window.start, window.end))
            .collect()
    } else {
        records.iter().collect()
    };

    let spans: Vec<(NaiveDate, NaiveDate)> = visible.iter().map(|record| record.span()).collect();
    let lanes = assign_lanes(&spans);

    let bars = visible
        .iter()
        .zip(lanes.lanes.iter())
        .map(|(record, &lane)| {
            let (first, last) = record.span();
            let raw = position_for(first, last, &window, total_width);
            let (position, clipped_start, clipped_end) = if settings.clip {
                let clipped = raw.clip(total_width);
                (clipped.position, clipped.clipped_start, clipped.clipped_end)
            } else {
                (raw, false, false)
            };

            Bar {
                record_id: record.id.clone(),
                title: record.title.clone(),
                kind: record.kind,
                group: record.group.clone(),
                color: record.color.clone(),
                start: first,
                end: last,
                left: position.left,
                width: position.width,
                lane,
                clipped_start,
                clipped_end,
            }
        })
        .collect::<Vec<_>>();

    info!(
        start = %window.start,
        end = %window.end,
        columns = columns.len(),
        bars = bars.len(),
        lanes = lanes.lane_count,
        "built timeline layout"
    );

    TimelineLayout {
        granularity,
        window,
        today,
        columns,
        column_width,
        total_width,
        bars,
        lane_count: lanes.lane_count,
    }
}
