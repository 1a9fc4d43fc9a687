use std::fs;

use chrono::NaiveDate;
use tempfile::tempdir;
use timeline_core::filter::Filter;
use timeline_core::month_grid::build_month_grid;
use timeline_core::render::Renderer;
use timeline_core::source::{load_records, write_output_atomic};
use timeline_core::summary::{GroupBy, summarize};
use timeline_core::timeline::{Granularity, WindowOverride, build_layout, generate_headers, resolve_window};
use timeline_core::{RecordKind, TimelineSettings};

const RECORDS: &str = r#"
{"id": 1, "title": "Forklift certification", "kind": "project", "start": "2025-10-15", "end": "2025-10-20", "group": "Ana", "tags": ["onsite"]}
{"id": 2, "title": "Safety refresher", "kind": "event", "start": "2025-10-17T09:00:00Z", "end": "2025-10-17T12:00:00Z", "group": "Ben"}
{"id": 3, "title": "Leadership track", "start": "2025-10-01", "end": "2025-10-31", "group": "Ana", "tags": ["remote"]}
"#;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[test]
fn load_filter_layout_and_write() {
    let temp = tempdir().expect("tempdir");
    let input = temp.path().join("records.jsonl");
    fs::write(&input, RECORDS).expect("write records");

    let records = load_records(&input).expect("load records");
    assert_eq!(records.len(), 3);
    assert_eq!(records[1].kind, RecordKind::Event);
    assert_eq!(records[1].start, date(2025, 10, 17));

    let today = date(2025, 10, 16);
    let filter = Filter::parse(&["group:ana".to_string()], today).expect("parse filter");
    let ana = filter.apply(records.clone());
    assert_eq!(ana.len(), 2);

    let window = WindowOverride {
        from: Some(date(2025, 10, 1)),
        to: Some(date(2025, 10, 31)),
    };
    let layout = build_layout(&ana, &TimelineSettings::default(), today, window);
    assert_eq!(layout.columns.len(), 31);
    let bar = layout.bar("1").expect("forklift bar");
    assert!((bar.left - 1400.0).abs() < 1e-6);
    assert!((bar.width - 600.0).abs() < 1e-6);
    assert_eq!(layout.lane_count, 2);

    let mut rendered = Vec::new();
    Renderer::plain().write_layout(&mut rendered, &layout).expect("render layout");
    let out = temp.path().join("out").join("layout.txt");
    fs::create_dir_all(out.parent().expect("parent")).expect("mkdir");
    write_output_atomic(&out, &rendered).expect("write output");
    let written = fs::read_to_string(&out).expect("read output");
    assert!(written.contains("Forklift certification"));
}

#[test]
fn resolved_window_properties_hold_for_every_granularity() {
    let temp = tempdir().expect("tempdir");
    let input = temp.path().join("records.json");
    let array = format!(
        "[{}]",
        RECORDS
            .lines()
            .filter(|l| !l.trim().is_empty())
            .collect::<Vec<_>>()
            .join(",")
    );
    fs::write(&input, array).expect("write array");
    let records = load_records(&input).expect("load array");
    let today = date(2025, 10, 16);

    for granularity in Granularity::ALL {
        let window = resolve_window(&records, granularity, today);
        for record in &records {
            let (first, last) = record.span();
            assert!(window.start <= first, "{granularity}: start");
            assert!(window.end >= last, "{granularity}: end");
        }

        let settings = TimelineSettings {
            granularity,
            ..TimelineSettings::default()
        };
        let layout = build_layout(&records, &settings, today, WindowOverride::default());
        assert_eq!(layout.window, window);
        for bar in &layout.bars {
            assert!(bar.left >= 0.0);
            assert!(bar.left + bar.width <= layout.total_width + 1e-6);
        }

        let columns = generate_headers(&window, granularity, settings.week_start, today);
        if granularity == Granularity::Day {
            assert_eq!(columns.len() as i64, window.day_count());
        }
        assert_eq!(columns.iter().filter(|c| c.is_today).count(), 1);
    }
}

#[test]
fn month_grid_and_summary_views() {
    let temp = tempdir().expect("tempdir");
    let input = temp.path().join("records.jsonl");
    fs::write(&input, RECORDS).expect("write records");
    let records = load_records(&input).expect("load records");
    let today = date(2025, 10, 16);

    let grid = build_month_grid(today, &records, chrono::Weekday::Mon, today);
    let leadership_rows = grid
        .weeks
        .iter()
        .filter(|week| week.segments.iter().any(|s| s.record_id == "3"))
        .count();
    assert_eq!(leadership_rows, grid.weeks.len());

    let summaries = summarize(&records, GroupBy::Group, today);
    let ana = summaries.iter().find(|s| s.key == "Ana").expect("Ana");
    assert_eq!(ana.count, 2);
    assert_eq!(ana.total_days, 6 + 31);
    assert_eq!(ana.active_today, 2);
}
