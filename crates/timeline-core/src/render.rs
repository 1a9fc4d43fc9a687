use std::io::Write;

use anyhow::anyhow;
use unicode_width::UnicodeWidthStr;

use crate::calendar::add_days;
use crate::config::Config;
use crate::month_grid::MonthGrid;
use crate::record::Record;
use crate::summary::{GroupSummary, MonthLoad};
use crate::timeline::{Column, TimelineLayout, Window};

const DEFAULT_CELL_CHARS: usize = 3;
const MAX_CELL_CHARS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let raw = cfg.get("output.format").unwrap_or_else(|| "table".to_string());
        match raw.trim().to_ascii_lowercase().as_str() {
            "table" | "text" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            other => Err(anyhow!("invalid output.format: {other} (expected table or json)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    cell_chars: usize,
}

impl Renderer {
    /// `terminal` says whether output ends up on an interactive stdout.
    pub fn new(cfg: &Config, terminal: bool) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        let cell_chars = match cfg.get_parsed::<usize>("render.cell_chars")? {
            Some(0) => return Err(anyhow!("render.cell_chars must be at least 1")),
            Some(n) => n.min(MAX_CELL_CHARS),
            None => DEFAULT_CELL_CHARS,
        };

        Ok(Self {
            color: color && terminal,
            cell_chars,
        })
    }

    pub fn plain() -> Self {
        Self {
            color: false,
            cell_chars: DEFAULT_CELL_CHARS,
        }
    }

    #[tracing::instrument(skip(self, out, layout))]
    pub fn write_layout<W: Write>(&self, mut out: W, layout: &TimelineLayout) -> anyhow::Result<()> {
        writeln!(
            out,
            "{} {} .. {} ({} days, {} columns, {:.0}px)",
            layout.granularity,
            layout.window.start,
            layout.window.end,
            layout.window.day_count(),
            layout.columns.len(),
            layout.total_width
        )?;

        let strip_chars = layout.columns.len() * self.cell_chars;
        let scale = if layout.total_width > 0.0 {
            strip_chars as f64 / layout.total_width
        } else {
            0.0
        };

        let headers = vec![
            "ID".to_string(),
            "Title".to_string(),
            "Start".to_string(),
            "End".to_string(),
            "Left".to_string(),
            "Width".to_string(),
            "Lane".to_string(),
            self.column_ruler(&layout.columns),
        ];

        let rows = layout
            .bars
            .iter()
            .map(|bar| {
                let first = (bar.left * scale).round().max(0.0) as usize;
                let len = ((bar.width * scale).round() as usize).max(1);
                let first = first.min(strip_chars.saturating_sub(1));
                let len = len.min(strip_chars.saturating_sub(first)).max(1);
                let mut strip = String::with_capacity(strip_chars);
                strip.push_str(&" ".repeat(first));
                strip.push_str(&"#".repeat(len));
                strip.push_str(&" ".repeat(strip_chars.saturating_sub(first + len)));
                if bar.clipped_start && !strip.is_empty() {
                    strip.replace_range(0..1, "<");
                }
                if bar.clipped_end && !strip.is_empty() {
                    let last = strip.len() - 1;
                    strip.replace_range(last.., ">");
                }

                vec![
                    bar.record_id.clone(),
                    bar.title.clone(),
                    bar.start.to_string(),
                    bar.end.to_string(),
                    format!("{:.1}", bar.left),
                    format!("{:.1}", bar.width),
                    bar.lane.to_string(),
                    self.paint(&strip, "36"),
                ]
            })
            .collect();

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    fn column_ruler(&self, columns: &[Column]) -> String {
        let mut ruler = String::with_capacity(columns.len() * self.cell_chars);
        for column in columns {
            let mut cell: String = column.label.chars().take(self.cell_chars).collect();
            let width = UnicodeWidthStr::width(cell.as_str());
            cell.push_str(&" ".repeat(self.cell_chars.saturating_sub(width)));
            ruler.push_str(&cell);
        }
        ruler
    }

    #[tracing::instrument(skip(self, out, columns))]
    pub fn write_headers<W: Write>(&self, mut out: W, columns: &[Column]) -> anyhow::Result<()> {
        let headers = vec![
            "#".to_string(),
            "Label".to_string(),
            "Sublabel".to_string(),
            "Start".to_string(),
            "End".to_string(),
            "Flags".to_string(),
        ];

        let rows = columns
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                let mut flags = Vec::new();
                if column.is_weekend {
                    flags.push("weekend");
                }
                if column.is_today {
                    flags.push("today");
                }
                let label = if column.is_today {
                    self.paint(&column.label, "1;33")
                } else if column.is_weekend {
                    self.paint(&column.label, "2")
                } else {
                    column.label.clone()
                };
                vec![
                    idx.to_string(),
                    label,
                    column.sublabel.clone(),
                    column.start.to_string(),
                    column.end.to_string(),
                    flags.join(","),
                ]
            })
            .collect();

        write_table(&mut out, headers, rows)
    }

    pub fn write_window<W: Write>(&self, mut out: W, window: &Window) -> anyhow::Result<()> {
        writeln!(out, "start  {}", window.start)?;
        writeln!(out, "end    {}", window.end)?;
        writeln!(out, "days   {}", window.day_count())?;
        Ok(())
    }

    #[tracing::instrument(skip(self, out, grid))]
    pub fn write_month<W: Write>(&self, mut out: W, grid: &MonthGrid) -> anyhow::Result<()> {
        writeln!(out, "{}", grid.title())?;

        let headers: Vec<String> = grid.weekday_labels.iter().map(|s| s.to_string()).collect();
        let rows = grid
            .weeks
            .iter()
            .map(|week| {
                week.days
                    .iter()
                    .enumerate()
                    .map(|(col, day)| {
                        let count = week
                            .segments
                            .iter()
                            .filter(|s| s.start_col <= col && col < s.start_col + s.span)
                            .count();
                        let mut cell = day.date.format("%d").to_string();
                        if !day.in_month {
                            cell = format!("({cell})");
                        }
                        if count > 0 {
                            cell.push_str(&format!(" *{count}"));
                        }
                        if day.is_today {
                            self.paint(&cell, "1;33")
                        } else {
                            cell
                        }
                    })
                    .collect()
            })
            .collect();
        write_table(&mut out, headers, rows)?;

        for week in &grid.weeks {
            for segment in &week.segments {
                writeln!(
                    out,
                    "{} +{}d lane {} {}{}{}",
                    add_days(week.start, segment.start_col as i64),
                    segment.span,
                    segment.lane,
                    if segment.continues_before { "<" } else { "" },
                    segment.title,
                    if segment.continues_after { ">" } else { "" },
                )?;
            }
        }
        Ok(())
    }

    pub fn write_summary<W: Write>(&self, mut out: W, summaries: &[GroupSummary]) -> anyhow::Result<()> {
        let headers = vec![
            "Key".to_string(),
            "Count".to_string(),
            "Earliest".to_string(),
            "Latest".to_string(),
            "Days".to_string(),
            "Active".to_string(),
        ];
        let rows = summaries
            .iter()
            .map(|s| {
                vec![
                    s.key.clone(),
                    s.count.to_string(),
                    s.earliest_start.to_string(),
                    s.latest_end.to_string(),
                    s.total_days.to_string(),
                    s.active_today.to_string(),
                ]
            })
            .collect();
        write_table(&mut out, headers, rows)
    }

    pub fn write_monthly_load<W: Write>(&self, mut out: W, load: &[MonthLoad]) -> anyhow::Result<()> {
        let headers = vec!["Month".to_string(), "Records".to_string(), String::new()];
        let rows = load
            .iter()
            .map(|m| vec![m.month.clone(), m.records.to_string(), "=".repeat(m.records)])
            .collect();
        write_table(&mut out, headers, rows)
    }

    pub fn write_records<W: Write>(&self, mut out: W, records: &[Record]) -> anyhow::Result<()> {
        let headers = vec![
            "ID".to_string(),
            "Kind".to_string(),
            "Start".to_string(),
            "End".to_string(),
            "Group".to_string(),
            "Title".to_string(),
            "Tags".to_string(),
        ];
        let rows = records
            .iter()
            .map(|record| {
                let (first, last) = record.span();
                vec![
                    self.paint(&record.id, "33"),
                    record.kind.to_string(),
                    first.to_string(),
                    last.to_string(),
                    record.group.clone().unwrap_or_default(),
                    record.title.clone(),
                    record
                        .tags
                        .iter()
                        .map(|tag| format!("+{tag}"))
                        .collect::<Vec<_>>()
                        .join(" "),
                ]
            })
            .collect();
        write_table(&mut out, headers, rows)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(mut writer: W, headers: Vec<String>, rows: Vec<Vec<String>>) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
