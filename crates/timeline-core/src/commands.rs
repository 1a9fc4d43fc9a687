use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::cli::Invocation;
use crate::config::{Config, resolve_input_path};
use crate::datetime::parse_date_expr;
use crate::filter::Filter;
use crate::month_grid::build_month_grid;
use crate::record::Record;
use crate::render::{OutputFormat, Renderer};
use crate::settings::TimelineSettings;
use crate::source::{load_records, write_output_atomic};
use crate::summary::{GroupBy, monthly_load, summarize};
use crate::timeline::{Window, WindowOverride, build_layout};

/// Everything a command needs besides its own arguments.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub cfg: Config,
    pub settings: TimelineSettings,
    pub today: NaiveDate,
    pub window_override: WindowOverride,
    pub input: Option<PathBuf>,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
    pub renderer: Renderer,
}

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "layout",
        "headers",
        "window",
        "month",
        "summary",
        "records",
        "_commands",
        "_show",
        "help",
        "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(ctx, inv))]
pub fn dispatch(ctx: &RunContext, inv: Invocation) -> anyhow::Result<()> {
    let command = inv.command.as_str();
    debug!(
        command,
        filter = ?inv.filter_terms,
        args = ?inv.command_args,
        "dispatching command"
    );

    let rendered = match command {
        "layout" => cmd_layout(ctx, &inv.filter_terms)?,
        "headers" => cmd_headers(ctx, &inv.filter_terms)?,
        "window" => cmd_window(ctx, &inv.filter_terms)?,
        "month" => cmd_month(ctx, &inv.filter_terms, &inv.command_args)?,
        "summary" => cmd_summary(ctx, &inv.filter_terms, &inv.command_args)?,
        "records" => cmd_records(ctx, &inv.filter_terms)?,
        "_commands" => known_command_names().join("\n").into_bytes(),
        "_show" => cmd_show(&ctx.cfg),
        "help" => help_text().into_bytes(),
        "version" => env!("CARGO_PKG_VERSION").as_bytes().to_vec(),
        other => return Err(anyhow!("unknown command: {other}")),
    };

    emit(ctx, &rendered)
}

fn emit(ctx: &RunContext, rendered: &[u8]) -> anyhow::Result<()> {
    let mut bytes = rendered.to_vec();
    if !bytes.ends_with(b"\n") {
        bytes.push(b'\n');
    }

    match &ctx.output {
        Some(path) => {
            write_output_atomic(path, &bytes)?;
            info!(path = %path.display(), "wrote output file");
        }
        None => {
            let mut out = io::stdout().lock();
            out.write_all(&bytes).context("failed writing to stdout")?;
            out.flush()?;
        }
    }
    Ok(())
}

fn load_filtered(ctx: &RunContext, filter_terms: &[String]) -> anyhow::Result<Vec<Record>> {
    let filter = Filter::parse(filter_terms, ctx.today)?;
    let path = resolve_input_path(&ctx.cfg, ctx.input.as_deref())?;
    let records = load_records(&path)?;
    let total = records.len();
    let kept = filter.apply(records);
    debug!(total, kept = kept.len(), "applied record filter");
    Ok(kept)
}

fn to_json<T: Serialize>(value: &T) -> anyhow::Result<Vec<u8>> {
    serde_json::to_vec_pretty(value).context("failed to serialize output")
}

#[instrument(skip(ctx, filter_terms))]
fn cmd_layout(ctx: &RunContext, filter_terms: &[String]) -> anyhow::Result<Vec<u8>> {
    let records = load_filtered(ctx, filter_terms)?;
    let layout = build_layout(&records, &ctx.settings, ctx.today, ctx.window_override);

    match ctx.format {
        OutputFormat::Json => to_json(&layout),
        OutputFormat::Table => {
            let mut buf = Vec::new();
            ctx.renderer.write_layout(&mut buf, &layout)?;
            Ok(buf)
        }
    }
}

#[instrument(skip(ctx, filter_terms))]
fn cmd_headers(ctx: &RunContext, filter_terms: &[String]) -> anyhow::Result<Vec<u8>> {
    let records = load_filtered(ctx, filter_terms)?;
    let layout = build_layout(&records, &ctx.settings, ctx.today, ctx.window_override);

    match ctx.format {
        OutputFormat::Json => to_json(&layout.columns),
        OutputFormat::Table => {
            let mut buf = Vec::new();
            ctx.renderer.write_headers(&mut buf, &layout.columns)?;
            Ok(buf)
        }
    }
}

#[derive(Debug, Serialize)]
struct WindowReport {
    #[serde(flatten)]
    window: Window,
    days: i64,
    granularity: String,
}

#[instrument(skip(ctx, filter_terms))]
fn cmd_window(ctx: &RunContext, filter_terms: &[String]) -> anyhow::Result<Vec<u8>> {
    let records = load_filtered(ctx, filter_terms)?;
    let window = build_layout(&records, &ctx.settings, ctx.today, ctx.window_override).window;

    match ctx.format {
        OutputFormat::Json => to_json(&WindowReport {
            window,
            days: window.day_count(),
            granularity: ctx.settings.granularity.to_string(),
        }),
        OutputFormat::Table => {
            let mut buf = Vec::new();
            ctx.renderer.write_window(&mut buf, &window)?;
            Ok(buf)
        }
    }
}

#[instrument(skip(ctx, filter_terms, args))]
fn cmd_month(ctx: &RunContext, filter_terms: &[String], args: &[String]) -> anyhow::Result<Vec<u8>> {
    let focus = match args.first() {
        Some(raw) => parse_date_expr(raw, ctx.today).with_context(|| format!("invalid month focus: {raw}"))?,
        None => ctx.today,
    };
    let records = load_filtered(ctx, filter_terms)?;
    let grid = build_month_grid(focus, &records, ctx.settings.week_start, ctx.today);

    match ctx.format {
        OutputFormat::Json => to_json(&grid),
        OutputFormat::Table => {
            let mut buf = Vec::new();
            ctx.renderer.write_month(&mut buf, &grid)?;
            Ok(buf)
        }
    }
}

#[instrument(skip(ctx, filter_terms, args))]
fn cmd_summary(ctx: &RunContext, filter_terms: &[String], args: &[String]) -> anyhow::Result<Vec<u8>> {
    let records = load_filtered(ctx, filter_terms)?;
    let mode = args.first().map(|s| s.trim().to_ascii_lowercase());

    if mode.as_deref() == Some("load") {
        let window = build_layout(&records, &ctx.settings, ctx.today, ctx.window_override).window;
        let load = monthly_load(&records, &window);
        return match ctx.format {
            OutputFormat::Json => to_json(&load),
            OutputFormat::Table => {
                let mut buf = Vec::new();
                ctx.renderer.write_monthly_load(&mut buf, &load)?;
                Ok(buf)
            }
        };
    }

    let group_by = match mode {
        Some(raw) => raw.parse::<GroupBy>()?,
        None => GroupBy::default(),
    };
    let summaries = summarize(&records, group_by, ctx.today);
    info!(%group_by, groups = summaries.len(), "summarized records");

    match ctx.format {
        OutputFormat::Json => to_json(&summaries),
        OutputFormat::Table => {
            let mut buf = Vec::new();
            ctx.renderer.write_summary(&mut buf, &summaries)?;
            Ok(buf)
        }
    }
}

#[instrument(skip(ctx, filter_terms))]
fn cmd_records(ctx: &RunContext, filter_terms: &[String]) -> anyhow::Result<Vec<u8>> {
    let records = load_filtered(ctx, filter_terms)?;

    match ctx.format {
        OutputFormat::Json => to_json(&records),
        OutputFormat::Table => {
            let mut buf = Vec::new();
            ctx.renderer.write_records(&mut buf, &records)?;
            Ok(buf)
        }
    }
}

fn cmd_show(cfg: &Config) -> Vec<u8> {
    let mut entries: Vec<(&String, &String)> = cfg.iter().collect();
    entries.sort();
    let mut out = String::new();
    for file in &cfg.loaded_files {
        out.push_str(&format!("# loaded {}\n", file.display()));
    }
    for (key, value) in entries {
        out.push_str(&format!("{key}={value}\n"));
    }
    out.into_bytes()
}

fn help_text() -> String {
    "\
usage: timeline [options] [filter...] [command] [args...]

commands:
  layout              bars positioned over the resolved window (default)
  headers             header columns for the current granularity
  window              the resolved visible window
  month [date]        month calendar grid around date (default today)
  summary [by|load]   totals by group, kind, tag or month; load = records per month
  records             filtered records
  _commands, _show, help, version

filter terms:
  +tag -tag kind:project|event group:NAME id:ID
  starts.before:DATE starts.after:DATE ends.before:DATE ends.after:DATE
  active:DATE  and/or/( )  bare words match titles

options:
  -i, --input PATH      records (JSON array or JSON Lines, - for stdin)
  -g, --granularity G   day, week or month
  --today/--from/--to   date expressions (today, +3d, 2025-10, monday, ...)
  --format table|json   -o, --output PATH
  --rc KEY=VALUE        rc.KEY=VALUE       --timelinerc PATH
"
    .to_string()
}
