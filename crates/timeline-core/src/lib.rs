pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod filter;
pub mod month_grid;
pub mod record;
pub mod render;
pub mod settings;
pub mod source;
pub mod summary;
pub mod timeline;

use std::ffi::OsString;
use std::io::IsTerminal;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use record::{
  Record,
  RecordKind
};
pub use settings::TimelineSettings;
pub use timeline::{
  Granularity,
  TimelineLayout,
  Window,
  WindowOverride,
  build_layout
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting timeline CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.timelinerc.as_deref()
  )?;
  cfg.apply_overrides(
    cli.merged_overrides(
      pre.rc_overrides
    )
  );

  let settings =
    settings::TimelineSettings::from_config(
      &cfg
    )
    .context(
      "invalid timeline settings"
    )?;

  let system_today =
    datetime::project_today();
  let today = match cli.today.as_deref()
  {
    | Some(raw) => {
      datetime::parse_date_expr(
        raw,
        system_today
      )
      .context("invalid --today")?
    }
    | None => system_today
  };

  let window_override =
    timeline::WindowOverride {
      from: cli
        .from
        .as_deref()
        .map(|raw| {
          datetime::parse_date_expr(
            raw, today
          )
        })
        .transpose()
        .context("invalid --from")?,
      to:   cli
        .to
        .as_deref()
        .map(|raw| {
          datetime::parse_date_expr(
            raw, today
          )
        })
        .transpose()
        .context("invalid --to")?
    };

  let terminal = cli.output.is_none()
    && std::io::stdout().is_terminal();
  let ctx = commands::RunContext {
    format: render::OutputFormat::from_config(&cfg)?,
    renderer: render::Renderer::new(
      &cfg, terminal
    )?,
    settings,
    today,
    window_override,
    input: cli.input,
    output: cli.output,
    cfg
  };

  let inv = cli::Invocation::parse(
    &ctx.cfg, cli.rest
  )?;

  commands::dispatch(&ctx, inv)?;

  info!("done");
  Ok(())
}
