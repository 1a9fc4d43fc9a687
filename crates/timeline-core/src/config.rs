use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

const RC_ENV_VAR: &str = "TIMELINERC";
const RC_FILE_NAME: &str =
  ".timelinerc";

#[derive(Debug, Clone)]
pub struct Config {
  map:              HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    for (key, value) in [
      ("default.command", "layout"),
      ("color", "on"),
      ("output.format", "table"),
      ("timeline.granularity", "day"),
      ("timeline.week_start", "monday"),
      ("timeline.clip", "off"),
      ("render.cell_chars", "3")
    ] {
      map.insert(
        key.to_string(),
        value.to_string()
      );
    }

    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let rc = resolve_rc_path(
      rc_override
    )?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading timelinerc");
      cfg.load_file(&path, &mut Vec::new())?;
    } else {
      debug!(
        "no timelinerc found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  /// Parses rc text as if it were read from `origin`.
  pub fn from_str_with_origin(
    text: &str,
    origin: &Path
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();
    let mut active =
      vec![include_key(origin)];
    cfg.load_text(
      text,
      origin,
      &mut active
    )?;
    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn set(
    &mut self,
    key: &str,
    value: impl Into<String>
  ) {
    self
      .map
      .insert(key.to_string(), value.into());
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> anyhow::Result<Option<bool>> {
    self
      .map
      .get(key)
      .map(|v| {
        parse_bool(v).ok_or_else(|| {
          anyhow!(
            "invalid boolean for \
             {key}: {v}"
          )
        })
      })
      .transpose()
  }

  pub fn get_parsed<T>(
    &self,
    key: &str
  ) -> anyhow::Result<Option<T>>
  where
    T: std::str::FromStr,
    T::Err: std::fmt::Display
  {
    self
      .map
      .get(key)
      .map(|v| {
        v.trim().parse::<T>().map_err(
          |err| {
            anyhow!(
              "invalid value for \
               {key}: {v} ({err})"
            )
          }
        )
      })
      .transpose()
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&String, &String)>
  {
    self.map.iter()
  }

  /// `active` holds the files currently being read, outermost first.
  #[tracing::instrument(skip(
    self, active
  ))]
  fn load_file(
    &mut self,
    path: &Path,
    active: &mut Vec<PathBuf>
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let key = include_key(&path);
    if active.contains(&key) {
      let chain = active
        .iter()
        .chain(std::iter::once(&key))
        .map(|p| {
          p.display().to_string()
        })
        .collect::<Vec<_>>()
        .join(" -> ");
      return Err(anyhow!(
        "include cycle: {chain}"
      ));
    }

    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());
    active.push(key);
    let result =
      self.load_text(&text, &path, active);
    active.pop();
    result
  }

  fn load_text(
    &mut self,
    text: &str,
    path: &Path,
    active: &mut Vec<PathBuf>
  ) -> anyhow::Result<()> {
    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if line.is_empty()
        || line.starts_with('#')
      {
        continue;
      }

      if let Some((before, _)) =
        line.split_once('#')
      {
        line = before.trim();
      }

      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if include_path.exists() {
          self.load_file(
            &include_path,
            active
          )?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

/// Input path from the command line, falling back to `input.location`.
#[tracing::instrument(skip(
  cfg,
  override_path
))]
pub fn resolve_input_path(
  cfg: &Config,
  override_path: Option<&Path>
) -> anyhow::Result<PathBuf> {
  if let Some(path) = override_path {
    return Ok(path.to_path_buf());
  }

  cfg
    .get("input.location")
    .map(|raw| {
      expand_tilde(Path::new(&raw))
    })
    .ok_or_else(|| {
      anyhow!(
        "no input given; pass \
         --input <path> (or - for \
         stdin) or set input.location"
      )
    })
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var(RC_ENV_VAR)
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory; skipping \
       timelinerc lookup"
    );
    return Ok(None);
  };
  let candidate = home.join(RC_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

/// Identity of an rc file for cycle detection.
fn include_key(
  path: &Path
) -> PathBuf {
  fs::canonicalize(path)
    .unwrap_or_else(|_| {
      path.to_path_buf()
    })
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(
  s: &str
) -> Option<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Some(true),
    | "0" | "n" | "no" | "off"
    | "false" => Some(false),
    | _ => None
  }
}
