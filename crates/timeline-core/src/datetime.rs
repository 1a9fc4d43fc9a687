use std::fs;
use std::io;
use std::path::{
  Path,
  PathBuf
};
use std::sync::OnceLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  NaiveDate,
  NaiveDateTime,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;
use tracing::{
  debug,
  warn
};

use crate::calendar::{
  add_days,
  checked_add_days,
  first_day_of_month,
  shift_months
};

const TIMEZONE_ENV_VAR: &str =
  "TIMELINE_TIMEZONE";
const TIME_CONFIG_ENV_VAR: &str =
  "TIMELINE_TIME_CONFIG";
const TIME_CONFIG_FILE: &str =
  "timeline-time.toml";

/// `timezone = "..."` at the top level or under `[time]`.
#[derive(Debug, Default, Deserialize)]
struct TimeConfig {
  timezone: Option<String>,
  #[serde(default)]
  time:     TimeTable
}

#[derive(Debug, Default, Deserialize)]
struct TimeTable {
  timezone: Option<String>
}

/// Timezone that turns timestamps into calendar days, resolved once from
/// `TIMELINE_TIMEZONE`, then the time config file, then UTC.
pub fn project_timezone() -> &'static Tz
{
  static PROJECT_TZ: OnceLock<Tz> =
    OnceLock::new();
  PROJECT_TZ.get_or_init(|| {
    let tz = std::env::var(
      TIMEZONE_ENV_VAR
    )
    .ok()
    .and_then(|raw| {
      parse_timezone(
        &raw,
        TIMEZONE_ENV_VAR
      )
    })
    .or_else(|| {
      timezone_from_file(
        &time_config_path()
      )
    })
    .unwrap_or(chrono_tz::UTC);
    debug!(timezone = %tz, "resolved project timezone");
    tz
  })
}

/// Calendar date of `dt` in the project timezone.
#[must_use]
pub fn to_project_date(
  dt: DateTime<Utc>
) -> NaiveDate {
  dt.with_timezone(project_timezone())
    .date_naive()
}

#[must_use]
pub fn project_today() -> NaiveDate {
  to_project_date(Utc::now())
}

fn time_config_path() -> PathBuf {
  std::env::var(TIME_CONFIG_ENV_VAR)
    .ok()
    .filter(|raw| !raw.trim().is_empty())
    .map(|raw| {
      PathBuf::from(raw.trim())
    })
    .unwrap_or_else(|| {
      PathBuf::from(TIME_CONFIG_FILE)
    })
}

fn timezone_from_file(
  path: &Path
) -> Option<Tz> {
  let raw = match fs::read_to_string(
    path
  ) {
    | Ok(raw) => raw,
    | Err(err)
      if err.kind()
        == io::ErrorKind::NotFound =>
    {
      return None;
    }
    | Err(err) => {
      warn!(file = %path.display(), error = %err, "cannot read time config");
      return None;
    }
  };

  let config: TimeConfig =
    toml::from_str(&raw)
      .inspect_err(|err| {
        warn!(file = %path.display(), error = %err, "cannot parse time config");
      })
      .ok()?;

  let name = config
    .timezone
    .or(config.time.timezone)?;
  parse_timezone(
    &name,
    &path.display().to_string()
  )
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  raw
    .trim()
    .parse::<Tz>()
    .inspect_err(|err| {
      warn!(source, timezone = raw, error = %err, "ignoring unknown timezone");
    })
    .ok()
}

/// Parses the date forms accepted in record files: plain dates, RFC 3339
/// timestamps, naive timestamps and the compact UTC form.
pub fn parse_record_date(
  raw: &str
) -> anyhow::Result<NaiveDate> {
  let token = raw.trim();

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(date);
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(to_project_date(
      dt.with_timezone(&Utc)
    ));
  }

  if let Ok(ndt) =
    NaiveDateTime::parse_from_str(
      token,
      "%Y%m%dT%H%M%SZ"
    )
  {
    return Ok(to_project_date(
      DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc)
    ));
  }

  for fmt in [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M"
  ] {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return Ok(ndt.date());
    }
  }

  Err(anyhow!(
    "unrecognized record date: {raw}"
  ))
}

#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" => {
      return Ok(today);
    }
    | "tomorrow" => {
      return Ok(add_days(today, 1));
    }
    | "yesterday" => {
      return Ok(add_days(today, -1));
    }
    | _ => {}
  }

  if token.len() == 4
    && token
      .chars()
      .all(|c| c.is_ascii_digit())
  {
    let year: i32 =
      token.parse().context(
        "invalid 4-digit year"
      )?;
    return NaiveDate::from_ymd_opt(
      year, 1, 1
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid year value: {year}"
      )
    });
  }

  if let Some(target_weekday) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today,
      target_weekday
    ));
  }

  if let Some(target_month) =
    parse_month_name(&lower)
  {
    let mut year = today.year();
    if first_day_of_month(
      year,
      target_month
    ) <= today
    {
      year = year.saturating_add(1);
    }
    return Ok(first_day_of_month(
      year,
      target_month
    ));
  }

  if let Some(date) =
    relative_offset(&lower, today)?
  {
    return Ok(date);
  }

  let month_re =
    Regex::new(r"^\d{4}-\d{2}$")?;
  if month_re.is_match(token) {
    return NaiveDate::parse_from_str(
      &format!("{token}-01"),
      "%Y-%m-%d"
    )
    .with_context(|| {
      format!(
        "invalid year-month: {token}"
      )
    });
  }

  if let Ok(date) =
    parse_record_date(token)
  {
    return Ok(date);
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     today/tomorrow/yesterday, 4-digit \
     year, YYYY-MM, weekday names (e.g. \
     monday), month names (e.g. \
     march), +Nd/+Nw/+Nm, YYYY-MM-DD, \
     RFC3339, YYYYMMDDTHHMMSSZ"
  })
}

/// `+Nd`, `-Nw`, `+Nm` style offsets from `today`; `Ok(None)` when `lower`
/// is not an offset.
fn relative_offset(
  lower: &str,
  today: NaiveDate
) -> anyhow::Result<Option<NaiveDate>> {
  let re =
    Regex::new(r"^([+-])(\d+)([dwm])$")?;
  let Some(caps) = re.captures(lower)
  else {
    return Ok(None);
  };
  let part = |idx: usize| {
    caps
      .get(idx)
      .map_or("", |m| m.as_str())
  };

  let magnitude: i64 = part(2)
    .parse()
    .with_context(|| {
      format!(
        "relative offset out of range: \
         {lower}"
      )
    })?;
  let amount = if part(1) == "-" {
    -magnitude
  } else {
    magnitude
  };

  let shifted = match part(3) {
    | "d" => {
      checked_add_days(today, amount)
    }
    | "w" => amount
      .checked_mul(7)
      .and_then(|days| {
        checked_add_days(today, days)
      }),
    | _ => i32::try_from(amount)
      .ok()
      .and_then(|months| {
        shift_months(today, months)
      })
  };

  shifted.map(Some).ok_or_else(|| {
    anyhow!(
      "relative offset out of range: \
       {lower}"
    )
  })
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx = target
    .num_days_from_monday()
    as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  add_days(from, delta)
}

fn parse_month_name(
  token: &str
) -> Option<u32> {
  match token.trim() {
    | "january" | "jan" => Some(1),
    | "february" | "feb" => Some(2),
    | "march" | "mar" => Some(3),
    | "april" | "apr" => Some(4),
    | "may" => Some(5),
    | "june" | "jun" => Some(6),
    | "july" | "jul" => Some(7),
    | "august" | "aug" => Some(8),
    | "september" | "sep" | "sept" => {
      Some(9)
    }
    | "october" | "oct" => Some(10),
    | "november" | "nov" => Some(11),
    | "december" | "dec" => Some(12),
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use std::fs;

  use chrono::NaiveDate;
  use tempfile::tempdir;

  use super::{
    parse_date_expr,
    parse_record_date,
    timezone_from_file
  };

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn parses_four_digit_year() {
    let today = date(2026, 2, 17);
    let parsed =
      parse_date_expr("2028", today)
        .expect("parse year");
    assert_eq!(parsed, date(2028, 1, 1));
  }

  #[test]
  fn parses_weekday_name() {
    let today = date(2026, 2, 17);
    let parsed =
      parse_date_expr("wednesday", today)
        .expect("parse weekday");
    assert_eq!(
      parsed,
      date(2026, 2, 18)
    );
  }

  #[test]
  fn parses_month_name() {
    let today = date(2026, 2, 17);
    assert_eq!(
      parse_date_expr("march", today)
        .expect("parse month"),
      date(2026, 3, 1)
    );
    assert_eq!(
      parse_date_expr("feb", today)
        .expect("parse month"),
      date(2027, 2, 1)
    );
  }

  #[test]
  fn parses_relative_offsets() {
    let today = date(2026, 1, 31);
    assert_eq!(
      parse_date_expr("+3d", today)
        .expect("days"),
      date(2026, 2, 3)
    );
    assert_eq!(
      parse_date_expr("-2w", today)
        .expect("weeks"),
      date(2026, 1, 17)
    );
    assert_eq!(
      parse_date_expr("+1m", today)
        .expect("months"),
      date(2026, 2, 28)
    );
  }

  #[test]
  fn parses_year_month() {
    let today = date(2026, 2, 17);
    assert_eq!(
      parse_date_expr("2025-10", today)
        .expect("year-month"),
      date(2025, 10, 1)
    );
  }

  #[test]
  fn record_dates_accept_timestamps() {
    assert_eq!(
      parse_record_date("2025-10-15")
        .expect("plain"),
      date(2025, 10, 15)
    );
    assert_eq!(
      parse_record_date(
        "2025-10-15T09:30:00"
      )
      .expect("naive"),
      date(2025, 10, 15)
    );
    assert!(
      parse_record_date("next tuesday")
        .is_err()
    );
  }

  #[test]
  fn rejects_garbage() {
    let today = date(2026, 2, 17);
    assert!(
      parse_date_expr("someday", today)
        .is_err()
    );
  }

  #[test]
  fn huge_relative_offsets_are_errors() {
    let today = date(2025, 10, 1);
    for input in [
      "+200000000000000d",
      "-200000000000000d",
      "+2000000000000000000w",
      "+3000000000m",
      "+99999999999999999999d"
    ] {
      let err =
        parse_date_expr(input, today)
          .expect_err(input);
      assert!(
        err
          .to_string()
          .contains("out of range"),
        "{input}: {err}"
      );
    }
  }

  #[test]
  fn time_config_accepts_both_layouts() {
    let dir =
      tempdir().expect("tempdir");
    let flat =
      dir.path().join("flat.toml");
    let nested =
      dir.path().join("nested.toml");
    let bogus =
      dir.path().join("bogus.toml");
    fs::write(
      &flat,
      "timezone = \"America/Chicago\"\n"
    )
    .expect("write flat");
    fs::write(
      &nested,
      "[time]\ntimezone = \"Europe/Berlin\"\n"
    )
    .expect("write nested");
    fs::write(
      &bogus,
      "timezone = \"Mars/Olympus\"\n"
    )
    .expect("write bogus");

    assert_eq!(
      timezone_from_file(&flat),
      Some(chrono_tz::America::Chicago)
    );
    assert_eq!(
      timezone_from_file(&nested),
      Some(chrono_tz::Europe::Berlin)
    );
    assert_eq!(
      timezone_from_file(&bogus),
      None
    );
    assert_eq!(
      timezone_from_file(
        &dir.path().join("missing.toml")
      ),
      None
    );
  }
}

pub mod record_date_serde {
  use chrono::NaiveDate;
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  pub fn serialize<S>(
    date: &NaiveDate,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer.serialize_str(
      &date.format("%Y-%m-%d").to_string()
    )
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<NaiveDate, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = String::deserialize(
      deserializer
    )?;
    super::parse_record_date(&raw)
      .map_err(serde::de::Error::custom)
  }
}
