use chrono::{
  Datelike,
  Months,
  NaiveDate,
  TimeDelta,
  Weekday
};

#[must_use]
pub fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .unwrap_or(NaiveDate::MIN)
}

/// The final representable month ends at `NaiveDate::MAX`.
#[must_use]
pub fn last_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  let Some(first) =
    NaiveDate::from_ymd_opt(
      year, month, 1
    )
  else {
    return NaiveDate::MIN;
  };
  first
    .checked_add_months(Months::new(1))
    .and_then(|next| next.pred_opt())
    .unwrap_or(NaiveDate::MAX)
}

#[must_use]
pub fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  last_day_of_month(year, month).day()
}

/// `None` when the result leaves the representable range.
#[must_use]
pub fn checked_add_days(
  date: NaiveDate,
  days: i64
) -> Option<NaiveDate> {
  TimeDelta::try_days(days).and_then(
    |delta| date.checked_add_signed(delta)
  )
}

/// Saturates at `NaiveDate::MIN` and `NaiveDate::MAX`.
#[must_use]
pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  checked_add_days(date, days)
    .unwrap_or(if days < 0 {
      NaiveDate::MIN
    } else {
      NaiveDate::MAX
    })
}

/// Inclusive number of days from `first` to `last`; negative spans count as
/// their absolute length.
#[must_use]
pub fn inclusive_days(
  first: NaiveDate,
  last: NaiveDate
) -> i64 {
  (last - first).num_days().abs() + 1
}

#[must_use]
pub fn start_of_week(
  day: NaiveDate,
  week_start: Weekday
) -> NaiveDate {
  let day_idx = day
    .weekday()
    .num_days_from_monday()
    as i64;
  let start_idx = week_start
    .num_days_from_monday()
    as i64;
  let diff =
    (7 + day_idx - start_idx) % 7;
  add_days(day, -diff)
}

/// Moves `date` by whole months, clamping the day to the target month.
#[must_use]
pub fn shift_months(
  date: NaiveDate,
  months: i32
) -> Option<NaiveDate> {
  let step =
    Months::new(months.unsigned_abs());
  if months < 0 {
    date.checked_sub_months(step)
  } else {
    date.checked_add_months(step)
  }
}

#[must_use]
pub fn is_weekend(
  date: NaiveDate
) -> bool {
  matches!(
    date.weekday(),
    Weekday::Sat | Weekday::Sun
  )
}

pub fn parse_week_start(
  raw: &str
) -> anyhow::Result<Weekday> {
  match raw
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "monday" | "mon" => {
      Ok(Weekday::Mon)
    }
    | "sunday" | "sun" => {
      Ok(Weekday::Sun)
    }
    | "saturday" | "sat" => {
      Ok(Weekday::Sat)
    }
    | other => {
      Err(anyhow::anyhow!(
        "unsupported week start: \
         {other} (expected monday, \
         sunday or saturday)"
      ))
    }
  }
}

#[must_use]
pub fn weekday_labels(
  week_start: Weekday
) -> Vec<&'static str> {
  let mut day = week_start;
  let mut out = Vec::with_capacity(7);
  for _ in 0..7 {
    out.push(weekday_short(day));
    day = day.succ();
  }
  out
}

#[must_use]
pub fn weekday_short(
  day: Weekday
) -> &'static str {
  match day {
    | Weekday::Mon => "Mon",
    | Weekday::Tue => "Tue",
    | Weekday::Wed => "Wed",
    | Weekday::Thu => "Thu",
    | Weekday::Fri => "Fri",
    | Weekday::Sat => "Sat",
    | Weekday::Sun => "Sun"
  }
}
