use anyhow::{Context, anyhow};
use chrono::Weekday;
use serde::Serialize;

use crate::calendar::parse_week_start;
use crate::config::Config;
use crate::timeline::Granularity;

/// Upper bound for `timeline.padding.*`, in days.
pub const MAX_PADDING_DAYS: i64 = 3650;

/// A value that differs per granularity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PerGranularity<T> {
    pub day: T,
    pub week: T,
    pub month: T,
}

impl<T: Copy> PerGranularity<T> {
    pub fn get(&self, granularity: Granularity) -> T {
        match granularity {
            Granularity::Day => self.day,
            Granularity::Week => self.week,
            Granularity::Month => self.month,
        }
    }

    pub fn set(&mut self, granularity: Granularity, value: T) {
        match granularity {
            Granularity::Day => self.day = value,
            Granularity::Week => self.week = value,
            Granularity::Month => self.month = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineSettings {
    pub granularity: Granularity,
    pub week_start: Weekday,
    pub padding: PerGranularity<i64>,
    pub column_width: PerGranularity<f64>,
    pub clip: bool,
}

impl Default for TimelineSettings {
    fn default() -> Self {
        Self {
            granularity: Granularity::Day,
            week_start: Weekday::Mon,
            padding: PerGranularity {
                day: Granularity::Day.default_padding_days(),
                week: Granularity::Week.default_padding_days(),
                month: Granularity::Month.default_padding_days(),
            },
            column_width: PerGranularity {
                day: Granularity::Day.default_column_width(),
                week: Granularity::Week.default_column_width(),
                month: Granularity::Month.default_column_width(),
            },
            clip: false,
        }
    }
}

impl TimelineSettings {
    #[tracing::instrument(skip(cfg))]
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let mut settings = Self::default();

        if let Some(granularity) = cfg.get_parsed::<Granularity>("timeline.granularity")? {
            settings.granularity = granularity;
        }

        if let Some(raw) = cfg.get("timeline.week_start") {
            settings.week_start = parse_week_start(&raw).context("invalid timeline.week_start")?;
        }

        for granularity in Granularity::ALL {
            let padding_key = format!("timeline.padding.{granularity}");
            if let Some(days) = cfg.get_parsed::<i64>(&padding_key)? {
                if !(0..=MAX_PADDING_DAYS).contains(&days) {
                    return Err(anyhow!("{padding_key} must be between 0 and {MAX_PADDING_DAYS} days, got {days}"));
                }
                settings.padding.set(granularity, days);
            }

            let width_key = format!("timeline.column_width.{granularity}");
            if let Some(width) = cfg.get_parsed::<f64>(&width_key)? {
                if !width.is_finite() || width <= 0.0 {
                    return Err(anyhow!("{width_key} must be a positive number, got {width}"));
                }
                settings.column_width.set(granularity, width);
            }
        }

        if let Some(clip) = cfg.get_bool("timeline.clip")? {
            settings.clip = clip;
        }

        tracing::debug!(?settings, "resolved timeline settings");
        Ok(settings)
    }
}
