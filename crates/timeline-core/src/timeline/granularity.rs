use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// Unit of time a timeline column represents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Day,
    Week,
    Month,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [Granularity::Day, Granularity::Week, Granularity::Month];

    /// Days added on both sides of the record range when resolving a window.
    pub fn default_padding_days(self) -> i64 {
        match self {
            Granularity::Day => 3,
            Granularity::Week => 7,
            Granularity::Month => 30,
        }
    }

    pub fn default_column_width(self) -> f64 {
        match self {
            Granularity::Day => 100.0,
            Granularity::Week => 120.0,
            Granularity::Month => 160.0,
        }
    }

    pub fn as_key(self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

impl FromStr for Granularity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "days" | "d" => Ok(Granularity::Day),
            "week" | "weeks" | "w" => Ok(Granularity::Week),
            "month" | "months" | "m" => Ok(Granularity::Month),
            other => Err(anyhow!("unknown granularity: {other} (expected day, week or month)")),
        }
    }
}
