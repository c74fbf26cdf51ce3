//! Calendar date ranges used to pick which chats feed a plan.

use std::fmt;
use std::str::FromStr;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Quick ranges ending today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangePreset {
    Week,
    Fortnight,
    Month,
}

impl RangePreset {
    pub fn days(self) -> u64 {
        match self {
            RangePreset::Week => 7,
            RangePreset::Fortnight => 15,
            RangePreset::Month => 30,
        }
    }
}

impl FromStr for RangePreset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "week" => Ok(RangePreset::Week),
            "fortnight" => Ok(RangePreset::Fortnight),
            "month" => Ok(RangePreset::Month),
            other => Err(Error::InvalidDateRange(format!("unknown preset '{other}'"))),
        }
    }
}

/// Inclusive range of UTC calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(Error::InvalidDateRange(format!("{end} is before {start}")));
        }
        Ok(Self { start, end })
    }

    /// Parse two `YYYY-MM-DD` dates.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    /// The `preset.days()` days up to and including `today`.
    pub fn last(preset: RangePreset, today: NaiveDate) -> Self {
        let start = today
            .checked_sub_days(Days::new(preset.days() - 1))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end: today }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Unix milliseconds from the first instant of `start` to the last
    /// millisecond of `end`, both inclusive.
    pub fn bounds_ms(&self) -> (i64, i64) {
        let ms = |date: NaiveDate, h, m, s, milli| {
            date.and_hms_milli_opt(h, m, s, milli)
                .map(|t| t.and_utc().timestamp_millis())
                .unwrap_or_default()
        };
        (ms(self.start, 0, 0, 0, 0), ms(self.end, 23, 59, 59, 999))
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|e| Error::InvalidDateRange(format!("'{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_and_orders() {
        let range = DateRange::parse("2024-03-01", "2024-03-07").unwrap();
        assert_eq!(range.start(), date(2024, 3, 1));
        assert_eq!(range.end(), date(2024, 3, 7));

        assert!(matches!(
            DateRange::parse("2024-03-07", "2024-03-01"),
            Err(Error::InvalidDateRange(_))
        ));
        assert!(matches!(
            DateRange::parse("marzo", "2024-03-01"),
            Err(Error::InvalidDateRange(_))
        ));
    }

    #[test]
    fn single_day_covers_the_whole_day() {
        let range = DateRange::parse("1970-01-02", "1970-01-02").unwrap();
        let day = 86_400_000;
        assert_eq!(range.bounds_ms(), (day, 2 * day - 1));
    }

    #[test]
    fn presets_end_today() {
        let today = date(2024, 3, 31);
        let week = DateRange::last(RangePreset::Week, today);
        assert_eq!((week.start(), week.end()), (date(2024, 3, 25), today));

        let month = DateRange::last("month".parse().unwrap(), today);
        assert_eq!(month.start(), date(2024, 3, 2));
        assert_eq!(
            DateRange::last(RangePreset::Fortnight, today).start(),
            date(2024, 3, 17)
        );
    }
}
