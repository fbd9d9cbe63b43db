//! Five-field cron expressions
//!
//! Supports `*`, `*/N`, comma lists and plain integers in each of the
//! minute, hour, day-of-month, month and day-of-week fields (0 = Sunday).
//! All fields must match; day-of-month and day-of-week are not OR-ed.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Datelike, TimeDelta, TimeZone, Timelike};
use thiserror::Error;

/// Upper bound of the forward scan, one year of minutes
const MAX_SCAN_MINUTES: i64 = 525_600;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CronError {
    #[error("cron expression must have 5 fields, got {0}")]
    FieldCount(usize),

    #[error("{field}: {reason}")]
    Field { field: &'static str, reason: String },
}

/// A parsed cron schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    minutes: BTreeSet<u32>,
    hours: BTreeSet<u32>,
    days_of_month: BTreeSet<u32>,
    months: BTreeSet<u32>,
    days_of_week: BTreeSet<u32>,
}

impl FromStr for CronSchedule {
    type Err = CronError;

    fn from_str(expr: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        let [minute, hour, dom, month, dow] = fields.as_slice() else {
            return Err(CronError::FieldCount(fields.len()));
        };

        Ok(Self {
            minutes: parse_field(minute, "minute", 0, 59)?,
            hours: parse_field(hour, "hour", 0, 23)?,
            days_of_month: parse_field(dom, "day-of-month", 1, 31)?,
            months: parse_field(month, "month", 1, 12)?,
            days_of_week: parse_field(dow, "day-of-week", 0, 6)?,
        })
    }
}

fn parse_field(
    expr: &str,
    field: &'static str,
    min: u32,
    max: u32,
) -> Result<BTreeSet<u32>, CronError> {
    let invalid = |reason: String| CronError::Field { field, reason };
    let mut values = BTreeSet::new();

    for part in expr.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        if part == "*" {
            values.extend(min..=max);
        } else if let Some(step) = part.strip_prefix("*/") {
            let step = step
                .parse::<usize>()
                .ok()
                .filter(|step| *step > 0)
                .ok_or_else(|| invalid(format!("invalid step {}", part)))?;
            values.extend((min..=max).step_by(step));
        } else {
            let value = part
                .parse::<u32>()
                .ok()
                .filter(|value| (min..=max).contains(value))
                .ok_or_else(|| invalid(format!("invalid value {}", part)))?;
            values.insert(value);
        }
    }

    if values.is_empty() {
        return Err(invalid("no values".to_string()));
    }

    Ok(values)
}

impl CronSchedule {
    /// Whether all five fields match `time`
    pub fn matches<Tz: TimeZone>(&self, time: &DateTime<Tz>) -> bool {
        self.minutes.contains(&time.minute())
            && self.hours.contains(&time.hour())
            && self.days_of_month.contains(&time.day())
            && self.months.contains(&time.month())
            && self.days_of_week.contains(&time.weekday().num_days_from_sunday())
    }

    /// First matching minute strictly after `after`
    ///
    /// Seconds are truncated before scanning. Returns `None` when nothing
    /// matches within a year.
    pub fn next_after<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let start = after.with_second(0)?.with_nanosecond(0)? + TimeDelta::minutes(1);

        (0..MAX_SCAN_MINUTES)
            .map(|offset| start.clone() + TimeDelta::minutes(offset))
            .find(|candidate| self.matches(candidate))
    }
}
