//! Cron schedules.
//!
//! Five fields, `minute hour day-of-month month day-of-week`, evaluated in UTC. Fields accept
//! `*`, single values, ranges `a-b`, steps `*/n`, `a-b/n` and `a/n`, and comma separated lists.
//! Months and weekdays may be written as three letter names and `7` is Sunday. The macros
//! `@yearly`, `@annually`, `@monthly`, `@weekly`, `@daily`, `@midnight` and `@hourly` are
//! accepted.

use core::{fmt, str::FromStr};

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike, Utc};
use thiserror::Error;

const MONTH_NAMES: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];
const WEEKDAY_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// How far ahead to look for the next fire time.
const SEARCH_DAYS: i64 = 366 * 5;

/// The set of values a field matches, as a bit mask.
#[derive(Clone, Copy, PartialEq, Eq)]
struct Field {
    bits: u64,
    restricted: bool,
}

impl Field {
    fn contains(&self, value: u32) -> bool {
        value < 64 && self.bits & (1 << value) != 0
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<u32> = (0..64).filter(|value| self.contains(*value)).collect();
        f.debug_list().entries(values).finish()
    }
}

struct FieldKind {
    name: &'static str,
    min: u32,
    max: u32,
    names: &'static [&'static str],
    names_start: u32,
}

const MINUTE: FieldKind = FieldKind {
    name: "minute",
    min: 0,
    max: 59,
    names: &[],
    names_start: 0,
};
const HOUR: FieldKind = FieldKind {
    name: "hour",
    min: 0,
    max: 23,
    names: &[],
    names_start: 0,
};
const DAY_OF_MONTH: FieldKind = FieldKind {
    name: "day-of-month",
    min: 1,
    max: 31,
    names: &[],
    names_start: 0,
};
const MONTH: FieldKind = FieldKind {
    name: "month",
    min: 1,
    max: 12,
    names: &MONTH_NAMES,
    names_start: 1,
};
// 7 is accepted as Sunday and folded onto 0 after parsing.
const DAY_OF_WEEK: FieldKind = FieldKind {
    name: "day-of-week",
    min: 0,
    max: 7,
    names: &WEEKDAY_NAMES,
    names_start: 0,
};

/// A parsed cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    expression: String,
    minutes: Field,
    hours: Field,
    days_of_month: Field,
    months: Field,
    days_of_week: Field,
}

impl Schedule {
    /// Parse a cron expression.
    pub fn parse(expression: &str) -> Result<Self, ScheduleError> {
        let trimmed = expression.trim();
        let expanded = match trimmed.to_ascii_lowercase().as_str() {
            "@yearly" | "@annually" => "0 0 1 1 *",
            "@monthly" => "0 0 1 * *",
            "@weekly" => "0 0 * * 0",
            "@daily" | "@midnight" => "0 0 * * *",
            "@hourly" => "0 * * * *",
            _ if trimmed.starts_with('@') => {
                return Err(ScheduleError::UnknownMacro(trimmed.to_string()));
            }
            _ => trimmed,
        };

        let fields: Vec<&str> = expanded.split_whitespace().collect();
        let [minute, hour, day_of_month, month, day_of_week] = fields.as_slice() else {
            return Err(ScheduleError::FieldCount(fields.len()));
        };

        let mut days_of_week = parse_field(day_of_week, &DAY_OF_WEEK)?;
        if days_of_week.contains(7) {
            days_of_week.bits = (days_of_week.bits & !(1 << 7)) | 1;
        }

        Ok(Self {
            expression: trimmed.to_string(),
            minutes: parse_field(minute, &MINUTE)?,
            hours: parse_field(hour, &HOUR)?,
            days_of_month: parse_field(day_of_month, &DAY_OF_MONTH)?,
            months: parse_field(month, &MONTH)?,
            days_of_week,
        })
    }

    /// The first fire time strictly after `after`.
    ///
    /// `None` if the schedule does not fire within the next five years.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let start = after
            .naive_utc()
            .with_second(0)?
            .with_nanosecond(0)?
            .checked_add_signed(TimeDelta::minutes(1))?;
        let limit = start.checked_add_signed(TimeDelta::days(SEARCH_DAYS))?;

        let mut time = start;
        while time <= limit {
            if !self.months.contains(time.month()) {
                time = start_of_next_month(time)?;
                continue;
            }

            if !self.day_matches(time.date()) {
                time = time.date().succ_opt()?.and_hms_opt(0, 0, 0)?;
                continue;
            }

            if !self.hours.contains(time.hour()) {
                time = time
                    .with_minute(0)?
                    .checked_add_signed(TimeDelta::hours(1))?;
                continue;
            }

            if !self.minutes.contains(time.minute()) {
                time = time.checked_add_signed(TimeDelta::minutes(1))?;
                continue;
            }

            return Some(time.and_utc());
        }

        None
    }

    fn day_matches(&self, date: NaiveDate) -> bool {
        let day_of_month = self.days_of_month.contains(date.day());
        let day_of_week = self
            .days_of_week
            .contains(date.weekday().num_days_from_sunday());

        // Vixie cron: if both fields are restricted either may match.
        if self.days_of_month.restricted && self.days_of_week.restricted {
            day_of_month || day_of_week
        } else {
            day_of_month && day_of_week
        }
    }
}

impl FromStr for Schedule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expression)
    }
}

fn start_of_next_month(time: NaiveDateTime) -> Option<NaiveDateTime> {
    let (year, month) = if time.month() == 12 {
        (time.year().checked_add(1)?, 1)
    } else {
        (time.year(), time.month() + 1)
    };

    NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)
}

fn parse_field(field: &str, kind: &FieldKind) -> Result<Field, ScheduleError> {
    let mut bits = 0u64;

    for part in field.split(',') {
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step
                    .parse()
                    .ok()
                    .filter(|step| *step > 0)
                    .ok_or_else(|| ScheduleError::invalid(kind, part))?;
                (range, Some(step))
            }
            None => (part, None),
        };

        let (start, end) = if range == "*" {
            (kind.min, kind.max)
        } else if let Some((start, end)) = range.split_once('-') {
            (parse_value(start, kind)?, parse_value(end, kind)?)
        } else {
            let start = parse_value(range, kind)?;
            // `a/n` runs from `a` to the end of the field.
            let end = if step.is_some() { kind.max } else { start };
            (start, end)
        };

        if start > end {
            return Err(ScheduleError::invalid(kind, part));
        }

        let step = step.unwrap_or(1);
        let mut value = Some(start);
        while let Some(current) = value.filter(|value| *value <= end) {
            bits |= 1 << current;
            value = current.checked_add(step);
        }
    }

    // A lone `*` is the only unrestricted form.
    Ok(Field {
        bits,
        restricted: field != "*",
    })
}

fn parse_value(value: &str, kind: &FieldKind) -> Result<u32, ScheduleError> {
    let upper = value.to_ascii_uppercase();
    let parsed = match kind.names.iter().position(|name| *name == upper) {
        Some(index) => u32::try_from(index)
            .ok()
            .map(|index| index + kind.names_start),
        None => value.parse().ok(),
    };

    parsed
        .filter(|value| (kind.min..=kind.max).contains(value))
        .ok_or_else(|| ScheduleError::invalid(kind, value))
}

#[allow(missing_docs)]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Expected 5 fields but found {0}")]
    FieldCount(usize),

    #[error("Invalid {0} field value '{1}'")]
    InvalidField(&'static str, String),

    #[error("Unknown schedule macro '{0}'")]
    UnknownMacro(String),

    #[error("Schedule never fires")]
    NeverFires,
}

impl ScheduleError {
    fn invalid(kind: &FieldKind, value: &str) -> Self {
        Self::InvalidField(kind.name, value.to_string())
    }
}
