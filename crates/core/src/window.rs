// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Data windows: the `[dstart, dend]` interval a run processes.
//!
//! `dend` is the scheduled time truncated down to the `truncate_to`
//! boundary, shifted by `offset`; `dstart` is `dend - size`. Size and offset
//! are compound durations that may lead with a month component (`"1M24h"`).
//!
//! Version 1 windows keep the older rules: a month counts as 30 days, `w`
//! rounds up to the next Sunday and month windows end on the last day of
//! the month.

use crate::duration::parse_duration;
use crate::{Entity, Error, Result};
use chrono::{DateTime, Datelike, Duration, DurationRound, Months, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

const TRUNCATE_OPTIONS: [&str; 5] = ["h", "d", "w", "m", "M"];

/// Month length in version 1 windows
const V1_MONTH_DAYS: i64 = 30;

// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static MONTH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-?)(\d+)M(.*)$").expect("constant regex pattern is valid")
});

fn default_version() -> u8 {
    2
}

/// Window configuration as declared on a job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    #[serde(default = "default_version")]
    pub version: u8,
    #[serde(default)]
    pub truncate_to: String,
    #[serde(default)]
    pub offset: String,
    #[serde(default)]
    pub size: String,
}

impl Window {
    pub fn new(
        version: u8,
        truncate_to: impl Into<String>,
        offset: impl Into<String>,
        size: impl Into<String>,
    ) -> Self {
        Self {
            version,
            truncate_to: truncate_to.into(),
            offset: offset.into(),
            size: size.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.validate_truncate_to()?;
        self.validate_offset()?;
        self.validate_size()
    }

    /// `dstart` for a run scheduled at `scheduled_at`.
    pub fn start_time(&self, scheduled_at: DateTime<Utc>) -> Result<DateTime<Utc>> {
        if self.version == 1 {
            return self.v1_range(scheduled_at).map(|(start, _)| start);
        }
        let end = self.end_time(scheduled_at)?;
        if self.size.is_empty() {
            return Ok(end);
        }
        let (months, rest) = split_months(&self.size)?;
        let rest = parse_non_month(&rest)?;
        shift_months(end - rest, -months)
    }

    /// `dend` for a run scheduled at `scheduled_at`.
    pub fn end_time(&self, scheduled_at: DateTime<Utc>) -> Result<DateTime<Utc>> {
        if self.version == 1 {
            return self.v1_range(scheduled_at).map(|(_, end)| end);
        }
        self.validate()?;
        let truncated = self.truncate(scheduled_at)?;
        if self.offset.is_empty() {
            return Ok(truncated);
        }
        let (months, rest) = split_months(&self.offset)?;
        let rest = parse_non_month(&rest)?;
        shift_months(truncated + rest, months)
    }

    /// `(dstart, dend)`
    pub fn range(&self, scheduled_at: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        Ok((self.start_time(scheduled_at)?, self.end_time(scheduled_at)?))
    }

    fn validate_truncate_to(&self) -> Result<()> {
        if self.truncate_to.is_empty() || TRUNCATE_OPTIONS.contains(&self.truncate_to.as_str()) {
            return Ok(());
        }
        Err(Error::invalid_argument(
            Entity::Window,
            format!(
                "invalid truncate_to provided, provide one of {}",
                TRUNCATE_OPTIONS.join(", ")
            ),
        ))
    }

    fn validate_offset(&self) -> Result<()> {
        if self.offset.is_empty() {
            return Ok(());
        }
        let (_, rest) = split_months(&self.offset)?;
        parse_non_month(&rest).map(|_| ())
    }

    fn validate_size(&self) -> Result<()> {
        if self.size.is_empty() {
            return Ok(());
        }
        if self.size.starts_with('-') {
            return Err(Error::invalid_argument(
                Entity::Window,
                "size cannot be negative",
            ));
        }
        let (_, rest) = split_months(&self.size)?;
        parse_duration(&rest).map_err(|_| {
            Error::invalid_argument(
                Entity::Window,
                format!("failed to parse task window with size {}", self.size),
            )
        })?;
        Ok(())
    }

    fn truncate(&self, t: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let truncated = match self.truncate_to.as_str() {
            "h" => t.duration_trunc(Duration::hours(1)).ok(),
            "d" => t.duration_trunc(Duration::days(1)).ok(),
            "w" => t.duration_trunc(Duration::days(1)).ok().map(|day| {
                day - Duration::days(i64::from(t.weekday().num_days_from_monday()))
            }),
            "M" | "m" => month_start(t),
            _ => Some(t),
        };
        truncated.ok_or_else(|| truncate_error(t))
    }

    fn v1_range(&self, scheduled_at: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        self.validate()?;
        let size = match self.size.as_str() {
            "" => Duration::hours(24),
            size => v1_duration(size)?,
        };
        let offset = match self.offset.as_str() {
            "" => Duration::zero(),
            offset => v1_duration(offset)?,
        };

        if matches!(self.truncate_to.as_str(), "M" | "m") {
            let month = Duration::days(V1_MONTH_DAYS);
            let first = month_start(scheduled_at).ok_or_else(|| truncate_error(scheduled_at))?;
            let first = shift_months(first, months_in(offset, month))?;
            let end = shift_months(first, 1)? - Duration::days(1);
            let size_months = months_in(size, month) - 1;
            let start = if size_months > 0 {
                shift_months(first, -size_months)?
            } else {
                first
            };
            return Ok((start, end));
        }

        let floating = match self.truncate_to.as_str() {
            "h" => scheduled_at.duration_trunc(Duration::hours(1)).ok(),
            "d" => scheduled_at.duration_trunc(Duration::days(1)).ok(),
            "w" => {
                let to_sunday = 7 - i64::from(scheduled_at.weekday().num_days_from_sunday());
                (scheduled_at + Duration::days(to_sunday))
                    .duration_trunc(Duration::days(1))
                    .ok()
            }
            _ => Some(scheduled_at),
        }
        .ok_or_else(|| truncate_error(scheduled_at))?;
        let end = floating + offset;
        Ok((end - size, end))
    }
}

fn month_start(t: DateTime<Utc>) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(t.year(), t.month(), 1, 0, 0, 0).single()
}

fn truncate_error(t: DateTime<Utc>) -> Error {
    Error::invalid_argument(Entity::Window, format!("unable to truncate time {t}"))
}

/// Whole 30-day months in `d`, rounded toward zero.
fn months_in(d: Duration, month: Duration) -> i32 {
    i32::try_from(d.num_seconds() / month.num_seconds()).unwrap_or(0)
}

/// Version 1 duration: a month component counts as 30 days.
fn v1_duration(expr: &str) -> Result<Duration> {
    let (months, rest) = split_months(expr)?;
    Ok(Duration::days(V1_MONTH_DAYS * i64::from(months)) + parse_non_month(&rest)?)
}

/// Split `"-1M24h"` into `(-1, "-24h")`; inputs without months give `(0, input)`.
fn split_months(expr: &str) -> Result<(i32, String)> {
    let Some(caps) = MONTH_PATTERN.captures(expr) else {
        return Ok((0, expr.to_string()));
    };
    let sign = caps.get(1).map_or("", |m| m.as_str());
    let digits = caps.get(2).map_or("", |m| m.as_str());
    let rest = caps.get(3).map_or("", |m| m.as_str());
    let months: i32 = digits.parse().map_err(|_| {
        Error::invalid_argument(Entity::Window, format!("invalid month expression {expr}"))
    })?;
    let months = if sign == "-" { -months } else { months };
    let rest = match (rest.is_empty(), sign) {
        (true, _) => "0".to_string(),
        (false, "-") => format!("-{rest}"),
        (false, _) => rest.to_string(),
    };
    Ok((months, rest))
}

fn parse_non_month(expr: &str) -> Result<Duration> {
    parse_duration(expr).map_err(|_| {
        Error::invalid_argument(
            Entity::Window,
            format!("failed to parse non month duration {expr}"),
        )
    })
}

fn shift_months(t: DateTime<Utc>, months: i32) -> Result<DateTime<Utc>> {
    let shifted = if months >= 0 {
        t.checked_add_months(Months::new(months.unsigned_abs()))
    } else {
        t.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    shifted.ok_or_else(|| {
        Error::invalid_argument(Entity::Window, format!("window out of range for {t}"))
    })
}

#[cfg(test)]
#[path = "window_tests.rs"]
mod tests;
