// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron schedules: standard five-field crontab plus descriptors.
//!
//! Evaluation is delegated to the `cron` crate; this module normalises
//! crontab syntax into its six-field form and adds `prev` / `interval`.
//! All schedules evaluate in UTC.

use crate::duration::parse_duration;
use crate::{Entity, Error, Result};
use chrono::{DateTime, Duration, DurationRound, Utc};
use std::str::FromStr;

/// Furthest back `prev` will search before giving up.
const MAX_LOOKBACK_WEEKS: u32 = 52 * 30;

#[derive(Debug, Clone)]
enum Kind {
    Cron(Box<cron::Schedule>),
    Every(Duration),
}

/// A parsed schedule
#[derive(Debug, Clone)]
pub struct ScheduleSpec {
    expression: String,
    kind: Kind,
}

/// Parse a crontab expression or descriptor (`@daily`, `@every 1h30m`, ...).
pub fn parse_cron_schedule(expression: &str) -> Result<ScheduleSpec> {
    let trimmed = expression.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_argument(
            Entity::Cron,
            "cron expression is empty",
        ));
    }

    if let Some(every) = trimmed.strip_prefix("@every") {
        let delay = parse_duration(every.trim()).map_err(|e| {
            Error::invalid_argument(
                Entity::Cron,
                format!("invalid cron expression {trimmed}: {e}"),
            )
        })?;
        if delay < Duration::seconds(1) {
            return Err(Error::invalid_argument(
                Entity::Cron,
                format!("invalid cron expression {trimmed}: delay must be at least one second"),
            ));
        }
        return Ok(ScheduleSpec {
            expression: trimmed.to_string(),
            kind: Kind::Every(delay),
        });
    }

    let normalized = normalize(trimmed)?;
    let schedule = cron::Schedule::from_str(&normalized).map_err(|e| {
        Error::invalid_argument(
            Entity::Cron,
            format!("invalid cron expression {trimmed}: {e}"),
        )
    })?;
    if schedule.upcoming(Utc).next().is_none() {
        return Err(Error::invalid_argument(
            Entity::Cron,
            format!("invalid cron expression {trimmed}: schedule never fires"),
        ));
    }

    Ok(ScheduleSpec {
        expression: trimmed.to_string(),
        kind: Kind::Cron(Box::new(schedule)),
    })
}

impl FromStr for ScheduleSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_cron_schedule(s)
    }
}

impl ScheduleSpec {
    /// The expression as written by the user
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Strictly next fire time after `t`.
    pub fn next(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        match &self.kind {
            Kind::Cron(schedule) => schedule
                .after(&t)
                .next()
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            Kind::Every(delay) => truncate_to_second(t) + *delay,
        }
    }

    /// The fire time immediately preceding `t`.
    ///
    /// Strict: when `t` is itself a fire time the tick before it is
    /// returned, so a run scheduled at a tick has the previous tick as its
    /// logical time.
    ///
    /// Steps back a week at a time until a fire time earlier than `t` is
    /// found, then walks forward while the following fire time is still
    /// before `t`.
    pub fn prev(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        if let Kind::Every(delay) = &self.kind {
            return truncate_to_second(t) - *delay;
        }

        let week = Duration::weeks(1);
        let mut start = t;
        let mut found = false;
        for _ in 0..MAX_LOOKBACK_WEEKS {
            start -= week;
            if self.next(start) < t {
                found = true;
                break;
            }
        }
        if !found {
            return DateTime::<Utc>::MIN_UTC;
        }

        let mut previous = self.next(start);
        loop {
            let following = self.next(previous);
            if following >= t {
                break;
            }
            previous = following;
        }
        previous
    }

    /// Gap between the two fire times following `t`.
    pub fn interval(&self, t: DateTime<Utc>) -> Duration {
        match &self.kind {
            Kind::Every(delay) => *delay,
            Kind::Cron(_) => {
                let first = self.next(t);
                let second = self.next(first);
                second - first
            }
        }
    }

    /// Whether `t` is itself a fire time (second resolution).
    pub fn is_fire_time(&self, t: DateTime<Utc>) -> bool {
        self.next(t - Duration::seconds(1)) == t
    }
}

fn truncate_to_second(t: DateTime<Utc>) -> DateTime<Utc> {
    t.duration_trunc(Duration::seconds(1)).unwrap_or(t)
}

/// Translate a five-field crontab (or descriptor) into the six-field form.
fn normalize(expression: &str) -> Result<String> {
    let descriptor = match expression {
        "@yearly" | "@annually" => Some("0 0 0 1 1 *"),
        "@monthly" => Some("0 0 0 1 * *"),
        "@weekly" => Some("0 0 0 * * Sun"),
        "@daily" | "@midnight" => Some("0 0 0 * * *"),
        "@hourly" => Some("0 0 * * * *"),
        _ => None,
    };
    if let Some(d) = descriptor {
        return Ok(d.to_string());
    }
    if expression.starts_with('@') {
        return Err(Error::invalid_argument(
            Entity::Cron,
            format!("unrecognized descriptor: {expression}"),
        ));
    }

    let fields: Vec<&str> = expression.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(Error::invalid_argument(
            Entity::Cron,
            format!(
                "invalid cron expression {expression}: expected exactly 5 fields, found {}",
                fields.len()
            ),
        ));
    }
    let dow = normalize_day_of_week(fields[4])?;
    Ok(format!(
        "0 {} {} {} {} {}",
        fields[0], fields[1], fields[2], fields[3], dow
    ))
}

const DAY_NAMES: [&str; 8] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

fn day_name(token: &str) -> Result<String> {
    match token.parse::<usize>() {
        Ok(n) => DAY_NAMES.get(n).map(|s| s.to_string()).ok_or_else(|| {
            Error::invalid_argument(Entity::Cron, format!("day of week out of range: {token}"))
        }),
        Err(_) => Ok(token.to_string()),
    }
}

/// Crontab numbers days 0-7 from Sunday; the `cron` crate numbers them 1-7.
/// Rewrite numeric days as names so both agree.
fn normalize_day_of_week(field: &str) -> Result<String> {
    let mut parts = Vec::new();
    for part in field.split(',') {
        let (base, step) = match part.split_once('/') {
            Some((b, s)) => (b, Some(s)),
            None => (part, None),
        };
        let base = match base.split_once('-') {
            Some(("0", "7")) | Some(("0", "6")) => "Sun-Sat".to_string(),
            Some((lo, "7")) if step.is_none() && lo != "0" && lo != "7" => {
                let lo = day_name(lo)?;
                format!("{lo}-Sat,Sun")
            }
            Some((lo, hi)) => format!("{}-{}", day_name(lo)?, day_name(hi)?),
            None if base == "*" || base == "?" => base.to_string(),
            None => day_name(base)?,
        };
        match step {
            Some(s) => parts.push(format!("{base}/{s}")),
            None => parts.push(base),
        }
    }
    Ok(parts.join(","))
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
