// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle events reported by the external scheduler.
//!
//! The wire payload is an untyped JSON object. [`Event::from_values`]
//! validates it once at ingress; only the typed fields travel further, with
//! the raw map kept as an opaque `values` field for notifiers.

use crate::job::JobName;
use crate::run::{OperatorType, State};
use crate::tenant::Tenant;
use crate::{Entity, Error, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Timestamp format used by scheduler callbacks
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Parse a `YYYY-MM-DDTHH:MM:SSZ` timestamp.
pub fn parse_iso_date(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, ISO_DATE_FORMAT)
        .ok()
        .map(|n| n.and_utc())
}

/// Alert categories a job can subscribe channels to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    #[serde(rename = "sla_miss")]
    SlaMiss,
    #[serde(rename = "failure")]
    Failure,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::SlaMiss => "sla_miss",
            EventCategory::Failure => "failure",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of scheduler event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SlaMiss,
    JobStart,
    JobSuccess,
    #[serde(rename = "failure")]
    JobFailure,

    TaskStart,
    TaskRetry,
    TaskFail,
    TaskSuccess,

    HookStart,
    HookRetry,
    HookFail,
    HookSuccess,

    SensorStart,
    SensorRetry,
    SensorFail,
    SensorSuccess,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::SlaMiss => "sla_miss",
            EventType::JobStart => "job_start",
            EventType::JobSuccess => "job_success",
            EventType::JobFailure => "failure",
            EventType::TaskStart => "task_start",
            EventType::TaskRetry => "task_retry",
            EventType::TaskFail => "task_fail",
            EventType::TaskSuccess => "task_success",
            EventType::HookStart => "hook_start",
            EventType::HookRetry => "hook_retry",
            EventType::HookFail => "hook_fail",
            EventType::HookSuccess => "hook_success",
            EventType::SensorStart => "sensor_start",
            EventType::SensorRetry => "sensor_retry",
            EventType::SensorFail => "sensor_fail",
            EventType::SensorSuccess => "sensor_success",
        }
    }

    /// Whether this event triggers alerts subscribed to `category`.
    pub fn is_of_type(&self, category: EventCategory) -> bool {
        matches!(
            (self, category),
            (EventType::JobFailure, EventCategory::Failure)
                | (EventType::SlaMiss, EventCategory::SlaMiss)
        )
    }

    /// The operator an operator-level event is about.
    pub fn operator_type(&self) -> Option<OperatorType> {
        match self {
            EventType::TaskStart
            | EventType::TaskRetry
            | EventType::TaskFail
            | EventType::TaskSuccess => Some(OperatorType::Task),
            EventType::HookStart
            | EventType::HookRetry
            | EventType::HookFail
            | EventType::HookSuccess => Some(OperatorType::Hook),
            EventType::SensorStart
            | EventType::SensorRetry
            | EventType::SensorFail
            | EventType::SensorSuccess => Some(OperatorType::Sensor),
            _ => None,
        }
    }

    pub fn is_operator_start(&self) -> bool {
        matches!(
            self,
            EventType::TaskStart | EventType::HookStart | EventType::SensorStart
        )
    }

    /// Run state implied by the event when the payload carries none.
    fn implied_state(&self) -> Option<State> {
        match self {
            EventType::JobStart
            | EventType::TaskStart
            | EventType::HookStart
            | EventType::SensorStart => Some(State::Running),
            EventType::JobSuccess
            | EventType::TaskSuccess
            | EventType::HookSuccess
            | EventType::SensorSuccess => Some(State::Success),
            EventType::JobFailure
            | EventType::TaskFail
            | EventType::HookFail
            | EventType::SensorFail => Some(State::Failed),
            EventType::TaskRetry | EventType::HookRetry | EventType::SensorRetry => {
                Some(State::Running)
            }
            EventType::SlaMiss => None,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = Error;

    /// Case-insensitive; a leading `TYPE_` is ignored.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        let name = lower.strip_prefix("type_").unwrap_or(&lower);
        let ty = match name {
            "sla_miss" => EventType::SlaMiss,
            "job_start" => EventType::JobStart,
            "job_success" => EventType::JobSuccess,
            "failure" | "job_fail" | "job_failure" => EventType::JobFailure,
            "task_start" => EventType::TaskStart,
            "task_retry" => EventType::TaskRetry,
            "task_fail" => EventType::TaskFail,
            "task_success" => EventType::TaskSuccess,
            "hook_start" => EventType::HookStart,
            "hook_retry" => EventType::HookRetry,
            "hook_fail" => EventType::HookFail,
            "hook_success" => EventType::HookSuccess,
            "sensor_start" => EventType::SensorStart,
            "sensor_retry" => EventType::SensorRetry,
            "sensor_fail" => EventType::SensorFail,
            "sensor_success" => EventType::SensorSuccess,
            _ => {
                return Err(Error::invalid_argument(
                    Entity::Event,
                    format!("unknown event {name}"),
                ))
            }
        };
        Ok(ty)
    }
}

/// One run that missed its SLA
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaObject {
    pub job_name: JobName,
    pub job_scheduled_at: DateTime<Utc>,
}

impl fmt::Display for SlaObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(job: {},scheduledAt: {})",
            self.job_name,
            self.job_scheduled_at.to_rfc3339()
        )
    }
}

/// A validated scheduler event
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub job_name: JobName,
    pub tenant: Tenant,
    pub event_type: EventType,
    pub event_time: DateTime<Utc>,
    pub operator_name: String,
    pub status: Option<State>,
    pub job_scheduled_at: DateTime<Utc>,
    pub values: Map<String, Value>,
    pub sla_objects: Vec<SlaObject>,
}

impl Event {
    /// Validate a wire payload into a typed event.
    pub fn from_values(
        type_name: &str,
        values: Map<String, Value>,
        job_name: JobName,
        tenant: Tenant,
    ) -> Result<Self> {
        let event_type: EventType = type_name.parse()?;
        let mut event = Event {
            job_name,
            tenant,
            event_type,
            event_time: DateTime::<Utc>::UNIX_EPOCH,
            operator_name: String::new(),
            status: None,
            job_scheduled_at: DateTime::<Utc>::UNIX_EPOCH,
            values,
            sla_objects: Vec::new(),
        };

        if event_type.is_of_type(EventCategory::SlaMiss) {
            event.sla_objects = parse_sla_objects(&event.values)?;
            return Ok(event);
        }

        event.status = match event.values.get("status").and_then(Value::as_str) {
            Some(s) if !s.is_empty() => Some(s.parse()?),
            _ => event_type.implied_state(),
        };

        let event_time = event
            .values
            .get("event_time")
            .and_then(Value::as_f64)
            .filter(|t| *t > 0.0)
            .ok_or_else(|| {
                Error::invalid_argument(
                    Entity::Event,
                    "property 'event_time'(number) is missing in event payload",
                )
            })?;
        event.event_time = DateTime::from_timestamp(event_time as i64, 0).ok_or_else(|| {
            Error::invalid_argument(Entity::Event, "property 'event_time' is out of range")
        })?;

        event.operator_name = event
            .values
            .get("task_id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .ok_or_else(|| {
                Error::invalid_argument(
                    Entity::Event,
                    "property 'task_id'(string) is missing in event payload",
                )
            })?;

        let scheduled_at = event
            .values
            .get("scheduled_at")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                Error::invalid_argument(
                    Entity::Event,
                    "property 'scheduled_at'(string) is missing in event payload",
                )
            })?;
        event.job_scheduled_at = parse_iso_date(scheduled_at).ok_or_else(|| {
            Error::invalid_argument(
                Entity::Event,
                "property 'scheduled_at' is not in appropriate format",
            )
        })?;

        Ok(event)
    }

    /// The `monitoring` object attached to job-level events, if any.
    pub fn monitoring_values(&self) -> Map<String, Value> {
        self.values
            .get("monitoring")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }
}

fn parse_sla_objects(values: &Map<String, Value>) -> Result<Vec<SlaObject>> {
    let bad_payload = || Error::invalid_argument(Entity::Event, "bad sla payload");
    let slas = match values.get("slas") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(_) => return Err(bad_payload()),
    };

    let mut objects = Vec::with_capacity(slas.len());
    for item in slas {
        let item = item.as_object().ok_or_else(bad_payload)?;
        let dag_id = item.get("dag_id").and_then(Value::as_str).unwrap_or_default();
        let job_name = JobName::try_new(dag_id)
            .map_err(|_| Error::invalid_argument(Entity::Event, "empty job name"))?;
        let scheduled_at = item
            .get("scheduled_at")
            .and_then(Value::as_str)
            .and_then(parse_iso_date)
            .ok_or_else(|| {
                Error::invalid_argument(
                    Entity::Event,
                    "property 'scheduled_at' in slas list is not in appropriate format",
                )
            })?;
        objects.push(SlaObject {
            job_name,
            job_scheduled_at: scheduled_at,
        });
    }

    if objects.is_empty() {
        return Err(Error::invalid_argument(
            Entity::Event,
            "could not parse sla list or received an empty sla list nothing to process",
        ));
    }
    Ok(objects)
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
