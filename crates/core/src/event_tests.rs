// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{at, tenant};
use serde_json::json;
use yare::parameterized;

fn values(v: Value) -> Map<String, Value> {
    match v {
        Value::Object(m) => m,
        _ => panic!("expected object"),
    }
}

fn job_name() -> JobName {
    JobName::try_new("job1").unwrap()
}

#[parameterized(
    plain = { "task_start", EventType::TaskStart },
    prefixed = { "TYPE_TASK_START", EventType::TaskStart },
    failure = { "failure", EventType::JobFailure },
    job_fail_alias = { "job_fail", EventType::JobFailure },
    sla = { "TYPE_SLA_MISS", EventType::SlaMiss },
    sensor = { "sensor_success", EventType::SensorSuccess },
    job_start = { "job_start", EventType::JobStart },
)]
fn parses_event_type(input: &str, expected: EventType) {
    assert_eq!(input.parse::<EventType>().unwrap(), expected);
}

#[test]
fn unknown_event_type_is_invalid() {
    let err = "nope".parse::<EventType>().unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid argument for entity event: unknown event nope"
    );
}

#[test]
fn category_membership() {
    assert!(EventType::JobFailure.is_of_type(EventCategory::Failure));
    assert!(EventType::SlaMiss.is_of_type(EventCategory::SlaMiss));
    assert!(!EventType::TaskFail.is_of_type(EventCategory::Failure));
    assert!(!EventType::JobSuccess.is_of_type(EventCategory::SlaMiss));
}

#[test]
fn operator_classification() {
    assert_eq!(EventType::HookRetry.operator_type(), Some(OperatorType::Hook));
    assert_eq!(EventType::JobSuccess.operator_type(), None);
    assert!(EventType::SensorStart.is_operator_start());
    assert!(!EventType::SensorFail.is_operator_start());
}

#[test]
fn builds_operator_event() {
    let event = Event::from_values(
        "task_start",
        values(json!({
            "event_time": 1672617600.0,
            "task_id": "bq2bq",
            "scheduled_at": "2023-01-02T00:00:00Z",
            "status": "running",
        })),
        job_name(),
        tenant(),
    )
    .unwrap();

    assert_eq!(event.event_type, EventType::TaskStart);
    assert_eq!(event.operator_name, "bq2bq");
    assert_eq!(event.status, Some(State::Running));
    assert_eq!(event.event_time, at("2023-01-02T00:00:00Z"));
    assert_eq!(event.job_scheduled_at, at("2023-01-02T00:00:00Z"));
}

#[test]
fn status_defaults_from_event_type() {
    let event = Event::from_values(
        "job_success",
        values(json!({
            "event_time": 1672617600,
            "task_id": "job1",
            "scheduled_at": "2023-01-02T00:00:00Z",
        })),
        job_name(),
        tenant(),
    )
    .unwrap();
    assert_eq!(event.status, Some(State::Success));
}

#[parameterized(
    missing_time = {
        json!({"task_id": "t", "scheduled_at": "2023-01-02T00:00:00Z"}),
        "property 'event_time'(number) is missing in event payload"
    },
    zero_time = {
        json!({"event_time": 0, "task_id": "t", "scheduled_at": "2023-01-02T00:00:00Z"}),
        "property 'event_time'(number) is missing in event payload"
    },
    missing_task = {
        json!({"event_time": 100, "scheduled_at": "2023-01-02T00:00:00Z"}),
        "property 'task_id'(string) is missing in event payload"
    },
    numeric_task = {
        json!({"event_time": 100, "task_id": 5, "scheduled_at": "2023-01-02T00:00:00Z"}),
        "property 'task_id'(string) is missing in event payload"
    },
    missing_scheduled = {
        json!({"event_time": 100, "task_id": "t"}),
        "property 'scheduled_at'(string) is missing in event payload"
    },
    bad_scheduled = {
        json!({"event_time": 100, "task_id": "t", "scheduled_at": "2023-01-02 00:00"}),
        "property 'scheduled_at' is not in appropriate format"
    },
)]
fn rejects_malformed_payload(payload: Value, message: &str) {
    let err = Event::from_values("task_fail", values(payload), job_name(), tenant()).unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
    assert_eq!(err.message(), message);
}

#[test]
fn rejects_unknown_status() {
    let err = Event::from_values(
        "task_fail",
        values(json!({
            "event_time": 100,
            "task_id": "t",
            "scheduled_at": "2023-01-02T00:00:00Z",
            "status": "exploded",
        })),
        job_name(),
        tenant(),
    )
    .unwrap_err();
    assert_eq!(err.message(), "invalid state for run exploded");
}

#[test]
fn builds_sla_event() {
    let event = Event::from_values(
        "sla_miss",
        values(json!({
            "slas": [
                {"dag_id": "job1", "scheduled_at": "2023-01-02T00:00:00Z"},
                {"dag_id": "job1", "scheduled_at": "2023-01-03T00:00:00Z"},
            ]
        })),
        job_name(),
        tenant(),
    )
    .unwrap();

    assert_eq!(event.sla_objects.len(), 2);
    assert_eq!(
        event.sla_objects[0].to_string(),
        "(job: job1,scheduledAt: 2023-01-02T00:00:00+00:00)"
    );
}

#[parameterized(
    empty_list = { json!({"slas": []}), "could not parse sla list or received an empty sla list nothing to process" },
    not_a_list = { json!({"slas": "x"}), "bad sla payload" },
    empty_name = { json!({"slas": [{"dag_id": "", "scheduled_at": "2023-01-02T00:00:00Z"}]}), "empty job name" },
    bad_time = { json!({"slas": [{"dag_id": "j", "scheduled_at": "yesterday"}]}), "property 'scheduled_at' in slas list is not in appropriate format" },
)]
fn rejects_malformed_sla(payload: Value, message: &str) {
    let err = Event::from_values("sla_miss", values(payload), job_name(), tenant()).unwrap_err();
    assert_eq!(err.message(), message);
}

#[test]
fn monitoring_values_are_extracted() {
    let event = Event::from_values(
        "job_success",
        values(json!({
            "event_time": 100,
            "task_id": "t",
            "scheduled_at": "2023-01-02T00:00:00Z",
            "monitoring": {"slot_millis": 12}
        })),
        job_name(),
        tenant(),
    )
    .unwrap();
    assert_eq!(event.monitoring_values()["slot_millis"], json!(12));
}
