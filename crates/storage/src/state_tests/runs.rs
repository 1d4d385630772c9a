// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use skein_core::test_support::tenant;
use skein_core::ErrorKind;

const SCHEDULED: &str = "2023-01-01T12:00:00Z";

fn state_with_run() -> MaterializedState {
    let mut state = MaterializedState::default();
    state.create_job_run(run_id(1), &tenant(), &job_name("job-a"), at(SCHEDULED), 3600, now());
    state
}

#[test]
fn create_job_run_starts_running() {
    let state = state_with_run();
    let run = state
        .get_job_run_by_scheduled_at(&tenant(), &job_name("job-a"), at(SCHEDULED))
        .unwrap();
    assert_eq!(run.id, run_id(1));
    assert_eq!(run.state, State::Running);
    assert_eq!(run.start_time, now());
    assert_eq!(run.sla_definition, 3600);
    assert!(!run.sla_alert);
    assert!(run.end_time.is_none());
}

#[test]
fn create_job_run_is_an_upsert() {
    let mut state = state_with_run();
    state
        .update_job_run(run_id(1), Some(at("2023-01-01T13:00:00Z")), State::Failed, now())
        .unwrap();

    let later = at("2023-01-02T00:00:00Z");
    let id = state.create_job_run(run_id(2), &tenant(), &job_name("job-a"), at(SCHEDULED), 60, later);

    assert_eq!(id, run_id(1));
    assert_eq!(state.job_runs.len(), 1);
    let run = state.get_job_run(id).unwrap();
    assert_eq!(run.state, State::Running);
    assert_eq!(run.start_time, later);
    assert!(run.end_time.is_none());
    assert_eq!(run.sla_definition, 60);
}

#[test]
fn runs_are_distinct_per_scheduled_at_and_tenant() {
    let mut state = state_with_run();
    state.create_job_run(
        run_id(2),
        &tenant(),
        &job_name("job-a"),
        at("2023-01-02T12:00:00Z"),
        0,
        now(),
    );
    state.create_job_run(
        run_id(3),
        &Tenant::new("proj", "other").unwrap(),
        &job_name("job-a"),
        at(SCHEDULED),
        0,
        now(),
    );
    assert_eq!(state.job_runs.len(), 3);
    let runs = state.job_runs_for_job(&tenant(), &job_name("job-a"));
    assert_eq!(
        runs.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![run_id(1), run_id(2)]
    );
}

#[test]
fn missing_run_is_not_found() {
    let state = MaterializedState::default();
    let err = state
        .get_job_run_by_scheduled_at(&tenant(), &job_name("job-a"), at(SCHEDULED))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.entity(), Entity::JobRun);
}

#[test]
fn update_job_run_keeps_end_time_when_absent() {
    let mut state = state_with_run();
    let end = at("2023-01-01T13:00:00Z");
    state.update_job_run(run_id(1), Some(end), State::Success, now()).unwrap();
    state.update_job_run(run_id(1), None, State::Success, now()).unwrap();
    assert_eq!(state.get_job_run(run_id(1)).unwrap().end_time, Some(end));
}

#[test]
fn sla_and_monitoring_updates() {
    let mut state = state_with_run();
    state.mark_sla_alert(run_id(1), now()).unwrap();
    let monitoring = match json!({"slot_millis": 12}) {
        serde_json::Value::Object(m) => m,
        _ => unreachable!(),
    };
    state
        .update_job_run_monitoring(run_id(1), monitoring.clone(), now())
        .unwrap();
    let run = state.get_job_run(run_id(1)).unwrap();
    assert!(run.sla_alert);
    assert_eq!(run.monitoring, monitoring);
    assert!(state.mark_sla_alert(run_id(9), now()).is_err());
}

#[test]
fn operator_runs_live_in_their_own_table() {
    let mut state = state_with_run();
    let start = at("2023-01-01T12:01:00Z");
    state
        .create_operator_run(op_id(10), "bq2bq", OperatorType::Task, run_id(1), start, now())
        .unwrap();
    state
        .create_operator_run(op_id(11), "wait_up", OperatorType::Sensor, run_id(1), start, now())
        .unwrap();

    assert_eq!(state.task_runs.len(), 1);
    assert_eq!(state.sensor_runs.len(), 1);
    assert!(state.hook_runs.is_empty());
    assert!(state
        .get_operator_run("bq2bq", OperatorType::Hook, run_id(1))
        .is_err());
}

#[test]
fn get_operator_run_returns_latest_attempt() {
    let mut state = state_with_run();
    state
        .create_operator_run(
            op_id(10),
            "bq2bq",
            OperatorType::Task,
            run_id(1),
            at("2023-01-01T12:01:00Z"),
            now(),
        )
        .unwrap();
    state
        .create_operator_run(
            op_id(11),
            "bq2bq",
            OperatorType::Task,
            run_id(1),
            at("2023-01-01T12:05:00Z"),
            now(),
        )
        .unwrap();
    let latest = state
        .get_operator_run("bq2bq", OperatorType::Task, run_id(1))
        .unwrap();
    assert_eq!(latest.id, op_id(11));
    assert_eq!(state.operator_runs(OperatorType::Task, run_id(1)).len(), 2);
}

#[test]
fn update_operator_run_sets_state_and_end() {
    let mut state = state_with_run();
    state
        .create_operator_run(op_id(10), "bq2bq", OperatorType::Task, run_id(1), now(), now())
        .unwrap();
    let end = at("2023-01-01T12:30:00Z");
    state
        .update_operator_run(OperatorType::Task, op_id(10), end, State::Success, now())
        .unwrap();
    let run = state
        .get_operator_run("bq2bq", OperatorType::Task, run_id(1))
        .unwrap();
    assert_eq!(run.status, State::Success);
    assert_eq!(run.end_time, Some(end));

    let err = state
        .update_operator_run(OperatorType::Hook, op_id(10), end, State::Success, now())
        .unwrap_err();
    assert_eq!(err.entity(), Entity::OperatorRun);
}

#[test]
fn operator_run_requires_job_run() {
    let mut state = MaterializedState::default();
    let err = state
        .create_operator_run(op_id(10), "bq2bq", OperatorType::Task, run_id(1), now(), now())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
