// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::cron::parse_cron_schedule;
use crate::test_support::{at, tenant};
use yare::parameterized;

#[parameterized(
    pending = { "pending", State::Pending },
    upper_pending = { "PENDING", State::Pending },
    accepted = { "accepted", State::Accepted },
    running = { "RUNNING", State::Running },
    queued = { "queued", State::Queued },
    success = { "SUCCESS", State::Success },
    failed = { "failed", State::Failed },
    replayed = { "REPLAYED", State::Replayed },
    in_progress = { "in_progress", State::InProgress },
    wait_upstream = { "wait_upstream", State::WaitUpstream },
)]
fn parses_state(input: &str, expected: State) {
    assert_eq!(input.parse::<State>().unwrap(), expected);
}

#[test]
fn unknown_state_is_invalid_argument() {
    let err = JobRunStatus::from_str_state(at("2023-01-01T00:00:00Z"), "unregisteredState")
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid argument for entity jobRun: invalid state for run unregisteredState"
    );
}

#[test]
fn state_display_is_lowercase() {
    assert_eq!(State::Pending.to_string(), "pending");
    assert_eq!(State::WaitUpstream.to_string(), "wait_upstream");
}

#[test]
fn operator_type_display_and_start_state() {
    assert_eq!(OperatorType::Sensor.to_string(), "sensor");
    assert_eq!(OperatorType::Hook.to_string(), "hook");
    assert_eq!(OperatorType::Task.to_string(), "task");
    assert_eq!(OperatorType::Task.start_job_state(), State::InProgress);
    assert_eq!(OperatorType::Sensor.start_job_state(), State::WaitUpstream);
}

#[test]
fn logical_time_is_previous_tick() {
    let cron = parse_cron_schedule("@midnight").unwrap();
    let status = JobRunStatus::new(at("2023-01-02T00:00:00Z"), State::Running);
    assert_eq!(status.logical_time(&cron), at("2023-01-01T00:00:00Z"));
}

#[test]
fn execution_start_is_prev_of_start() {
    let cron = parse_cron_schedule("@midnight").unwrap();
    let start = at("2022-01-01T01:01:01Z");
    let criteria = JobRunsCriteria {
        name: "JobName".into(),
        start_date: start,
        end_date: start + Duration::hours(1),
        filter: vec![],
        only_last_run: false,
    };
    assert_eq!(criteria.execution_start(&cron), at("2022-01-01T00:00:00Z"));
    assert_eq!(criteria.execution_end(&cron), at("2021-12-31T00:00:00Z"));
}

#[test]
fn execution_end_on_fire_time_uses_previous_schedule() {
    let cron = parse_cron_schedule("@midnight").unwrap();
    let end = at("2022-01-01T00:00:00Z");
    let criteria = JobRunsCriteria {
        name: "JobName".into(),
        start_date: end - Duration::hours(1),
        end_date: end,
        filter: vec![],
        only_last_run: false,
    };
    assert_eq!(criteria.execution_end(&cron), at("2021-12-31T00:00:00Z"));
}

fn three_runs() -> JobRunStatusList {
    JobRunStatusList(vec![
        JobRunStatus::new(at("2023-01-03T00:00:00Z"), State::Running),
        JobRunStatus::new(at("2023-01-01T00:00:00Z"), State::Pending),
        JobRunStatus::new(at("2023-01-02T00:00:00Z"), State::Running),
    ])
}

#[test]
fn sorted_by_states_filters_and_orders() {
    let runs = three_runs().sorted_by_states(&[State::Running]);
    assert_eq!(
        runs,
        vec![
            JobRunStatus::new(at("2023-01-02T00:00:00Z"), State::Running),
            JobRunStatus::new(at("2023-01-03T00:00:00Z"), State::Running),
        ]
    );
}

#[test]
fn sorted_by_scheduled_at_orders_all() {
    let runs = three_runs().sorted_by_scheduled_at();
    let times: Vec<_> = runs.iter().map(|r| r.scheduled_at).collect();
    assert_eq!(
        times,
        vec![
            at("2023-01-01T00:00:00Z"),
            at("2023-01-02T00:00:00Z"),
            at("2023-01-03T00:00:00Z"),
        ]
    );
}

#[test]
fn merge_with_updated_runs_overrides_states() {
    let list = JobRunStatusList(three_runs().sorted_by_scheduled_at());
    let updated = HashMap::from([
        (at("2023-01-01T00:00:00Z"), State::Success),
        (at("2023-01-02T00:00:00Z"), State::Success),
    ]);

    let merged = list.merge_with_updated_runs(&updated);
    let states: Vec<_> = merged.iter().map(|r| r.state).collect();
    assert_eq!(states, vec![State::Success, State::Success, State::Running]);
}

#[test]
fn status_map_keys_by_scheduled_at() {
    let map = three_runs().to_status_map();
    assert_eq!(map.len(), 3);
    assert_eq!(map[&at("2023-01-01T00:00:00Z")], State::Pending);
}

#[test]
fn sla_breach_compares_elapsed_to_definition() {
    let start = at("2023-01-01T00:00:00Z");
    let mut run = JobRun {
        id: JobRunId::nil(),
        job_name: JobName::try_new("job1").unwrap(),
        tenant: tenant(),
        state: State::Running,
        scheduled_at: start,
        start_time: start,
        end_time: None,
        sla_definition: 3600,
        sla_alert: false,
        monitoring: Map::new(),
    };

    assert!(!run.has_sla_breached(start + Duration::minutes(30)));
    assert!(run.has_sla_breached(start + Duration::hours(2)));

    run.end_time = Some(start + Duration::minutes(10));
    assert!(!run.has_sla_breached(start + Duration::hours(5)));
}

#[test]
fn executor_type_parses_case_insensitively() {
    assert_eq!("TASK".parse::<ExecutorType>().unwrap(), ExecutorType::Task);
    assert_eq!("hook".parse::<ExecutorType>().unwrap(), ExecutorType::Hook);
    assert!("sensor".parse::<ExecutorType>().is_err());
}
