// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{at, tenant};
use chrono::Duration;
use yare::parameterized;

fn config() -> ReplayConfig {
    let start = at("2023-01-02T00:00:00Z");
    ReplayConfig::new(
        start,
        start + Duration::hours(48),
        false,
        BTreeMap::from([("EXECUTION_PROJECT".to_string(), "example_project".to_string())]),
        "sample backfill",
    )
}

fn replay_with_runs(runs: Vec<JobRunStatus>) -> ReplayWithRun {
    ReplayWithRun {
        replay: Replay::new_request(
            JobName::try_new("sample-job-A").unwrap(),
            tenant(),
            config(),
            ReplayState::Created,
            at("2023-01-05T00:00:00Z"),
        ),
        runs,
    }
}

#[test]
fn new_request_has_no_id_or_message() {
    let r = replay_with_runs(vec![]).replay;
    assert!(r.id.is_nil());
    assert_eq!(r.message, "");
    assert_eq!(r.state, ReplayState::Created);
}

#[test]
fn executable_runs_are_pending_bounds() {
    let s1 = at("2023-01-02T12:00:00Z");
    let day = Duration::hours(24);
    let rwr = replay_with_runs(vec![
        JobRunStatus::new(s1, State::InProgress),
        JobRunStatus::new(s1 + day, State::Pending),
        JobRunStatus::new(s1 + day * 2, State::Pending),
        JobRunStatus::new(s1 + day * 3, State::InProgress),
    ]);

    assert_eq!(rwr.first_executable_run().unwrap().scheduled_at, s1 + day);
    assert_eq!(rwr.last_executable_run().unwrap().scheduled_at, s1 + day * 2);
}

#[test]
fn no_pending_runs_means_nothing_executable() {
    let rwr = replay_with_runs(vec![JobRunStatus::new(
        at("2023-01-02T12:00:00Z"),
        State::Success,
    )]);
    assert!(rwr.first_executable_run().is_none());
}

#[parameterized(
    created = { "created", ReplayState::Created },
    upper_created = { "CREATED", ReplayState::Created },
    in_progress = { "in progress", ReplayState::InProgress },
    upper_in_progress = { "IN PROGRESS", ReplayState::InProgress },
    invalid = { "invalid", ReplayState::Invalid },
    partial = { "partial replayed", ReplayState::PartialReplayed },
    replayed = { "REPLAYED", ReplayState::Replayed },
    success = { "success", ReplayState::Success },
    failed = { "FAILED", ReplayState::Failed },
)]
fn parses_replay_state(input: &str, expected: ReplayState) {
    assert_eq!(input.parse::<ReplayState>().unwrap(), expected);
}

#[test]
fn unknown_replay_state_is_invalid() {
    let err = "unregisteredState".parse::<ReplayState>().unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid argument for entity jobRun: invalid state for replay unregisteredState"
    );
}

#[test]
fn replay_state_serializes_with_spaces() {
    assert_eq!(
        serde_json::to_string(&ReplayState::PartialReplayed).unwrap(),
        "\"partial replayed\""
    );
}

#[parameterized(
    inside = { "2023-01-02T10:00:00Z", "2023-01-03T00:00:00Z", true },
    touching_end = { "2023-01-04T00:00:00Z", "2023-01-05T00:00:00Z", true },
    touching_start = { "2023-01-01T00:00:00Z", "2023-01-02T00:00:00Z", true },
    before = { "2022-12-01T00:00:00Z", "2023-01-01T23:59:59Z", false },
    after = { "2023-01-04T00:00:01Z", "2023-01-06T00:00:00Z", false },
    covering = { "2022-12-01T00:00:00Z", "2023-02-01T00:00:00Z", true },
)]
fn window_intersection(start: &str, end: &str, expected: bool) {
    assert_eq!(config().intersects(at(start), at(end)), expected);
}

#[test]
fn ongoing_states() {
    assert!(ReplayState::PartialReplayed.is_ongoing());
    assert!(!ReplayState::Success.is_ongoing());
    assert!(!ReplayState::EXECUTABLE.contains(&ReplayState::InProgress));
}
