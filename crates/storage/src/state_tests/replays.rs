// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use skein_core::test_support::tenant;
use skein_core::filter::{with_string, with_string_array, Filter, FilterOpt, Operand};
use skein_core::{ErrorKind, ReplayConfig};
use yare::parameterized;

fn replay(job: &str, start: &str, end: &str, created_at: &str) -> Replay {
    Replay::new_request(
        job_name(job),
        tenant(),
        ReplayConfig::new(at(start), at(end), false, BTreeMap::new(), ""),
        ReplayState::Created,
        at(created_at),
    )
}

fn pending(scheduled_at: &str) -> JobRunStatus {
    JobRunStatus::new(at(scheduled_at), State::Pending)
}

fn state_with_replays() -> MaterializedState {
    let mut state = MaterializedState::default();
    state.register_replay(
        replay_id(2),
        replay("job-a", "2023-01-01T00:00:00Z", "2023-01-02T00:00:00Z", "2023-02-02T00:00:00Z"),
        vec![pending("2023-01-01T12:00:00Z")],
        now(),
    );
    state.register_replay(
        replay_id(1),
        replay("job-b", "2023-01-01T00:00:00Z", "2023-01-02T00:00:00Z", "2023-02-01T00:00:00Z"),
        vec![pending("2023-01-01T12:00:00Z")],
        now(),
    );
    state
}

#[test]
fn register_assigns_id_and_stores_runs() {
    let state = state_with_replays();
    let stored = state.get_replay(replay_id(2)).unwrap();
    assert_eq!(stored.replay.id, replay_id(2));
    assert_eq!(stored.runs, vec![pending("2023-01-01T12:00:00Z")]);
}

#[test]
fn unknown_replay_is_not_found() {
    let err = MaterializedState::default()
        .get_replay(replay_id(7))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.entity(), Entity::Replay);
}

#[test]
fn next_executable_is_fifo_and_claims() {
    let mut state = state_with_replays();
    let first = state.next_executable_replay(now()).unwrap();
    assert_eq!(first.replay.id, replay_id(1));
    assert_eq!(first.replay.state, ReplayState::Created);
    assert_eq!(
        state.get_replay(replay_id(1)).unwrap().replay.state,
        ReplayState::InProgress
    );

    let second = state.next_executable_replay(now()).unwrap();
    assert_eq!(second.replay.id, replay_id(2));

    let err = state.next_executable_replay(now()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[parameterized(
    created = { ReplayState::Created, true },
    partial = { ReplayState::PartialReplayed, true },
    replayed = { ReplayState::Replayed, true },
    in_progress = { ReplayState::InProgress, false },
    success = { ReplayState::Success, false },
    failed = { ReplayState::Failed, false },
)]
fn executable_states(state_value: ReplayState, executable: bool) {
    let mut state = state_with_replays();
    state.update_replay_status(replay_id(1), state_value, "", now()).unwrap();
    state.update_replay_status(replay_id(2), ReplayState::Success, "", now()).unwrap();
    assert_eq!(state.next_executable_replay(now()).is_ok(), executable);
}

#[test]
fn update_replay_replaces_runs_and_message() {
    let mut state = state_with_replays();
    let runs = vec![JobRunStatus::new(at("2023-01-01T12:00:00Z"), State::Success)];
    state
        .update_replay(replay_id(1), ReplayState::Replayed, runs.clone(), "done", now())
        .unwrap();
    let stored = state.get_replay(replay_id(1)).unwrap();
    assert_eq!(stored.replay.state, ReplayState::Replayed);
    assert_eq!(stored.replay.message, "done");
    assert_eq!(stored.runs, runs);
}

#[test]
fn replays_by_status_and_project() {
    let mut state = state_with_replays();
    state
        .update_replay_status(replay_id(2), ReplayState::Failed, "replay timed out", now())
        .unwrap();
    let ongoing = state.replays_by_status(&ReplayState::ONGOING);
    assert_eq!(ongoing.len(), 1);
    assert_eq!(ongoing[0].id, replay_id(1));

    let listed = state.replays_matching(&Filter::new([with_string(Operand::PROJECT_NAME, "proj")]));
    assert_eq!(
        listed.iter().map(|r| r.replay.id).collect::<Vec<_>>(),
        vec![replay_id(2), replay_id(1)]
    );
    assert!(state
        .replays_matching(&Filter::new([with_string(Operand::PROJECT_NAME, "other")]))
        .is_empty());
}

#[parameterized(
    everything = { vec![], &[2, 1] },
    by_job = { vec![with_string(Operand::JOB_NAME, "job-b")], &[1] },
    by_namespace = { vec![with_string(Operand::NAMESPACE_NAME, "ns")], &[2, 1] },
    other_namespace = { vec![with_string(Operand::NAMESPACE_NAME, "other")], &[] },
    by_status = { vec![with_string_array(Operand::REPLAY_STATUS, ["failed"])], &[2] },
    job_and_status = {
        vec![
            with_string(Operand::JOB_NAME, "job-b"),
            with_string_array(Operand::REPLAY_STATUS, ["failed"]),
        ],
        &[]
    },
)]
fn replays_matching_narrows_by_each_operand(opts: Vec<FilterOpt>, expected: &[u128]) {
    let mut state = state_with_replays();
    state
        .update_replay_status(replay_id(2), ReplayState::Failed, "", now())
        .unwrap();

    let listed = state.replays_matching(&Filter::new(opts));

    assert_eq!(
        listed.iter().map(|r| r.replay.id).collect::<Vec<_>>(),
        expected.iter().map(|n| replay_id(*n)).collect::<Vec<_>>()
    );
}

#[test]
fn replay_job_config_merges_covering_replays_oldest_first() {
    let mut state = MaterializedState::default();
    let mut older = replay("job-a", "2023-01-01T00:00:00Z", "2023-01-05T00:00:00Z", "2023-02-01T00:00:00Z");
    older.config.job_config =
        BTreeMap::from([("A".to_string(), "old".to_string()), ("B".to_string(), "b".to_string())]);
    let mut newer = replay("job-a", "2023-01-02T00:00:00Z", "2023-01-03T00:00:00Z", "2023-02-02T00:00:00Z");
    newer.config.job_config = BTreeMap::from([("A".to_string(), "new".to_string())]);
    let mut other_job = replay("job-b", "2023-01-01T00:00:00Z", "2023-01-05T00:00:00Z", "2023-02-03T00:00:00Z");
    other_job.config.job_config = BTreeMap::from([("C".to_string(), "c".to_string())]);
    state.register_replay(replay_id(1), older, vec![], now());
    state.register_replay(replay_id(2), newer, vec![], now());
    state.register_replay(replay_id(3), other_job, vec![], now());

    let config = state.replay_job_config(&tenant(), &job_name("job-a"), at("2023-01-02T12:00:00Z"));
    assert_eq!(
        config,
        BTreeMap::from([("A".to_string(), "new".to_string()), ("B".to_string(), "b".to_string())])
    );

    let outside = state.replay_job_config(&tenant(), &job_name("job-a"), at("2023-01-04T12:00:00Z"));
    assert_eq!(outside.get("A").map(String::as_str), Some("old"));
    assert!(state
        .replay_job_config(&tenant(), &job_name("job-a"), at("2023-03-01T00:00:00Z"))
        .is_empty());
}
