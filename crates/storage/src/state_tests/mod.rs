// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

mod jobs;
mod replays;
mod runs;
mod tenants;

use super::*;
use crate::crypto::AppKey;
use skein_core::test_support::at;

const APP_KEY: &str = "Yjo4a0jn1NvYdq79SADC/KaVv9Wu0Ffc";

fn cipher() -> SecretCipher {
    SecretCipher::new(&AppKey::parse(APP_KEY).unwrap())
}

fn now() -> DateTime<Utc> {
    at("2023-01-01T00:00:00Z")
}

fn job_name(name: &str) -> JobName {
    JobName::try_new(name).unwrap()
}

fn run_id(n: u128) -> JobRunId {
    JobRunId::new(uuid_from(n))
}

fn op_id(n: u128) -> OperatorRunId {
    OperatorRunId::new(uuid_from(n))
}

fn replay_id(n: u128) -> ReplayId {
    ReplayId::new(uuid_from(n))
}

fn uuid_from(n: u128) -> uuid::Uuid {
    uuid::Uuid::from_u128(n)
}

#[test]
fn serde_round_trip_keeps_tables() {
    let mut state = MaterializedState::default();
    state.upsert_project(skein_core::test_support::project(), now());
    state.upsert_job(skein_core::test_support::job_with_details("job-a"), now());
    state.create_job_run(
        run_id(1),
        &skein_core::test_support::tenant(),
        &job_name("job-a"),
        at("2023-01-01T12:00:00Z"),
        0,
        now(),
    );

    let json = serde_json::to_string(&state).unwrap();
    let restored: MaterializedState = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.projects.len(), 1);
    assert_eq!(restored.jobs.len(), 1);
    assert_eq!(restored.get_job_run(run_id(1)).unwrap().job_name.as_str(), "job-a");
}

#[test]
fn empty_json_is_empty_state() {
    let state: MaterializedState = serde_json::from_str("{}").unwrap();
    assert!(state.jobs.is_empty());
    assert!(state.replays.is_empty());
}
