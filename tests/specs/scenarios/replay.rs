//! Replay scenarios
//!
//! A replay request goes through the validator, then the manager hands it
//! to a worker once per tick until it reaches a terminal state.

use std::collections::BTreeMap;
use std::sync::Arc;

use skein_adapters::SchedulerCall;
use skein_core::test_support::{at, job_with_details, tenant};
use skein_core::{
    ErrorKind, FakeClock, JobRunStatus, ReplayConfig, ReplayId, ReplayState, SequentialIdGen,
    State,
};
use skein_engine::test_helpers::{setup, TestContext};
use skein_engine::{ManagerConfig, ReplayManager};
use tokio_util::sync::CancellationToken;

const JOB: &str = "sample-job";
const S1: &str = "2023-01-01T12:00:00Z";
const S2: &str = "2023-01-02T12:00:00Z";

fn window(parallel: bool) -> ReplayConfig {
    ReplayConfig::new(
        at("2023-01-01T00:00:00Z"),
        at("2023-01-02T23:00:00Z"),
        parallel,
        BTreeMap::new(),
        "rerun after fix",
    )
}

async fn request(ctx: &TestContext, parallel: bool) -> ReplayId {
    ctx.add_job(job_with_details(JOB));
    ctx.engine
        .create_replay(&CancellationToken::new(), &tenant(), JOB, window(parallel))
        .await
        .unwrap()
}

fn manager(ctx: &TestContext) -> ReplayManager<FakeClock, SequentialIdGen> {
    ReplayManager::new(Arc::clone(&ctx.engine), ManagerConfig::default())
}

fn scheduler_runs(ctx: &TestContext, s1: State, s2: State) {
    ctx.scheduler.set_runs(
        &tenant(),
        JOB,
        vec![JobRunStatus::new(at(S1), s1), JobRunStatus::new(at(S2), s2)],
    );
}

fn cleared_logical_times(ctx: &TestContext) -> Vec<String> {
    ctx.scheduler
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            SchedulerCall::Clear { logical_time, .. } => Some(logical_time.to_rfc3339()),
            _ => None,
        })
        .collect()
}

fn state_of(ctx: &TestContext, id: ReplayId) -> ReplayState {
    ctx.engine.replay_by_id(id).unwrap().replay.state
}

#[tokio::test]
async fn sequential_replay_clears_one_run_per_tick() {
    let ctx = setup();
    let id = request(&ctx, false).await;
    let manager = manager(&ctx);
    let cancel = CancellationToken::new();
    assert_eq!(state_of(&ctx, id), ReplayState::Created);

    manager.tick_once(&cancel).await;
    assert_eq!(state_of(&ctx, id), ReplayState::PartialReplayed);
    assert_eq!(cleared_logical_times(&ctx), vec!["2022-12-31T12:00:00+00:00"]);

    scheduler_runs(&ctx, State::Success, State::Pending);
    manager.tick_once(&cancel).await;
    assert_eq!(state_of(&ctx, id), ReplayState::Replayed);
    assert_eq!(
        cleared_logical_times(&ctx),
        vec!["2022-12-31T12:00:00+00:00", "2023-01-01T12:00:00+00:00"]
    );

    scheduler_runs(&ctx, State::Success, State::Success);
    manager.tick_once(&cancel).await;
    let done = ctx.engine.replay_by_id(id).unwrap();
    assert_eq!(done.replay.state, ReplayState::Success);
    assert!(done.runs.iter().all(|r| r.state == State::Success));
}

#[tokio::test]
async fn failed_run_fails_the_replay_once_all_runs_finish() {
    let ctx = setup();
    let id = request(&ctx, false).await;
    let manager = manager(&ctx);
    let cancel = CancellationToken::new();

    manager.tick_once(&cancel).await;
    scheduler_runs(&ctx, State::Failed, State::Pending);
    manager.tick_once(&cancel).await;
    assert_eq!(state_of(&ctx, id), ReplayState::Replayed);

    scheduler_runs(&ctx, State::Failed, State::Running);
    manager.tick_once(&cancel).await;
    assert_eq!(state_of(&ctx, id), ReplayState::Replayed);

    scheduler_runs(&ctx, State::Failed, State::Success);
    manager.tick_once(&cancel).await;
    assert_eq!(state_of(&ctx, id), ReplayState::Failed);
}

#[tokio::test]
async fn overlapping_request_is_refused_while_the_first_is_ongoing() {
    let ctx = setup();
    request(&ctx, true).await;

    let err = ctx
        .engine
        .create_replay(&CancellationToken::new(), &tenant(), JOB, window(false))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::FailedPrecondition);
    assert_eq!(ctx.engine.replay_list("proj").len(), 1);
}

#[tokio::test]
async fn finished_replay_frees_its_window() {
    let ctx = setup();
    let id = request(&ctx, true).await;
    let manager = manager(&ctx);
    let cancel = CancellationToken::new();

    manager.tick_once(&cancel).await;
    scheduler_runs(&ctx, State::Success, State::Success);
    manager.tick_once(&cancel).await;
    assert_eq!(state_of(&ctx, id), ReplayState::Success);

    ctx.engine
        .create_replay(&cancel, &tenant(), JOB, window(false))
        .await
        .unwrap();
    assert_eq!(ctx.engine.replay_list("proj").len(), 2);
}
