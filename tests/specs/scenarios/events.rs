//! Event ingest scenarios
//!
//! Scheduler events arrive as loose JSON maps; they update the run store
//! and fan out to the job's alert channels.

use serde_json::{json, Map, Value};
use skein_core::test_support::{alert, at, job_with_details, tenant};
use skein_core::{EventCategory, JobName, JobRunsCriteria, State};
use skein_engine::test_helpers::{setup, TestContext, SLACK_TOKEN};
use tokio_util::sync::CancellationToken;

const JOB: &str = "sample-job";
const S1: &str = "2023-01-01T12:00:00Z";

fn payload(extra: Value) -> Map<String, Value> {
    let Value::Object(mut values) = json!({
        "event_time": at(S1).timestamp() + 60,
        "task_id": JOB,
        "scheduled_at": S1,
    }) else {
        unreachable!("object literal");
    };
    if let Value::Object(extra) = extra {
        values.extend(extra);
    }
    values
}

async fn send(ctx: &TestContext, event_type: &str, extra: Value) {
    ctx.engine
        .register_job_event(
            &CancellationToken::new(),
            &tenant(),
            JOB,
            event_type,
            payload(extra),
        )
        .await
        .unwrap();
}

fn stored_state(ctx: &TestContext) -> State {
    ctx.state
        .lock()
        .get_job_run_by_scheduled_at(&tenant(), &JobName::try_new(JOB).unwrap(), at(S1))
        .unwrap()
        .state
}

#[tokio::test]
async fn failed_run_is_recorded_and_alerted() {
    let ctx = setup();
    let mut job = job_with_details(JOB);
    job.alerts = vec![alert(EventCategory::Failure, &["slack://#data-alerts"])];
    ctx.add_job(job);

    send(&ctx, "job_start", json!({})).await;
    assert_eq!(stored_state(&ctx), State::Running);
    assert!(ctx.slack.calls().is_empty());

    send(&ctx, "failure", json!({})).await;
    assert_eq!(stored_state(&ctx), State::Failed);

    let calls = ctx.slack.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].secret, SLACK_TOKEN);
    assert_eq!(calls[0].route, "#data-alerts");
    assert_eq!(ctx.engine.telemetry().job_event_failure, 1);
}

#[tokio::test]
async fn successful_run_is_quiet() {
    let ctx = setup();
    let mut job = job_with_details(JOB);
    job.alerts = vec![alert(EventCategory::Failure, &["slack://#data-alerts"])];
    ctx.add_job(job);

    send(&ctx, "job_start", json!({})).await;
    send(&ctx, "job_success", json!({})).await;

    assert_eq!(stored_state(&ctx), State::Success);
    assert!(ctx.slack.calls().is_empty());
    assert_eq!(ctx.engine.telemetry().job_event_failure, 0);
}

#[tokio::test]
async fn event_without_time_is_rejected() {
    let ctx = setup();
    ctx.add_job(job_with_details(JOB));
    let mut values = payload(json!({}));
    values.remove("event_time");

    let err = ctx
        .engine
        .register_job_event(&CancellationToken::new(), &tenant(), JOB, "job_start", values)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), skein_core::ErrorKind::InvalidArgument);
    assert!(err.to_string().contains("event_time"));
}

#[tokio::test]
async fn last_run_query_reflects_the_scheduler() {
    let ctx = setup();
    ctx.add_job(job_with_details(JOB));
    ctx.scheduler.set_runs(
        &tenant(),
        JOB,
        vec![skein_core::JobRunStatus::new(at(S1), State::Success)],
    );

    let runs = ctx
        .engine
        .get_job_runs(
            &CancellationToken::new(),
            "proj",
            JOB,
            &JobRunsCriteria {
                name: JOB.to_string(),
                start_date: at(S1),
                end_date: at(S1),
                filter: Vec::new(),
                only_last_run: true,
            },
        )
        .await
        .unwrap();

    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].state, State::Success);
}
