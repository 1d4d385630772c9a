// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use skein_core::test_support::{job_event, sla_miss_event};
use std::sync::Arc;

#[derive(Clone, Default)]
struct FakePagerDuty {
    events: Arc<Mutex<Vec<Value>>>,
}

async fn enqueue(
    State(pd): State<FakePagerDuty>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if body["routing_key"] == "bad-key" {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "status": "invalid event" })),
        );
    }
    pd.events.lock().push(body);
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "status": "success" })),
    )
}

async fn start_fake_pagerduty() -> (PagerDutySender, FakePagerDuty) {
    let pd = FakePagerDuty::default();
    let app = Router::new()
        .route("/v2/enqueue", post(enqueue))
        .with_state(pd.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (
        PagerDutySender::new(reqwest::Client::new(), format!("http://{addr}")),
        pd,
    )
}

fn attrs(job: &str) -> NotifyAttrs {
    NotifyAttrs {
        owner: "owner@example.com".to_string(),
        job_event: job_event(job, "failure", "2022-03-01T12:00:00Z"),
        secret: "routing-key".to_string(),
        route: "#payments".to_string(),
    }
}

fn key(secret: &str) -> BatchKey {
    BatchKey {
        receiver: "#payments".to_string(),
        secret: secret.to_string(),
    }
}

#[tokio::test]
async fn send_enqueues_one_trigger_per_event() {
    let (sender, pd) = start_fake_pagerduty().await;

    sender
        .send(&key("routing-key"), &[attrs("a"), attrs("b")])
        .await
        .unwrap();

    let events = pd.events.lock().clone();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["routing_key"], "routing-key");
    assert_eq!(events[0]["event_action"], "trigger");
    assert_eq!(events[1]["payload"]["source"], "b");
}

#[tokio::test]
async fn rejected_events_are_status_errors() {
    let (sender, _) = start_fake_pagerduty().await;

    let err = sender.send(&key("bad-key"), &[attrs("a")]).await.unwrap_err();

    assert!(matches!(err, NotifyError::Status { status: 400, .. }), "{err:?}");
}

#[test]
fn failure_summary_names_tenant_and_job() {
    let a = attrs("sample_select");
    let value = serde_json::to_value(enqueue_request("k", &a)).unwrap();

    assert_eq!(
        value["payload"]["summary"],
        "[Job] Failure | proj/ns | sample_select"
    );
    assert_eq!(value["payload"]["severity"], "critical");
    assert_eq!(value["payload"]["custom_details"]["owner"], "owner@example.com");
    assert_eq!(
        value["payload"]["custom_details"]["scheduled_at"],
        "2022-03-01T12:00:00Z"
    );
}

#[test]
fn sla_summary_says_breached() {
    let a = NotifyAttrs {
        job_event: sla_miss_event("sample_select", &["2022-03-01T12:00:00Z"]),
        ..attrs("sample_select")
    };
    let value = serde_json::to_value(enqueue_request("k", &a)).unwrap();
    assert_eq!(
        value["payload"]["summary"],
        "[Job] SLA Breached | proj/ns | sample_select"
    );
}
