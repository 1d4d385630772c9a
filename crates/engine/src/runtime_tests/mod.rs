// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::setup;
use skein_core::test_support::{job_with_details, sla_miss_event};
use skein_core::{ErrorKind, NotifyAttrs};
use std::sync::atomic::{AtomicBool, Ordering};

#[test]
fn job_cron_rejects_an_empty_interval() {
    let mut job = job_with_details("sample-job");
    job.schedule.interval = String::new();

    let err = job_cron(&job).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(err.to_string().contains("cannot get job runs, job interval is empty"));
}

#[test]
fn job_cron_reports_unparsable_interval_as_internal() {
    let mut job = job_with_details("sample-job");
    job.schedule.interval = "every tuesday".to_string();

    let err = job_cron(&job).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(err.to_string().contains("unable to parse job cron interval"));
}

#[tokio::test]
async fn cancellable_does_not_start_work_once_cancelled() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let started = AtomicBool::new(false);

    let result = cancellable(&cancel, async {
        started.store(true, Ordering::SeqCst);
        Ok(())
    })
    .await;

    assert!(matches!(result, Err(EngineError::Cancelled)));
    assert!(!started.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn cancellable_stops_waiting_when_cancelled() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let result: EngineResult<()> = cancellable(&cancel, async {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    })
    .await;

    assert!(matches!(result, Err(EngineError::Cancelled)));
}

#[tokio::test]
async fn telemetry_includes_notifier_stats() {
    let ctx = setup();
    let event = sla_miss_event("sample-job", &["2023-01-01T12:00:00Z"]);
    ctx.engine.notifiers["slack"]
        .notify(NotifyAttrs {
            owner: "owner@example.com".to_string(),
            job_event: event,
            secret: String::new(),
            route: "#alerts".to_string(),
        })
        .await
        .unwrap();

    let snapshot = ctx.engine.telemetry();

    assert_eq!(snapshot.notifiers["slack"].pushed, 1);
    assert_eq!(snapshot.notifiers["pagerduty"].pushed, 0);
}

#[tokio::test]
async fn close_notifiers_closes_every_scheme() {
    let ctx = setup();

    ctx.engine.close_notifiers().await.unwrap();

    assert!(ctx.slack.is_closed());
    assert!(ctx.pagerduty.is_closed());
}
