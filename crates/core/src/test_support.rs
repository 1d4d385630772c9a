// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use crate::event::Event;
use crate::job::{
    Alert, Job, JobMetadata, JobName, JobUpstream, JobWithDetails, Schedule, Task, UpstreamState,
    Upstreams,
};
use crate::tenant::{
    Namespace, PlainTextSecret, Project, Tenant, TenantDetails, SCHEDULER_HOST, STORAGE_PATH,
};
use crate::window::Window;
use crate::EventCategory;
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Parse an RFC 3339 timestamp.
pub fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .unwrap_or_else(|e| panic!("bad timestamp {s}: {e}"))
        .with_timezone(&Utc)
}

// ── Tenants ─────────────────────────────────────────────────────────────────

pub fn tenant() -> Tenant {
    Tenant::new("proj", "ns").unwrap()
}

pub fn project() -> Project {
    Project::new(
        "proj",
        BTreeMap::from([
            (STORAGE_PATH.to_string(), "file:///tmp/skein-bucket".to_string()),
            (SCHEDULER_HOST.to_string(), "http://airflow.local".to_string()),
            ("bucket".to_string(), "gs://proj-bucket".to_string()),
        ]),
    )
    .unwrap()
}

pub fn namespace() -> Namespace {
    Namespace::new(
        "ns",
        project().name().clone(),
        BTreeMap::from([("EXECUTION_PROJECT".to_string(), "ns-exec".to_string())]),
    )
    .unwrap()
}

/// `proj/ns` details carrying the given plaintext secrets.
pub fn tenant_details(secrets: &[(&str, &str)]) -> TenantDetails {
    TenantDetails::new(project(), Some(namespace())).with_secrets(
        secrets
            .iter()
            .map(|(k, v)| PlainTextSecret::new(k, *v).unwrap())
            .collect(),
    )
}

// ── Jobs ────────────────────────────────────────────────────────────────────

/// A daily `bq2bq` job in `proj/ns` starting 2022-01-01.
pub fn job_with_details(name: &str) -> JobWithDetails {
    let job_name = JobName::try_new(name).unwrap();
    JobWithDetails {
        name: job_name.clone(),
        job: Job {
            name: job_name,
            tenant: tenant(),
            destination: format!("bigquery://proj:dataset.{name}"),
            task: Task {
                name: "bq2bq".to_string(),
                config: BTreeMap::from([(
                    "SQL_TYPE".to_string(),
                    "STANDARD".to_string(),
                )]),
            },
            hooks: vec![],
            window: Window::new(2, "d", "0", "24h"),
            assets: BTreeMap::new(),
        },
        metadata: JobMetadata {
            version: 1,
            owner: "owner@example.com".to_string(),
            description: String::new(),
            labels: BTreeMap::new(),
        },
        schedule: Schedule {
            start_date: at("2022-01-01T00:00:00Z"),
            end_date: None,
            interval: "0 12 * * *".to_string(),
            depends_on_past: false,
            catch_up: false,
        },
        retry: Default::default(),
        alerts: vec![],
        runtime_config: Default::default(),
        priority: 0,
        upstreams: Upstreams::default(),
    }
}

pub fn resolved_upstream(name: &str, tenant: Tenant) -> JobUpstream {
    JobUpstream {
        job_name: name.to_string(),
        tenant,
        host: String::new(),
        task_name: "bq2bq".to_string(),
        destination_urn: format!("bigquery://proj:dataset.{name}"),
        upstream_type: "inferred".to_string(),
        external: false,
        state: UpstreamState::Resolved,
    }
}

pub fn alert(on: EventCategory, channels: &[&str]) -> Alert {
    Alert {
        on,
        channels: channels.iter().map(|c| c.to_string()).collect(),
        config: BTreeMap::new(),
    }
}

// ── Event factory functions ─────────────────────────────────────────────────

fn into_map(v: Value) -> Map<String, Value> {
    match v {
        Value::Object(m) => m,
        _ => Map::new(),
    }
}

/// A job- or operator-level event for `job` in `proj/ns`.
pub fn operator_event(job: &str, event_type: &str, operator: &str, scheduled_at: &str) -> Event {
    Event::from_values(
        event_type,
        into_map(json!({
            "event_time": at(scheduled_at).timestamp() + 60,
            "task_id": operator,
            "scheduled_at": scheduled_at,
        })),
        JobName::try_new(job).unwrap(),
        tenant(),
    )
    .unwrap()
}

pub fn job_event(job: &str, event_type: &str, scheduled_at: &str) -> Event {
    operator_event(job, event_type, job, scheduled_at)
}

pub fn sla_miss_event(job: &str, scheduled_at: &[&str]) -> Event {
    let slas: Vec<Value> = scheduled_at
        .iter()
        .map(|s| json!({"dag_id": job, "scheduled_at": s}))
        .collect();
    Event::from_values(
        "sla_miss",
        into_map(json!({ "slas": slas })),
        JobName::try_new(job).unwrap(),
        tenant(),
    )
    .unwrap()
}
