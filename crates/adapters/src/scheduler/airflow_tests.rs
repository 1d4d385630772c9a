// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use skein_compiler::{Entrypoint, PluginInfo, PluginRepo, PluginType};
use skein_core::tenant::{SCHEDULER_AUTH, SCHEDULER_HOST, STORAGE_PATH};
use skein_core::test_support::{at, job_with_details, namespace, tenant};
use skein_core::{parse_cron_schedule, Namespace, PlainTextSecret, Project, State as RunState};
use std::collections::BTreeMap;

#[derive(Clone, Default)]
struct FakeAirflow {
    dag_runs: Arc<Mutex<Vec<serde_json::Value>>>,
    list_bodies: Arc<Mutex<Vec<serde_json::Value>>>,
    clears: Arc<Mutex<Vec<(String, serde_json::Value)>>>,
    auth: Arc<Mutex<Vec<String>>>,
}

impl FakeAirflow {
    fn record_auth(&self, headers: &HeaderMap) {
        if let Some(v) = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
        {
            self.auth.lock().push(v.to_string());
        }
    }
}

async fn list_dag_runs(
    State(airflow): State<FakeAirflow>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    airflow.record_auth(&headers);
    airflow.list_bodies.lock().push(body);
    let runs = airflow.dag_runs.lock().clone();
    Json(serde_json::json!({ "total_entries": runs.len(), "dag_runs": runs }))
}

async fn clear_task_instances(
    State(airflow): State<FakeAirflow>,
    Path(job): Path<String>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    airflow.record_auth(&headers);
    airflow.clears.lock().push((job, body));
    Json(serde_json::json!({ "task_instances": [] }))
}

async fn start_fake_airflow() -> (String, FakeAirflow) {
    let airflow = FakeAirflow::default();
    let app = Router::new()
        .route("/api/v1/dags/~/dagRuns/list", post(list_dag_runs))
        .route("/api/v1/dags/:job/clearTaskInstances", post(clear_task_instances))
        .with_state(airflow.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), airflow)
}

fn plugins() -> Arc<PluginRepo> {
    let mut repo = PluginRepo::new();
    repo.add(PluginInfo {
        name: "bq2bq".to_string(),
        image: "example.io/namespace/bq2bq-executor:latest".to_string(),
        plugin_type: PluginType::Task,
        hook_type: None,
        entrypoint: Entrypoint {
            shell: "/bin/bash".to_string(),
            script: "python3 /opt/bumblebee/main.py".to_string(),
        },
        depends_on: Vec::new(),
        description: String::new(),
    });
    Arc::new(repo)
}

struct Harness {
    scheduler: AirflowScheduler,
    buckets: BucketOpener,
    airflow: FakeAirflow,
}

async fn harness() -> Harness {
    let (host, airflow) = start_fake_airflow().await;
    let buckets = BucketOpener::default();
    let tenants = move |t: &Tenant| -> skein_core::Result<TenantDetails> {
        let project = Project::new(
            t.project_name().as_str(),
            BTreeMap::from([
                (STORAGE_PATH.to_string(), "mem://composer".to_string()),
                (SCHEDULER_HOST.to_string(), host.clone()),
            ]),
        )?;
        let ns = Namespace::new(
            t.namespace_name()?.as_str(),
            project.name().clone(),
            BTreeMap::new(),
        )?;
        Ok(TenantDetails::new(project, Some(ns))
            .with_secrets(vec![PlainTextSecret::new(SCHEDULER_AUTH, "admin:secret")?]))
    };
    let compiler = DagCompiler::new("http://skein.example.com", plugins()).unwrap();
    let scheduler = AirflowScheduler::new(
        buckets.clone(),
        Arc::new(compiler),
        Arc::new(tenants),
        reqwest::Client::new(),
    );
    Harness {
        scheduler,
        buckets,
        airflow,
    }
}

#[tokio::test]
async fn bootstrap_writes_shared_library() {
    let h = harness().await;

    h.scheduler.bootstrap(&tenant()).await.unwrap();

    assert_eq!(
        h.buckets.mem_bucket("composer").get_string("dags/__lib.py").as_deref(),
        Some(DAG_LIB)
    );
}

#[tokio::test]
async fn deploy_uploads_one_file_per_job() {
    let h = harness().await;
    let jobs = vec![job_with_details("job-a"), job_with_details("job-b")];

    h.scheduler.deploy_jobs(&tenant(), &jobs).await.unwrap();

    let bucket = h.buckets.mem_bucket("composer");
    assert_eq!(bucket.keys(), vec!["dags/ns/job-a.py", "dags/ns/job-b.py"]);
    let dag = bucket.get_string("dags/ns/job-a.py").unwrap();
    assert!(dag.contains("job-a"), "{dag}");
}

#[tokio::test]
async fn deploy_collects_compile_failures() {
    let h = harness().await;
    let mut broken = job_with_details("broken");
    broken.job.task.name = "missing-plugin".to_string();
    let jobs = vec![job_with_details("ok"), broken];

    let err = h.scheduler.deploy_jobs(&tenant(), &jobs).await.unwrap_err();

    let SchedulerError::Deploy(errors) = err else {
        panic!("expected deploy error, got {err:?}");
    };
    assert_eq!(errors.len(), 1);
    assert_eq!(
        h.buckets.mem_bucket("composer").keys(),
        vec!["dags/ns/ok.py"]
    );
}

#[tokio::test]
async fn deploy_honors_a_slow_throttle() {
    let h = harness().await;
    let scheduler = h.scheduler.clone().with_throttle(DeployThrottle {
        tickets_per_sec: 1,
        concurrent_limit: 1,
    });

    scheduler
        .deploy_jobs(&tenant(), &[job_with_details("only")])
        .await
        .unwrap();

    assert_eq!(h.buckets.mem_bucket("composer").keys(), vec!["dags/ns/only.py"]);
}

#[tokio::test]
async fn list_returns_deployed_job_names() {
    let h = harness().await;
    let bucket = h.buckets.mem_bucket("composer");
    bucket.write_all("dags/ns/a.py", b"").await.unwrap();
    bucket.write_all("dags/ns/b.py", b"").await.unwrap();
    bucket.write_all("dags/other/c.py", b"").await.unwrap();
    bucket.write_all("dags/__lib.py", b"").await.unwrap();

    let names = h.scheduler.list_jobs(&tenant()).await.unwrap();

    assert_eq!(names, vec!["a", "b"]);
}

#[tokio::test]
async fn delete_ignores_missing_files() {
    let h = harness().await;
    let bucket = h.buckets.mem_bucket("composer");
    bucket.write_all("dags/ns/a.py", b"").await.unwrap();

    h.scheduler
        .delete_jobs(&tenant(), &["a".to_string(), "gone".to_string()])
        .await
        .unwrap();

    assert!(bucket.keys().is_empty());
}

#[tokio::test]
async fn delete_rejects_empty_job_names() {
    let h = harness().await;

    let err = h
        .scheduler
        .delete_jobs(&tenant(), &["a".to_string(), " ".to_string()])
        .await
        .unwrap_err();

    assert!(matches!(err, SchedulerError::EmptyJobName));
    let core: skein_core::Error = err.into();
    assert_eq!(core.kind(), skein_core::ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn operations_need_a_namespace() {
    let h = harness().await;
    let project_only = Tenant::project_scope("proj").unwrap();

    let err = h.scheduler.list_jobs(&project_only).await.unwrap_err();

    assert!(matches!(err, SchedulerError::Tenant(_)));
}

#[tokio::test]
async fn get_job_runs_queries_the_execution_range() {
    let h = harness().await;
    *h.airflow.dag_runs.lock() = vec![
        serde_json::json!({"execution_date": "2022-03-01T12:00:00+00:00", "state": "success"}),
        serde_json::json!({"execution_date": "2022-03-02T12:00:00+00:00", "state": "failed"}),
    ];
    let cron = parse_cron_schedule("0 12 * * *").unwrap();
    let criteria = JobRunsCriteria {
        name: "sample".to_string(),
        start_date: at("2022-03-02T12:00:00Z"),
        end_date: at("2022-03-03T12:00:00Z"),
        filter: Vec::new(),
        only_last_run: false,
    };

    let runs = h
        .scheduler
        .get_job_runs(&tenant(), &criteria, &cron)
        .await
        .unwrap();

    assert_eq!(
        runs,
        vec![
            JobRunStatus::new(at("2022-03-02T12:00:00Z"), RunState::Success),
            JobRunStatus::new(at("2022-03-03T12:00:00Z"), RunState::Failed),
        ]
    );
    let body = h.airflow.list_bodies.lock()[0].clone();
    assert_eq!(body["dag_ids"], serde_json::json!(["sample"]));
    assert_eq!(body["execution_date_gte"], "2022-03-01T12:00:00+00:00");
    assert_eq!(body["execution_date_lte"], "2022-03-02T12:00:00+00:00");
    assert_eq!(
        h.airflow.auth.lock()[0],
        format!("Basic {}", base64_auth("admin:secret"))
    );
}

#[tokio::test]
async fn get_last_run_asks_for_one_run() {
    let h = harness().await;
    *h.airflow.dag_runs.lock() = vec![serde_json::json!(
        {"execution_date": "2022-03-04T12:00:00+00:00", "state": "running"}
    )];
    let cron = parse_cron_schedule("0 12 * * *").unwrap();
    let criteria = JobRunsCriteria {
        name: "sample".to_string(),
        start_date: at("2022-03-01T00:00:00Z"),
        end_date: at("2022-03-01T00:00:00Z"),
        filter: Vec::new(),
        only_last_run: true,
    };

    let runs = h
        .scheduler
        .get_job_runs(&tenant(), &criteria, &cron)
        .await
        .unwrap();

    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].state, RunState::Running);
    assert_eq!(h.airflow.list_bodies.lock()[0]["page_limit"], 1);
}

#[tokio::test]
async fn clear_posts_a_single_logical_time() {
    let h = harness().await;

    h.scheduler
        .clear(&tenant(), "sample", at("2022-03-01T12:00:00Z"))
        .await
        .unwrap();

    let clears = h.airflow.clears.lock().clone();
    assert_eq!(clears.len(), 1);
    assert_eq!(clears[0].0, "sample");
    assert_eq!(clears[0].1["start_date"], "2022-03-01T12:00:00+00:00");
    assert_eq!(clears[0].1["end_date"], "2022-03-01T12:00:00+00:00");
    assert_eq!(clears[0].1["reset_dag_runs"], true);
}

#[tokio::test]
async fn clear_batch_posts_the_range() {
    let h = harness().await;

    h.scheduler
        .clear_batch(
            &tenant(),
            "sample",
            at("2022-03-01T12:00:00Z"),
            at("2022-03-05T12:00:00Z"),
        )
        .await
        .unwrap();

    let clears = h.airflow.clears.lock().clone();
    assert_eq!(clears[0].1["end_date"], "2022-03-05T12:00:00+00:00");
}

#[tokio::test]
async fn unreachable_scheduler_is_an_http_error() {
    let buckets = BucketOpener::default();
    let compiler = DagCompiler::new("http://skein.example.com", plugins()).unwrap();
    let tenants = |_: &Tenant| -> skein_core::Result<TenantDetails> {
        let project = Project::new(
            "proj",
            BTreeMap::from([
                (STORAGE_PATH.to_string(), "mem://composer".to_string()),
                (SCHEDULER_HOST.to_string(), "http://127.0.0.1:1".to_string()),
            ]),
        )?;
        Ok(TenantDetails::new(project, Some(namespace()))
            .with_secrets(vec![PlainTextSecret::new(SCHEDULER_AUTH, "a:b")?]))
    };
    let scheduler = AirflowScheduler::new(
        buckets,
        Arc::new(compiler),
        Arc::new(tenants),
        reqwest::Client::new(),
    );

    let err = scheduler
        .clear(&tenant(), "sample", at("2022-03-01T12:00:00Z"))
        .await
        .unwrap_err();

    assert!(matches!(err, SchedulerError::Http { .. }), "{err:?}");
}

fn base64_auth(auth: &str) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(auth)
}
