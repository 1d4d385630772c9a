// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Airflow stable REST API: request/response shapes and the HTTP client

use super::SchedulerError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skein_core::tenant::{SCHEDULER_AUTH, SCHEDULER_HOST};
use skein_core::{JobRunStatus, ScheduleSpec, TenantDetails};

pub(super) const DAG_RUN_LIST_URL: &str = "api/v1/dags/~/dagRuns/list";
pub(super) const AIRFLOW_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S+00:00";
pub(super) const PAGE_LIMIT: usize = 99999;

pub(super) fn dag_run_clear_url(job_name: &str) -> String {
    format!("api/v1/dags/{job_name}/clearTaskInstances")
}

pub(super) fn airflow_date(t: DateTime<Utc>) -> String {
    t.format(AIRFLOW_DATE_FORMAT).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(super) struct DagRunRequest {
    pub order_by: String,
    pub page_offset: usize,
    pub page_limit: usize,
    pub dag_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_date_gte: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_date_lte: Option<String>,
}

impl DagRunRequest {
    /// The most recent run only.
    pub fn last_run(job_name: &str) -> Self {
        Self {
            order_by: "-execution_date".to_string(),
            page_offset: 0,
            page_limit: 1,
            dag_ids: vec![job_name.to_string()],
            execution_date_gte: None,
            execution_date_lte: None,
        }
    }

    /// Runs with a logical time in `[start, end]`, oldest first.
    pub fn range(job_name: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            order_by: "execution_date".to_string(),
            page_offset: 0,
            page_limit: PAGE_LIMIT,
            dag_ids: vec![job_name.to_string()],
            execution_date_gte: Some(airflow_date(start)),
            execution_date_lte: Some(airflow_date(end)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(super) struct ClearRequest {
    pub start_date: String,
    pub end_date: String,
    pub dry_run: bool,
    pub reset_dag_runs: bool,
    pub only_failed: bool,
}

impl ClearRequest {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start_date: airflow_date(start),
            end_date: airflow_date(end),
            dry_run: false,
            reset_dag_runs: true,
            only_failed: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct DagRunListResponse {
    #[serde(default)]
    pub dag_runs: Vec<DagRun>,
    #[serde(default)]
    pub total_entries: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct DagRun {
    pub execution_date: DateTime<Utc>,
    pub state: String,
    #[serde(default)]
    pub external_trigger: bool,
}

/// Scheduled runs in a dag-run page, addressed by scheduled time.
///
/// Airflow reports the logical time; the run is scheduled one cron tick
/// later. Manually triggered runs are skipped.
pub(super) fn to_job_runs(
    resp: &DagRunListResponse,
    cron: &ScheduleSpec,
) -> Result<Vec<JobRunStatus>, SchedulerError> {
    resp.dag_runs
        .iter()
        .filter(|run| !run.external_trigger)
        .map(|run| {
            JobRunStatus::from_str_state(cron.next(run.execution_date), &run.state).map_err(|_| {
                SchedulerError::Response(format!(
                    "invalid dag run state {} at {}",
                    run.state,
                    airflow_date(run.execution_date)
                ))
            })
        })
        .collect()
}

/// Thin JSON-over-HTTP client authenticated per project
#[derive(Clone)]
pub(super) struct AirflowClient {
    client: reqwest::Client,
}

impl AirflowClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// POST `body` to `path` under the project's scheduler host.
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        details: &TenantDetails,
        path: &str,
        body: &B,
    ) -> Result<String, SchedulerError> {
        let (host, auth) = host_and_auth(details)?;
        let url = format!("{host}/{path}");
        let resp = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Basic {}", STANDARD.encode(auth.as_bytes())),
            )
            .json(body)
            .send()
            .await
            .map_err(|source| SchedulerError::Http {
                url: url.clone(),
                source,
            })?;
        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(SchedulerError::Status {
                status: status.as_u16(),
                url,
            });
        }
        resp.text()
            .await
            .map_err(|source| SchedulerError::Http { url, source })
    }

    pub async fn list_dag_runs(
        &self,
        details: &TenantDetails,
        request: &DagRunRequest,
    ) -> Result<DagRunListResponse, SchedulerError> {
        let body = self.post(details, DAG_RUN_LIST_URL, request).await?;
        serde_json::from_str(&body).map_err(|source| SchedulerError::Json { body, source })
    }
}

/// Scheduler base URL and basic-auth credentials of a project.
fn host_and_auth(details: &TenantDetails) -> Result<(String, String), SchedulerError> {
    let project = details.project().name();
    let host = details
        .get_config(SCHEDULER_HOST)
        .map_err(|_| SchedulerError::Config(format!("scheduler host not set for {project}")))?;
    let auth = details.get_secret(SCHEDULER_AUTH).map_err(|_| {
        SchedulerError::Config(format!(
            "{SCHEDULER_AUTH} secret not configured for project {project}"
        ))
    })?;
    let host = host.trim().trim_end_matches('/');
    let host = if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{host}")
    };
    Ok((host, auth.value().to_string()))
}

#[cfg(test)]
#[path = "airflow_api_tests.rs"]
mod tests;
