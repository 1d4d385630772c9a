// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External batch scheduler adapters

mod airflow;
mod airflow_api;

pub use airflow::AirflowScheduler;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeScheduler, SchedulerCall};

use crate::bucket::BucketError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skein_core::{
    Entity, Error, JobRunStatus, JobRunsCriteria, JobWithDetails, MultiError, ScheduleSpec,
    Tenant, TenantDetails,
};
use thiserror::Error;

/// Directory in the bucket the scheduler loads DAG files from
pub const JOBS_DIR: &str = "dags";
pub const JOBS_EXTENSION: &str = ".py";

/// Errors from scheduler operations
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("job name cannot be an empty string")]
    EmptyJobName,
    #[error(transparent)]
    Tenant(Error),
    #[error("{0}")]
    Config(String),
    #[error(transparent)]
    Bucket(#[from] BucketError),
    #[error(transparent)]
    Compile(Error),
    #[error(transparent)]
    Deploy(MultiError),
    #[error("failed to call airflow {url} due to {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("status code received {status} on calling {url}")]
    Status { status: u16, url: String },
    #[error("json error: {body}: {source}")]
    Json {
        body: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Response(String),
}

impl From<SchedulerError> for Error {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::EmptyJobName => Error::invalid_argument(
                Entity::SchedulerAirflow,
                "job name cannot be an empty string",
            ),
            SchedulerError::Tenant(e) | SchedulerError::Compile(e) => e,
            other => Error::internal_from(Entity::SchedulerAirflow, other.to_string(), other),
        }
    }
}

/// Knobs for the bounded fan-out used when uploading DAG files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployThrottle {
    /// New uploads admitted per second
    pub tickets_per_sec: u32,
    /// Uploads in flight at once
    pub concurrent_limit: usize,
}

impl Default for DeployThrottle {
    fn default() -> Self {
        Self {
            tickets_per_sec: 40,
            concurrent_limit: 600,
        }
    }
}

/// Loads a tenant's project, namespace and plaintext secrets.
pub trait TenantDetailsSource: Send + Sync + 'static {
    fn tenant_details(&self, tenant: &Tenant) -> skein_core::Result<TenantDetails>;
}

impl<F> TenantDetailsSource for F
where
    F: Fn(&Tenant) -> skein_core::Result<TenantDetails> + Send + Sync + 'static,
{
    fn tenant_details(&self, tenant: &Tenant) -> skein_core::Result<TenantDetails> {
        self(tenant)
    }
}

/// The external batch scheduler the control plane deploys jobs to
#[async_trait]
pub trait Scheduler: Send + Sync + 'static {
    /// Write project-wide shared files (the DAG helper library).
    async fn bootstrap(&self, tenant: &Tenant) -> Result<(), SchedulerError>;

    /// Compile and upload DAG files; failures are collected, not fatal.
    async fn deploy_jobs(
        &self,
        tenant: &Tenant,
        jobs: &[JobWithDetails],
    ) -> Result<(), SchedulerError>;

    /// Remove DAG files; missing files are ignored.
    async fn delete_jobs(&self, tenant: &Tenant, job_names: &[String])
        -> Result<(), SchedulerError>;

    /// Names of the jobs currently deployed for the tenant.
    async fn list_jobs(&self, tenant: &Tenant) -> Result<Vec<String>, SchedulerError>;

    async fn get_job_runs(
        &self,
        tenant: &Tenant,
        criteria: &JobRunsCriteria,
        cron: &ScheduleSpec,
    ) -> Result<Vec<JobRunStatus>, SchedulerError>;

    /// Re-run the run at one logical time.
    async fn clear(
        &self,
        tenant: &Tenant,
        job_name: &str,
        logical_time: DateTime<Utc>,
    ) -> Result<(), SchedulerError>;

    /// Re-run every run with a logical time in `[start, end]`.
    async fn clear_batch(
        &self,
        tenant: &Tenant,
        job_name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), SchedulerError>;
}

/// `dags/<namespace>/`
pub fn job_directory(namespace: &str) -> String {
    format!("{JOBS_DIR}/{namespace}/")
}

/// `dags/<namespace>/<job>.py`
pub fn job_path(namespace: &str, job_name: &str) -> String {
    format!("{JOBS_DIR}/{namespace}/{job_name}{JOBS_EXTENSION}")
}

/// Job name from a DAG file key, if the key is a DAG file.
pub fn job_name_from_path(key: &str) -> Option<&str> {
    let file = key.rsplit('/').next().unwrap_or(key);
    file.strip_suffix(JOBS_EXTENSION).filter(|n| !n.is_empty())
}
