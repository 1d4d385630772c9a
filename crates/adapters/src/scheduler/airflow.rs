// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Airflow 2 scheduler: DAG files in the project bucket, runs over REST.

use super::airflow_api::{to_job_runs, AirflowClient, ClearRequest, DagRunRequest};
use super::{
    job_directory, job_name_from_path, job_path, DeployThrottle, Scheduler, SchedulerError,
    TenantDetailsSource, JOBS_DIR,
};
use crate::bucket::{Bucket, BucketOpener};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::{Quota, RateLimiter};
use skein_compiler::{DagCompiler, DAG_LIB, DAG_LIB_FILE};
use skein_core::{
    JobRunStatus, JobRunsCriteria, JobWithDetails, MultiError, ScheduleSpec, Tenant,
    TenantDetails,
};
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Clone)]
pub struct AirflowScheduler {
    buckets: BucketOpener,
    compiler: Arc<DagCompiler>,
    tenants: Arc<dyn TenantDetailsSource>,
    client: AirflowClient,
    throttle: DeployThrottle,
}

impl AirflowScheduler {
    pub fn new(
        buckets: BucketOpener,
        compiler: Arc<DagCompiler>,
        tenants: Arc<dyn TenantDetailsSource>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            buckets,
            compiler,
            tenants,
            client: AirflowClient::new(client),
            throttle: DeployThrottle::default(),
        }
    }

    pub fn with_throttle(mut self, throttle: DeployThrottle) -> Self {
        self.throttle = throttle;
        self
    }

    fn details(&self, tenant: &Tenant) -> Result<TenantDetails, SchedulerError> {
        self.tenants
            .tenant_details(tenant)
            .map_err(SchedulerError::Tenant)
    }

    fn namespace(tenant: &Tenant) -> Result<String, SchedulerError> {
        tenant
            .namespace_name()
            .map(|ns| ns.to_string())
            .map_err(SchedulerError::Tenant)
    }
}

/// Compile and write each job, admitting `tickets_per_sec` new uploads per
/// second with at most `concurrent_limit` in flight.
async fn upload_all(
    bucket: Arc<dyn Bucket>,
    compiler: Arc<DagCompiler>,
    namespace: &str,
    jobs: &[JobWithDetails],
    throttle: DeployThrottle,
) -> MultiError {
    let rate = NonZeroU32::new(throttle.tickets_per_sec).unwrap_or(NonZeroU32::MIN);
    let limiter = Arc::new(RateLimiter::direct(Quota::per_second(rate)));
    let permits = Arc::new(Semaphore::new(throttle.concurrent_limit.max(1)));

    let mut set = JoinSet::new();
    for job in jobs.iter().cloned() {
        let limiter = Arc::clone(&limiter);
        let permits = Arc::clone(&permits);
        let bucket = Arc::clone(&bucket);
        let compiler = Arc::clone(&compiler);
        let key = job_path(namespace, job.get_name());
        set.spawn(async move {
            limiter.until_ready().await;
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| SchedulerError::Response(e.to_string()))?;
            let contents = compiler.compile(&job).map_err(SchedulerError::Compile)?;
            bucket.write_all(&key, contents.as_bytes()).await?;
            tracing::debug!(job = job.get_name(), key = %key, "uploaded dag");
            Ok::<(), SchedulerError>(())
        });
    }

    let mut errors = MultiError::new("error while deploying jobs");
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(result) => {
                errors.collect(result);
            }
            Err(e) => errors.append(SchedulerError::Response(format!("upload task failed: {e}"))),
        }
    }
    errors
}

#[async_trait]
impl Scheduler for AirflowScheduler {
    async fn bootstrap(&self, tenant: &Tenant) -> Result<(), SchedulerError> {
        let details = self.details(tenant)?;
        let bucket = self.buckets.open(&details)?;
        let key = format!("{JOBS_DIR}/{DAG_LIB_FILE}");
        let result = bucket.write_all(&key, DAG_LIB.as_bytes()).await;
        bucket.close().await?;
        Ok(result?)
    }

    async fn deploy_jobs(
        &self,
        tenant: &Tenant,
        jobs: &[JobWithDetails],
    ) -> Result<(), SchedulerError> {
        let details = self.details(tenant)?;
        let namespace = Self::namespace(tenant)?;
        let bucket = self.buckets.open(&details)?;

        let errors = upload_all(
            Arc::clone(&bucket),
            Arc::clone(&self.compiler),
            &namespace,
            jobs,
            self.throttle,
        )
        .await;
        bucket.close().await?;
        errors.into_result().map_err(SchedulerError::Deploy)
    }

    async fn delete_jobs(
        &self,
        tenant: &Tenant,
        job_names: &[String],
    ) -> Result<(), SchedulerError> {
        if job_names.iter().any(|n| n.trim().is_empty()) {
            return Err(SchedulerError::EmptyJobName);
        }
        let details = self.details(tenant)?;
        let namespace = Self::namespace(tenant)?;
        let bucket = self.buckets.open(&details)?;

        let mut result = Ok(());
        for name in job_names {
            match bucket.delete(&job_path(&namespace, name)).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    result = Err(e.into());
                    break;
                }
            }
        }
        bucket.close().await?;
        result
    }

    async fn list_jobs(&self, tenant: &Tenant) -> Result<Vec<String>, SchedulerError> {
        let details = self.details(tenant)?;
        let namespace = Self::namespace(tenant)?;
        let bucket = self.buckets.open(&details)?;

        let keys = bucket.list(&job_directory(&namespace)).await;
        bucket.close().await?;
        Ok(keys?
            .iter()
            .filter_map(|k| job_name_from_path(k))
            .map(String::from)
            .collect())
    }

    async fn get_job_runs(
        &self,
        tenant: &Tenant,
        criteria: &JobRunsCriteria,
        cron: &ScheduleSpec,
    ) -> Result<Vec<JobRunStatus>, SchedulerError> {
        let details = self.details(tenant)?;
        let mut request = if criteria.only_last_run {
            DagRunRequest::last_run(&criteria.name)
        } else {
            DagRunRequest::range(
                &criteria.name,
                criteria.execution_start(cron),
                criteria.execution_end(cron),
            )
        };

        let mut runs = Vec::new();
        loop {
            let page = self.client.list_dag_runs(&details, &request).await?;
            runs.extend(to_job_runs(&page, cron)?);
            request.page_offset += request.page_limit;
            if criteria.only_last_run
                || page.dag_runs.is_empty()
                || page.total_entries <= request.page_offset
            {
                break;
            }
        }
        Ok(runs)
    }

    async fn clear(
        &self,
        tenant: &Tenant,
        job_name: &str,
        logical_time: DateTime<Utc>,
    ) -> Result<(), SchedulerError> {
        self.clear_batch(tenant, job_name, logical_time, logical_time)
            .await
    }

    async fn clear_batch(
        &self,
        tenant: &Tenant,
        job_name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), SchedulerError> {
        let details = self.details(tenant)?;
        let path = super::airflow_api::dag_run_clear_url(job_name);
        self.client
            .post(&details, &path, &ClearRequest::new(start, end))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
#[path = "airflow_tests.rs"]
mod tests;
