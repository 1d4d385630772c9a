// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::notify::{Notifier, NotifierStatsSnapshot, NotifyError};
use crate::scheduler::{Scheduler, SchedulerError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skein_core::{JobRunStatus, JobRunsCriteria, JobWithDetails, NotifyAttrs, ScheduleSpec, Tenant};
use tracing::Instrument;

/// Wrapper that adds tracing to any Scheduler
#[derive(Clone)]
pub struct TracedScheduler<S> {
    inner: S,
}

impl<S> TracedScheduler<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: Scheduler> Scheduler for TracedScheduler<S> {
    async fn bootstrap(&self, tenant: &Tenant) -> Result<(), SchedulerError> {
        let result = self.inner.bootstrap(tenant).await;
        tracing::info_span!("scheduler.bootstrap", %tenant).in_scope(|| match &result {
            Ok(()) => tracing::info!("bootstrapped"),
            Err(e) => tracing::error!(error = %e, "bootstrap failed"),
        });
        result
    }

    async fn deploy_jobs(
        &self,
        tenant: &Tenant,
        jobs: &[JobWithDetails],
    ) -> Result<(), SchedulerError> {
        async {
            tracing::info!(jobs = jobs.len(), "starting");
            let start = std::time::Instant::now();
            let result = self.inner.deploy_jobs(tenant, jobs).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "jobs deployed"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "deploy failed"),
            }
            result
        }
        .instrument(tracing::info_span!("scheduler.deploy", %tenant))
        .await
    }

    async fn delete_jobs(
        &self,
        tenant: &Tenant,
        job_names: &[String],
    ) -> Result<(), SchedulerError> {
        let result = self.inner.delete_jobs(tenant, job_names).await;
        tracing::info_span!("scheduler.delete", %tenant).in_scope(|| match &result {
            Ok(()) => tracing::info!(jobs = job_names.len(), "deleted"),
            Err(e) => tracing::error!(error = %e, "delete failed"),
        });
        result
    }

    async fn list_jobs(&self, tenant: &Tenant) -> Result<Vec<String>, SchedulerError> {
        let result = self.inner.list_jobs(tenant).await;
        tracing::debug!(%tenant, jobs = ?result.as_ref().map(Vec::len).ok(), "listed");
        result
    }

    async fn get_job_runs(
        &self,
        tenant: &Tenant,
        criteria: &JobRunsCriteria,
        cron: &ScheduleSpec,
    ) -> Result<Vec<JobRunStatus>, SchedulerError> {
        async {
            let start = std::time::Instant::now();
            let result = self.inner.get_job_runs(tenant, criteria, cron).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(runs) => tracing::debug!(runs = runs.len(), elapsed_ms, "fetched"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "get job runs failed"),
            }
            result
        }
        .instrument(tracing::info_span!(
            "scheduler.runs",
            %tenant,
            job = %criteria.name,
            only_last_run = criteria.only_last_run
        ))
        .await
    }

    async fn clear(
        &self,
        tenant: &Tenant,
        job_name: &str,
        logical_time: DateTime<Utc>,
    ) -> Result<(), SchedulerError> {
        let result = self.inner.clear(tenant, job_name, logical_time).await;
        tracing::info_span!("scheduler.clear", %tenant, job = job_name).in_scope(|| {
            match &result {
                Ok(()) => tracing::info!(logical_time = %logical_time, "cleared"),
                Err(e) => tracing::error!(error = %e, "clear failed"),
            }
        });
        result
    }

    async fn clear_batch(
        &self,
        tenant: &Tenant,
        job_name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), SchedulerError> {
        let result = self.inner.clear_batch(tenant, job_name, start, end).await;
        tracing::info_span!("scheduler.clear", %tenant, job = job_name).in_scope(|| {
            match &result {
                Ok(()) => tracing::info!(start = %start, end = %end, "cleared"),
                Err(e) => tracing::error!(error = %e, "clear batch failed"),
            }
        });
        result
    }
}

/// Wrapper that adds tracing to any Notifier
#[derive(Clone)]
pub struct TracedNotifier<N> {
    scheme: &'static str,
    inner: N,
}

impl<N> TracedNotifier<N> {
    pub fn new(scheme: &'static str, inner: N) -> Self {
        Self { scheme, inner }
    }
}

#[async_trait]
impl<N: Notifier> Notifier for TracedNotifier<N> {
    async fn notify(&self, attrs: NotifyAttrs) -> Result<(), NotifyError> {
        let span = tracing::info_span!(
            "notify.push",
            scheme = self.scheme,
            route = %attrs.route,
            job = %attrs.job_event.job_name
        );
        let result = self.inner.notify(attrs).await;
        span.in_scope(|| match &result {
            Ok(()) => tracing::debug!("queued"),
            Err(e) => tracing::error!(error = %e, "notify failed"),
        });
        result
    }

    async fn close(&self) -> Result<(), NotifyError> {
        let result = self.inner.close().await;
        let stats = self.inner.stats();
        tracing::info_span!("notify.close", scheme = self.scheme).in_scope(|| {
            tracing::info!(pushed = stats.pushed, errors = stats.errors, "closed")
        });
        result
    }

    fn stats(&self) -> NotifierStatsSnapshot {
        self.inner.stats()
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
