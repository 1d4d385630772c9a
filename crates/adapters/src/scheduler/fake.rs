// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake scheduler adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{Scheduler, SchedulerError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use skein_core::{
    JobRunStatus, JobRunsCriteria, JobWithDetails, MultiError, ScheduleSpec, Tenant,
};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Recorded scheduler call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerCall {
    Bootstrap {
        tenant: Tenant,
    },
    DeployJobs {
        tenant: Tenant,
        jobs: Vec<String>,
    },
    DeleteJobs {
        tenant: Tenant,
        jobs: Vec<String>,
    },
    ListJobs {
        tenant: Tenant,
    },
    GetJobRuns {
        tenant: Tenant,
        job: String,
        only_last_run: bool,
    },
    Clear {
        tenant: Tenant,
        job: String,
        logical_time: DateTime<Utc>,
    },
    ClearBatch {
        tenant: Tenant,
        job: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

#[derive(Default)]
struct FakeSchedulerState {
    deployed: BTreeMap<Tenant, BTreeSet<String>>,
    runs: HashMap<(Tenant, String), Vec<JobRunStatus>>,
    failing_jobs: HashSet<String>,
    fail_runs: Option<String>,
    runs_delay: Option<Duration>,
    fail_clear: Option<String>,
    calls: Vec<SchedulerCall>,
}

/// In-memory scheduler: tracks deployed job names and serves canned runs
#[derive(Clone, Default)]
pub struct FakeScheduler {
    inner: Arc<Mutex<FakeSchedulerState>>,
}

impl FakeScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<SchedulerCall> {
        self.inner.lock().calls.clone()
    }

    /// Job names currently deployed for `tenant`, sorted
    pub fn deployed(&self, tenant: &Tenant) -> Vec<String> {
        self.inner
            .lock()
            .deployed
            .get(tenant)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Pretend these jobs are already deployed
    pub fn set_jobs(&self, tenant: &Tenant, names: &[&str]) {
        self.inner.lock().deployed.insert(
            tenant.clone(),
            names.iter().map(|n| n.to_string()).collect(),
        );
    }

    /// Runs returned for `job`, by scheduled time
    pub fn set_runs(&self, tenant: &Tenant, job: &str, runs: Vec<JobRunStatus>) {
        self.inner
            .lock()
            .runs
            .insert((tenant.clone(), job.to_string()), runs);
    }

    /// Make deploying `job` fail
    pub fn fail_deploy_of(&self, job: &str) {
        self.inner.lock().failing_jobs.insert(job.to_string());
    }

    /// Make every `get_job_runs` fail with `message`
    pub fn fail_runs(&self, message: &str) {
        self.inner.lock().fail_runs = Some(message.to_string());
    }

    /// Hold every `get_job_runs` for `delay` before answering
    pub fn delay_runs(&self, delay: Duration) {
        self.inner.lock().runs_delay = Some(delay);
    }

    /// Make every clear fail with `message`
    pub fn fail_clear(&self, message: &str) {
        self.inner.lock().fail_clear = Some(message.to_string());
    }

    /// Recorded clear-batch ranges for `job`
    pub fn cleared(&self, job: &str) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                SchedulerCall::Clear {
                    job: j,
                    logical_time,
                    ..
                } if j == job => Some((*logical_time, *logical_time)),
                SchedulerCall::ClearBatch {
                    job: j, start, end, ..
                } if j == job => Some((*start, *end)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Scheduler for FakeScheduler {
    async fn bootstrap(&self, tenant: &Tenant) -> Result<(), SchedulerError> {
        self.inner.lock().calls.push(SchedulerCall::Bootstrap {
            tenant: tenant.clone(),
        });
        Ok(())
    }

    async fn deploy_jobs(
        &self,
        tenant: &Tenant,
        jobs: &[JobWithDetails],
    ) -> Result<(), SchedulerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SchedulerCall::DeployJobs {
            tenant: tenant.clone(),
            jobs: jobs.iter().map(|j| j.get_name().to_string()).collect(),
        });

        let mut errors = MultiError::new("error while deploying jobs");
        for job in jobs {
            let name = job.get_name().to_string();
            if inner.failing_jobs.contains(&name) {
                errors.append(SchedulerError::Response(format!(
                    "failed to upload {name}"
                )));
                continue;
            }
            inner.deployed.entry(tenant.clone()).or_default().insert(name);
        }
        errors.into_result().map_err(SchedulerError::Deploy)
    }

    async fn delete_jobs(
        &self,
        tenant: &Tenant,
        job_names: &[String],
    ) -> Result<(), SchedulerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SchedulerCall::DeleteJobs {
            tenant: tenant.clone(),
            jobs: job_names.to_vec(),
        });
        if job_names.iter().any(|n| n.trim().is_empty()) {
            return Err(SchedulerError::EmptyJobName);
        }
        if let Some(deployed) = inner.deployed.get_mut(tenant) {
            for name in job_names {
                deployed.remove(name);
            }
        }
        Ok(())
    }

    async fn list_jobs(&self, tenant: &Tenant) -> Result<Vec<String>, SchedulerError> {
        self.inner.lock().calls.push(SchedulerCall::ListJobs {
            tenant: tenant.clone(),
        });
        Ok(self.deployed(tenant))
    }

    async fn get_job_runs(
        &self,
        tenant: &Tenant,
        criteria: &JobRunsCriteria,
        _cron: &ScheduleSpec,
    ) -> Result<Vec<JobRunStatus>, SchedulerError> {
        let delay = self.inner.lock().runs_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut inner = self.inner.lock();
        inner.calls.push(SchedulerCall::GetJobRuns {
            tenant: tenant.clone(),
            job: criteria.name.clone(),
            only_last_run: criteria.only_last_run,
        });
        if let Some(message) = &inner.fail_runs {
            return Err(SchedulerError::Response(message.clone()));
        }

        let mut runs = inner
            .runs
            .get(&(tenant.clone(), criteria.name.clone()))
            .cloned()
            .unwrap_or_default();
        runs.sort_by_key(|r| r.scheduled_at);
        if criteria.only_last_run {
            return Ok(runs.pop().into_iter().collect());
        }
        Ok(runs
            .into_iter()
            .filter(|r| r.scheduled_at >= criteria.start_date && r.scheduled_at <= criteria.end_date)
            .collect())
    }

    async fn clear(
        &self,
        tenant: &Tenant,
        job_name: &str,
        logical_time: DateTime<Utc>,
    ) -> Result<(), SchedulerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SchedulerCall::Clear {
            tenant: tenant.clone(),
            job: job_name.to_string(),
            logical_time,
        });
        match &inner.fail_clear {
            Some(message) => Err(SchedulerError::Response(message.clone())),
            None => Ok(()),
        }
    }

    async fn clear_batch(
        &self,
        tenant: &Tenant,
        job_name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), SchedulerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SchedulerCall::ClearBatch {
            tenant: tenant.clone(),
            job: job_name.to_string(),
            start,
            end,
        });
        match &inner.fail_clear {
            Some(message) => Err(SchedulerError::Response(message.clone())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
