// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job specifications as seen by the orchestration core.

use crate::duration::parse_duration;
use crate::event::EventCategory;
use crate::tenant::Tenant;
use crate::window::Window;
use crate::{define_name, Entity, Error, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

define_name! {
    /// Name of a job, unique within a project
    pub struct JobName(Entity::JobRun, "job name");
}

/// The plugin that performs a job's transformation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
}

/// A plugin run before or after the task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hook {
    pub name: String,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
    /// Names of other hooks of the same job this hook runs after
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub name: JobName,
    pub tenant: Tenant,
    #[serde(default)]
    pub destination: String,
    pub task: Task,
    #[serde(default)]
    pub hooks: Vec<Hook>,
    #[serde(default)]
    pub window: Window,
    #[serde(default)]
    pub assets: BTreeMap<String, String>,
}

impl Job {
    pub fn get_hook(&self, hook_name: &str) -> Result<&Hook> {
        self.hooks
            .iter()
            .find(|h| h.name == hook_name)
            .ok_or_else(|| {
                Error::not_found(Entity::JobRun, format!("hook not found in job {hook_name}"))
            })
    }

    /// `<project>/<job>`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.tenant.project_name(), self.name)
    }

    /// Every hook dependency must name another hook of this job.
    pub fn validate_hooks(&self) -> Result<()> {
        for hook in &self.hooks {
            for dep in &hook.depends_on {
                if dep == &hook.name || !self.hooks.iter().any(|h| &h.name == dep) {
                    return Err(Error::invalid_argument(
                        Entity::Job,
                        format!(
                            "hook {} of job {} depends on unknown hook {dep}",
                            hook.name, self.name
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMetadata {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub start_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    /// Cron expression; empty for unscheduled jobs
    #[serde(default)]
    pub interval: String,
    #[serde(default)]
    pub depends_on_past: bool,
    #[serde(default)]
    pub catch_up: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Retry {
    #[serde(default)]
    pub count: u32,
    /// Seconds between attempts
    #[serde(default)]
    pub delay: u32,
    #[serde(default)]
    pub exponential_backoff: bool,
}

/// An alert policy: which event category notifies which channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub on: EventCategory,
    /// Channel URLs such as `slack://#team` or `pagerduty://#service`
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    #[serde(default)]
    pub cpu: String,
    #[serde(default)]
    pub memory: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub request: ResourceConfig,
    #[serde(default)]
    pub limit: ResourceConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Resource>,
    #[serde(default)]
    pub scheduler: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamState {
    Resolved,
    #[default]
    Unresolved,
}

/// An upstream job whose destination this job consumes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobUpstream {
    pub job_name: String,
    pub tenant: Tenant,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub task_name: String,
    #[serde(default)]
    pub destination_urn: String,
    #[serde(default)]
    pub upstream_type: String,
    #[serde(default)]
    pub external: bool,
    #[serde(default)]
    pub state: UpstreamState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpUpstream {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upstreams {
    #[serde(default)]
    pub http: Vec<HttpUpstream>,
    #[serde(default)]
    pub upstream_jobs: Vec<JobUpstream>,
}

impl Upstreams {
    /// Names of upstream jobs that resolved, in declaration order.
    pub fn resolved_job_names(&self) -> Vec<&str> {
        self.upstream_jobs
            .iter()
            .filter(|u| u.state == UpstreamState::Resolved)
            .map(|u| u.job_name.as_str())
            .collect()
    }

    pub fn resolved(&self) -> impl Iterator<Item = &JobUpstream> {
        self.upstream_jobs
            .iter()
            .filter(|u| u.state == UpstreamState::Resolved)
    }
}

/// A job with everything needed to compile and schedule it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobWithDetails {
    pub name: JobName,
    pub job: Job,
    #[serde(default)]
    pub metadata: JobMetadata,
    pub schedule: Schedule,
    #[serde(default)]
    pub retry: Retry,
    #[serde(default)]
    pub alerts: Vec<Alert>,
    #[serde(default)]
    pub runtime_config: RuntimeConfig,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub upstreams: Upstreams,
}

impl JobWithDetails {
    pub fn get_name(&self) -> &str {
        self.name.as_str()
    }

    pub fn tenant(&self) -> &Tenant {
        &self.job.tenant
    }

    /// SLA of the job in seconds, from the `duration` of an SLA-miss alert.
    ///
    /// Returns 0 when no SLA is configured.
    pub fn sla_duration(&self) -> Result<i64> {
        for alert in &self.alerts {
            if alert.on != EventCategory::SlaMiss {
                continue;
            }
            let Some(raw) = alert.config.get("duration") else {
                continue;
            };
            let d = parse_duration(raw).map_err(|e| {
                Error::invalid_argument(
                    Entity::Job,
                    format!("failed to parse sla_miss duration {raw}: {e}"),
                )
            })?;
            return Ok(d.num_seconds());
        }
        Ok(0)
    }

    /// Labels rendered as sorted `k=v` pairs joined by commas.
    pub fn labels_as_string(&self) -> String {
        self.metadata
            .labels
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Load-time validation of the embedded window and hooks.
    pub fn validate(&self) -> Result<()> {
        self.job.window.validate()?;
        self.job.validate_hooks()
    }
}

/// Group jobs by tenant, keeping first-seen tenant order.
pub fn group_jobs_by_tenant(jobs: Vec<JobWithDetails>) -> IndexMap<Tenant, Vec<JobWithDetails>> {
    let mut grouped: IndexMap<Tenant, Vec<JobWithDetails>> = IndexMap::new();
    for job in jobs {
        grouped.entry(job.job.tenant.clone()).or_default().push(job);
    }
    grouped
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
