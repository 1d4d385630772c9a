// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job runs, operator runs and the inputs an operator receives.

use crate::cron::ScheduleSpec;
use crate::job::JobName;
use crate::tenant::Tenant;
use crate::{define_id, Entity, Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

define_id! {
    /// Identifier of a job run row
    pub struct JobRunId;
}

define_id! {
    /// Identifier of a task, sensor or hook run row
    pub struct OperatorRunId;
}

/// State of a job run or operator run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    Pending,
    Accepted,
    Running,
    Queued,
    Success,
    Failed,
    /// A task or hook of the run has started
    InProgress,
    /// A sensor is waiting on upstream data
    WaitUpstream,
    Replayed,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Pending => "pending",
            State::Accepted => "accepted",
            State::Running => "running",
            State::Queued => "queued",
            State::Success => "success",
            State::Failed => "failed",
            State::InProgress => "in_progress",
            State::WaitUpstream => "wait_upstream",
            State::Replayed => "replayed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, State::Success | State::Failed)
    }

    /// Queued or running in the scheduler.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, State::Queued | State::Running)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for State {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let state = match s.to_ascii_lowercase().as_str() {
            "pending" => State::Pending,
            "accepted" => State::Accepted,
            "running" => State::Running,
            "queued" => State::Queued,
            "success" => State::Success,
            "failed" => State::Failed,
            "in_progress" => State::InProgress,
            "wait_upstream" => State::WaitUpstream,
            "replayed" => State::Replayed,
            _ => {
                return Err(Error::invalid_argument(
                    Entity::JobRun,
                    format!("invalid state for run {s}"),
                ))
            }
        };
        Ok(state)
    }
}

/// Kind of unit inside a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorType {
    Task,
    Sensor,
    Hook,
}

impl fmt::Display for OperatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperatorType::Task => "task",
            OperatorType::Sensor => "sensor",
            OperatorType::Hook => "hook",
        })
    }
}

impl OperatorType {
    /// State the owning job run moves to when this operator starts.
    pub fn start_job_state(&self) -> State {
        match self {
            OperatorType::Task | OperatorType::Hook => State::InProgress,
            OperatorType::Sensor => State::WaitUpstream,
        }
    }
}

/// One execution of a job for one scheduled time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRun {
    pub id: JobRunId,
    pub job_name: JobName,
    pub tenant: Tenant,
    pub state: State,
    pub scheduled_at: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// SLA in seconds captured when the run was registered
    #[serde(default)]
    pub sla_definition: i64,
    #[serde(default)]
    pub sla_alert: bool,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub monitoring: Map<String, Value>,
}

impl JobRun {
    /// Whether the run took (or has been taking) longer than its SLA.
    pub fn has_sla_breached(&self, now: DateTime<Utc>) -> bool {
        let end = self.end_time.unwrap_or(now);
        end - self.start_time > Duration::seconds(self.sla_definition)
    }
}

/// One task, sensor or hook execution inside a job run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorRun {
    pub id: OperatorRunId,
    pub name: String,
    pub job_run_id: JobRunId,
    pub operator_type: OperatorType,
    pub status: State,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

/// Scheduled time and state of one run, as the scheduler reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRunStatus {
    pub scheduled_at: DateTime<Utc>,
    pub state: State,
}

impl JobRunStatus {
    pub fn new(scheduled_at: DateTime<Utc>, state: State) -> Self {
        Self {
            scheduled_at,
            state,
        }
    }

    pub fn from_str_state(scheduled_at: DateTime<Utc>, state: &str) -> Result<Self> {
        Ok(Self::new(scheduled_at, state.parse()?))
    }

    /// The cron tick preceding the scheduled time; addresses the run in the
    /// scheduler's clear API.
    pub fn logical_time(&self, cron: &ScheduleSpec) -> DateTime<Utc> {
        cron.prev(self.scheduled_at)
    }
}

/// Helpers over a list of run statuses
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobRunStatusList(pub Vec<JobRunStatus>);

impl JobRunStatusList {
    /// Runs in any of `states`, earliest first.
    pub fn sorted_by_states(&self, states: &[State]) -> Vec<JobRunStatus> {
        let mut runs: Vec<JobRunStatus> = self
            .0
            .iter()
            .filter(|r| states.contains(&r.state))
            .copied()
            .collect();
        runs.sort_by_key(|r| r.scheduled_at);
        runs
    }

    pub fn sorted_by_scheduled_at(&self) -> Vec<JobRunStatus> {
        let mut runs = self.0.clone();
        runs.sort_by_key(|r| r.scheduled_at);
        runs
    }

    /// Replace states with those in `updated`, keyed by scheduled time.
    pub fn merge_with_updated_runs(
        &self,
        updated: &HashMap<DateTime<Utc>, State>,
    ) -> Vec<JobRunStatus> {
        self.0
            .iter()
            .map(|r| match updated.get(&r.scheduled_at) {
                Some(state) => JobRunStatus::new(r.scheduled_at, *state),
                None => *r,
            })
            .collect()
    }

    pub fn to_status_map(&self) -> HashMap<DateTime<Utc>, State> {
        self.0.iter().map(|r| (r.scheduled_at, r.state)).collect()
    }
}

impl From<Vec<JobRunStatus>> for JobRunStatusList {
    fn from(runs: Vec<JobRunStatus>) -> Self {
        Self(runs)
    }
}

/// Query for the runs of one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRunsCriteria {
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// State names to keep; empty keeps everything
    #[serde(default)]
    pub filter: Vec<String>,
    #[serde(default)]
    pub only_last_run: bool,
}

impl JobRunsCriteria {
    /// Logical time to start listing scheduler runs from.
    pub fn execution_start(&self, cron: &ScheduleSpec) -> DateTime<Utc> {
        cron.prev(self.start_date)
    }

    /// Logical time of the last run scheduled at or before `end_date`.
    pub fn execution_end(&self, cron: &ScheduleSpec) -> DateTime<Utc> {
        let last_scheduled = if cron.is_fire_time(self.end_date) {
            self.end_date
        } else {
            cron.prev(self.end_date)
        };
        cron.prev(last_scheduled)
    }
}

/// Whether the operator being started is the task or one of its hooks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorType {
    Task,
    Hook,
}

impl FromStr for ExecutorType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "task" => Ok(ExecutorType::Task),
            "hook" => Ok(ExecutorType::Hook),
            _ => Err(Error::invalid_argument(
                Entity::JobRun,
                format!("unknown executor type {s}"),
            )),
        }
    }
}

impl fmt::Display for ExecutorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExecutorType::Task => "task",
            ExecutorType::Hook => "hook",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Executor {
    pub name: String,
    pub executor_type: ExecutorType,
}

/// Identifies the operator asking for its input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub executor: Executor,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_run_id: Option<JobRunId>,
}

impl RunConfig {
    pub fn new(
        executor: Executor,
        scheduled_at: DateTime<Utc>,
        job_run_id: Option<JobRunId>,
    ) -> Self {
        Self {
            executor,
            scheduled_at,
            job_run_id,
        }
    }
}

/// Everything an operator needs at startup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorInput {
    pub configs: BTreeMap<String, String>,
    pub secrets: BTreeMap<String, String>,
    pub files: BTreeMap<String, String>,
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
