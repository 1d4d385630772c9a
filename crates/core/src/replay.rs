// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replay requests: controlled re-execution of a historical window.

use crate::job::JobName;
use crate::run::{JobRunStatus, JobRunStatusList, State};
use crate::tenant::Tenant;
use crate::{define_id, Entity, Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

define_id! {
    /// Identifier of a replay request
    pub struct ReplayId;
}

/// Progress of a replay request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplayState {
    #[serde(rename = "created")]
    Created,
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "partial replayed")]
    PartialReplayed,
    #[serde(rename = "replayed")]
    Replayed,
    #[serde(rename = "success")]
    Success,
    #[serde(rename = "failed")]
    Failed,
    #[serde(rename = "invalid")]
    Invalid,
}

impl ReplayState {
    /// States of a replay that still holds its window.
    pub const ONGOING: [ReplayState; 4] = [
        ReplayState::Created,
        ReplayState::InProgress,
        ReplayState::PartialReplayed,
        ReplayState::Replayed,
    ];

    /// States the manager may pick up for processing.
    pub const EXECUTABLE: [ReplayState; 3] = [
        ReplayState::Created,
        ReplayState::PartialReplayed,
        ReplayState::Replayed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReplayState::Created => "created",
            ReplayState::InProgress => "in progress",
            ReplayState::PartialReplayed => "partial replayed",
            ReplayState::Replayed => "replayed",
            ReplayState::Success => "success",
            ReplayState::Failed => "failed",
            ReplayState::Invalid => "invalid",
        }
    }

    pub fn is_ongoing(&self) -> bool {
        Self::ONGOING.contains(self)
    }
}

impl fmt::Display for ReplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplayState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let state = match s.to_ascii_lowercase().as_str() {
            "created" => ReplayState::Created,
            "in progress" => ReplayState::InProgress,
            "partial replayed" => ReplayState::PartialReplayed,
            "replayed" => ReplayState::Replayed,
            "success" => ReplayState::Success,
            "failed" => ReplayState::Failed,
            "invalid" => ReplayState::Invalid,
            _ => {
                return Err(Error::invalid_argument(
                    Entity::JobRun,
                    format!("invalid state for replay {s}"),
                ))
            }
        };
        Ok(state)
    }
}

/// What to replay, fixed when the request is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayConfig {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub parallel: bool,
    /// Task config overrides for runs inside the window
    #[serde(default)]
    pub job_config: BTreeMap<String, String>,
    #[serde(default)]
    pub description: String,
}

impl ReplayConfig {
    pub fn new(
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        parallel: bool,
        job_config: BTreeMap<String, String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            start_time,
            end_time,
            parallel,
            job_config,
            description: description.into(),
        }
    }

    /// Closed-interval intersection with `[start, end]`.
    pub fn intersects(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time <= end && self.end_time >= start
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start_time <= t && t <= self.end_time
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replay {
    pub id: ReplayId,
    pub job_name: JobName,
    pub tenant: Tenant,
    pub config: ReplayConfig,
    pub state: ReplayState,
    #[serde(default)]
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Replay {
    /// A request not yet stored; it has no id.
    pub fn new_request(
        job_name: JobName,
        tenant: Tenant,
        config: ReplayConfig,
        state: ReplayState,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ReplayId::nil(),
            job_name,
            tenant,
            config,
            state,
            message: String::new(),
            created_at,
        }
    }
}

/// A replay with the current state of the runs in its window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayWithRun {
    pub replay: Replay,
    pub runs: Vec<JobRunStatus>,
}

impl ReplayWithRun {
    /// Earliest pending run.
    pub fn first_executable_run(&self) -> Option<JobRunStatus> {
        JobRunStatusList(self.runs.clone())
            .sorted_by_states(&[State::Pending])
            .first()
            .copied()
    }

    /// Latest pending run.
    pub fn last_executable_run(&self) -> Option<JobRunStatus> {
        JobRunStatusList(self.runs.clone())
            .sorted_by_states(&[State::Pending])
            .last()
            .copied()
    }
}

#[cfg(test)]
#[path = "replay_tests.rs"]
mod tests;
