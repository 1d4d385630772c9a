// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol between `skein` clients and the `skeind` daemon.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use skein_core::{ErrorKind, ExecutorInput, JobRunId, JobRunStatus, ReplayId, ReplayWithRun};
use skein_engine::{EngineError, TelemetrySnapshot};

#[path = "protocol_wire.rs"]
mod wire;
pub use wire::{
    decode, encode, read_message, read_request, read_response, write_message, write_request,
    write_response, ProtocolError, DEFAULT_TIMEOUT, MAX_MESSAGE_SIZE,
};

/// Protocol version (from Cargo.toml)
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Request from a client to the daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Version handshake
    Hello { version: String },

    /// Compiled configs, secrets and files for one operator of one run
    JobRunInput {
        project: String,
        job: String,
        scheduled_at: DateTime<Utc>,
        /// Operator name, e.g. `bq2bq` or a hook name
        instance_name: String,
        /// `task` or `hook`
        instance_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        job_run_id: Option<JobRunId>,
    },

    /// Runs of a job; without a range only the last run is returned
    JobRun {
        project: String,
        job: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start: Option<DateTime<Utc>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end: Option<DateTime<Utc>>,
        #[serde(default)]
        filter: Vec<String>,
    },

    /// Deploy every job of a project; acknowledged before the upload runs
    UploadToScheduler { project: String },

    /// Deploy and delete named jobs of one namespace
    UploadJobs {
        project: String,
        namespace: String,
        #[serde(default)]
        to_update: Vec<String>,
        #[serde(default)]
        to_delete: Vec<String>,
    },

    /// Scheduler lifecycle event for a job
    RegisterJobEvent {
        project: String,
        namespace: String,
        job: String,
        event_type: String,
        #[serde(default)]
        values: Map<String, Value>,
    },

    /// Request a replay of a historical window
    Replay {
        project: String,
        namespace: String,
        job: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        #[serde(default)]
        parallel: bool,
        #[serde(default)]
        description: String,
        #[serde(default)]
        job_config: BTreeMap<String, String>,
    },

    /// Replays of a project, newest first
    ListReplay { project: String },

    /// One replay with its runs
    GetReplay { id: String },

    /// Uptime and counters
    Status,

    /// Request daemon shutdown
    Shutdown,
}

/// Response from the daemon to a client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    /// Generic success
    Ok,

    /// Health check response
    Pong,

    /// Version handshake response
    Hello { version: String },

    /// Work was accepted and runs in the background
    Accepted,

    ExecutorInput { input: ExecutorInput },

    JobRuns { runs: Vec<JobRunStatus> },

    ReplayCreated { id: ReplayId },

    Replays { replays: Vec<ReplayWithRun> },

    Replay { replay: ReplayWithRun },

    Status {
        uptime_secs: u64,
        telemetry: TelemetrySnapshot,
    },

    /// Daemon is shutting down
    ShuttingDown,

    /// Request failed
    Error { kind: ErrorKind, message: String },
}

impl Response {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Response::Error {
            kind,
            message: message.into(),
        }
    }
}

impl From<EngineError> for Response {
    fn from(e: EngineError) -> Self {
        Response::error(e.kind(), e.to_string())
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
