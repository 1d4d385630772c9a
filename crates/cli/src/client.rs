// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for CLI commands

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use skein_core::{
    ErrorKind, ExecutorInput, JobRunId, JobRunStatus, ReplayConfig, ReplayId, ReplayWithRun,
};
use skein_daemon::protocol::{self, ProtocolError};
use skein_daemon::{Request, Response, PROTOCOL_VERSION};
use skein_engine::TelemetrySnapshot;
use thiserror::Error;
use tokio::net::UnixStream;

use crate::client_lifecycle::log_connection_error;
use crate::daemon_process::{
    cleanup_stale_socket, daemon_socket, probe_socket, read_daemon_version, read_startup_error,
    start_daemon_background, stop_daemon_sync, wrap_with_startup_error,
};

/// Timeout for IPC requests
pub fn timeout_ipc() -> Duration {
    crate::env::timeout_ipc_ms().unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for daemon to start
pub fn timeout_connect() -> Duration {
    crate::env::timeout_connect_ms().unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for process to exit
pub fn timeout_exit() -> Duration {
    crate::env::timeout_exit_ms().unwrap_or(Duration::from_secs(2))
}

/// Polling interval for connection retries
pub fn poll_interval() -> Duration {
    crate::env::connect_poll_ms().unwrap_or(Duration::from_millis(50))
}

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Daemon not running")]
    DaemonNotRunning,

    #[error("Failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("Connection timeout waiting for daemon to start")]
    DaemonStartTimeout,

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("{kind}: {message}")]
    Rejected { kind: ErrorKind, message: String },

    #[error("Unexpected response from daemon")]
    UnexpectedResponse,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not determine state directory")]
    NoStateDir,
}

impl ClientError {
    /// The socket is gone or refuses connections; the daemon is down.
    pub fn is_not_running(&self) -> bool {
        match self {
            ClientError::DaemonNotRunning => true,
            ClientError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::NotFound
            ),
            _ => false,
        }
    }
}

/// Map anything but the expected variant to an error.
fn unexpected(response: Response) -> ClientError {
    match response {
        Response::Error { kind, message } => ClientError::Rejected { kind, message },
        _ => ClientError::UnexpectedResponse,
    }
}

/// Daemon client
pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    /// For action commands - auto-start with version check, max 1 restart per process
    ///
    /// Action commands mutate state (deploy, event, replay create). They may
    /// start the daemon but never restart it more than once.
    pub fn for_action() -> Result<Self, ClientError> {
        Self::connect_or_start_once()
    }

    /// For query commands - connect only, no restart
    ///
    /// A daemon that is down or outdated has nothing useful to report.
    pub fn for_query() -> Result<Self, ClientError> {
        Self::connect()
    }

    fn connect_or_start_once() -> Result<Self, ClientError> {
        static RESTARTED: AtomicBool = AtomicBool::new(false);

        if RESTARTED.load(Ordering::SeqCst) {
            return Self::connect();
        }

        if let Some(daemon_version) = read_daemon_version() {
            if daemon_version != PROTOCOL_VERSION {
                RESTARTED.store(true, Ordering::SeqCst);
                eprintln!(
                    "warn: daemon version {} does not match cli version {}, restarting daemon",
                    daemon_version, PROTOCOL_VERSION
                );
                stop_daemon_sync();
            }
        }

        Self::connect_or_start()
    }

    /// Connect to daemon, auto-starting if not running
    pub fn connect_or_start() -> Result<Self, ClientError> {
        match Self::connect() {
            Ok(client) => {
                // A crashed daemon leaves its socket file behind
                if probe_socket(&client.socket_path) {
                    Ok(client)
                } else {
                    cleanup_stale_socket()?;
                    let child = start_daemon_background()?;
                    Self::connect_with_retry(timeout_connect(), child)
                }
            }
            Err(ClientError::DaemonNotRunning) => {
                let child = start_daemon_background()?;
                Self::connect_with_retry(timeout_connect(), child)
            }
            Err(e) => Err(wrap_with_startup_error(e)),
        }
    }

    /// Connect to existing daemon (no auto-start)
    pub fn connect() -> Result<Self, ClientError> {
        let socket_path = daemon_socket()?;

        if !socket_path.exists() {
            let err = ClientError::DaemonNotRunning;
            log_connection_error(&err);
            return Err(err);
        }

        Ok(Self { socket_path })
    }

    fn connect_with_retry(
        timeout: Duration,
        mut child: std::process::Child,
    ) -> Result<Self, ClientError> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            // Early exit means startup failed; the log says why
            if let Ok(Some(status)) = child.try_wait() {
                let poll_start = Instant::now();
                while poll_start.elapsed() < timeout_exit() {
                    if let Some(err) = read_startup_error() {
                        return Err(ClientError::DaemonStartFailed(err));
                    }
                    std::thread::sleep(poll_interval());
                }
                return Err(ClientError::DaemonStartFailed(format!(
                    "exited with {}",
                    status
                )));
            }

            match Self::connect() {
                Ok(client) => return Ok(client),
                Err(ClientError::DaemonNotRunning) => std::thread::sleep(poll_interval()),
                Err(e) => return Err(wrap_with_startup_error(e)),
            }
        }

        Err(wrap_with_startup_error(ClientError::DaemonStartTimeout))
    }

    async fn send_with_timeout(
        &self,
        request: &Request,
        timeout: Duration,
    ) -> Result<Response, ClientError> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (mut reader, mut writer) = stream.into_split();

        protocol::write_request(&mut writer, request, timeout).await?;
        Ok(protocol::read_response(&mut reader, timeout).await?)
    }

    /// Send a request and receive a response
    pub async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        match self.send_with_timeout(request, timeout_ipc()).await {
            Ok(response) => Ok(response),
            Err(e) => {
                log_connection_error(&e);
                Err(e)
            }
        }
    }

    async fn send_simple(&self, request: &Request) -> Result<(), ClientError> {
        match self.send(request).await? {
            Response::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Daemon version via Hello handshake
    pub async fn hello(&self) -> Result<String, ClientError> {
        let request = Request::Hello {
            version: PROTOCOL_VERSION.to_string(),
        };
        match self.send(&request).await? {
            Response::Hello { version } => Ok(version),
            other => Err(unexpected(other)),
        }
    }

    /// Uptime in seconds and the daemon's counters
    pub async fn status(&self) -> Result<(u64, TelemetrySnapshot), ClientError> {
        match self.send(&Request::Status).await? {
            Response::Status {
                uptime_secs,
                telemetry,
            } => Ok((uptime_secs, telemetry)),
            other => Err(unexpected(other)),
        }
    }

    /// Request daemon shutdown
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        match self.send(&Request::Shutdown).await? {
            Response::Ok | Response::ShuttingDown => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Compiled executor input for one operator of one run
    pub async fn job_run_input(
        &self,
        project: &str,
        job: &str,
        scheduled_at: DateTime<Utc>,
        instance_name: &str,
        instance_type: &str,
        job_run_id: Option<JobRunId>,
    ) -> Result<ExecutorInput, ClientError> {
        let request = Request::JobRunInput {
            project: project.to_string(),
            job: job.to_string(),
            scheduled_at,
            instance_name: instance_name.to_string(),
            instance_type: instance_type.to_string(),
            job_run_id,
        };
        match self.send(&request).await? {
            Response::ExecutorInput { input } => Ok(input),
            other => Err(unexpected(other)),
        }
    }

    /// Runs of a job; `None` for both dates asks for the last run only
    pub async fn job_runs(
        &self,
        project: &str,
        job: &str,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
        filter: Vec<String>,
    ) -> Result<Vec<JobRunStatus>, ClientError> {
        let request = Request::JobRun {
            project: project.to_string(),
            job: job.to_string(),
            start: range.map(|(start, _)| start),
            end: range.map(|(_, end)| end),
            filter,
        };
        match self.send(&request).await? {
            Response::JobRuns { runs } => Ok(runs),
            other => Err(unexpected(other)),
        }
    }

    /// Deploy every job of a project; returns once the daemon accepted it
    pub async fn upload_to_scheduler(&self, project: &str) -> Result<(), ClientError> {
        let request = Request::UploadToScheduler {
            project: project.to_string(),
        };
        match self.send(&request).await? {
            Response::Accepted | Response::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Deploy and delete named jobs of one namespace
    pub async fn upload_jobs(
        &self,
        project: &str,
        namespace: &str,
        to_update: Vec<String>,
        to_delete: Vec<String>,
    ) -> Result<(), ClientError> {
        let request = Request::UploadJobs {
            project: project.to_string(),
            namespace: namespace.to_string(),
            to_update,
            to_delete,
        };
        self.send_simple(&request).await
    }

    /// Record a scheduler lifecycle event
    pub async fn register_job_event(
        &self,
        project: &str,
        namespace: &str,
        job: &str,
        event_type: &str,
        values: Map<String, Value>,
    ) -> Result<(), ClientError> {
        let request = Request::RegisterJobEvent {
            project: project.to_string(),
            namespace: namespace.to_string(),
            job: job.to_string(),
            event_type: event_type.to_string(),
            values,
        };
        self.send_simple(&request).await
    }

    /// Request a replay; returns the new replay's id
    pub async fn create_replay(
        &self,
        project: &str,
        namespace: &str,
        job: &str,
        config: ReplayConfig,
    ) -> Result<ReplayId, ClientError> {
        let ReplayConfig {
            start_time,
            end_time,
            parallel,
            job_config,
            description,
        } = config;
        let request = Request::Replay {
            project: project.to_string(),
            namespace: namespace.to_string(),
            job: job.to_string(),
            start: start_time,
            end: end_time,
            parallel,
            description,
            job_config,
        };
        match self.send(&request).await? {
            Response::ReplayCreated { id } => Ok(id),
            other => Err(unexpected(other)),
        }
    }

    pub async fn list_replays(&self, project: &str) -> Result<Vec<ReplayWithRun>, ClientError> {
        let request = Request::ListReplay {
            project: project.to_string(),
        };
        match self.send(&request).await? {
            Response::Replays { replays } => Ok(replays),
            other => Err(unexpected(other)),
        }
    }

    pub async fn get_replay(&self, id: &str) -> Result<ReplayWithRun, ClientError> {
        let request = Request::GetReplay { id: id.to_string() };
        match self.send(&request).await? {
            Response::Replay { replay } => Ok(replay),
            other => Err(unexpected(other)),
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
