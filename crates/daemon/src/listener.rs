// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! The Listener runs in a spawned task, accepting connections and serving
//! each one from its own task. Requests map onto engine operations.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use skein_core::{
    Clock, Entity, Error, ErrorKind, Executor, ExecutorType, IdGen, JobRunsCriteria, ReplayConfig,
    ReplayId, RunConfig, Tenant,
};
use skein_engine::{Engine, EngineError};
use thiserror::Error;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::protocol::{self, Request, Response, DEFAULT_TIMEOUT, PROTOCOL_VERSION};

/// Shared handles every connection needs.
pub struct ListenCtx<C: Clock, G: IdGen> {
    pub engine: Arc<Engine<C, G>>,
    /// Cancelled at shutdown; in-flight requests stop with it
    pub cancel: CancellationToken,
    pub start_time: Instant,
    pub shutdown: Arc<Notify>,
}

/// Listener task for accepting socket connections.
pub struct Listener<C: Clock, G: IdGen> {
    socket: UnixListener,
    ctx: Arc<ListenCtx<C, G>>,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),
}

impl<C: Clock, G: IdGen> Listener<C, G> {
    pub fn new(socket: UnixListener, ctx: ListenCtx<C, G>) -> Self {
        Self {
            socket,
            ctx: Arc::new(ctx),
        }
    }

    /// Run the listener loop until shutdown, spawning tasks for each connection.
    pub async fn run(self) {
        loop {
            match self.socket.accept().await {
                Ok((stream, _)) => {
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, &ctx).await {
                            match e {
                                ConnectionError::Protocol(
                                    protocol::ProtocolError::ConnectionClosed,
                                ) => debug!("Client disconnected"),
                                ConnectionError::Protocol(protocol::ProtocolError::Timeout) => {
                                    warn!("Connection timeout")
                                }
                                _ => error!("Connection error: {}", e),
                            }
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection.
async fn handle_connection<C: Clock, G: IdGen>(
    stream: UnixStream,
    ctx: &ListenCtx<C, G>,
) -> Result<(), ConnectionError> {
    let (mut reader, mut writer) = stream.into_split();

    let request = protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await?;

    // Polling requests at debug level, everything else at info
    if matches!(request, Request::Ping | Request::Status | Request::JobRun { .. }) {
        debug!(request = ?request, "received request");
    } else {
        info!(request = ?request, "received request");
    }

    let response = handle_request(request, ctx).await;

    debug!("Sending response: {:?}", response);

    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT).await?;

    Ok(())
}

/// Handle a single request and return a response. Failures become
/// [`Response::Error`].
pub async fn handle_request<C: Clock, G: IdGen>(
    request: Request,
    ctx: &ListenCtx<C, G>,
) -> Response {
    let engine = &ctx.engine;
    let cancel = &ctx.cancel;

    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version: _ } => Response::Hello {
            version: PROTOCOL_VERSION.to_string(),
        },

        Request::JobRunInput {
            project,
            job,
            scheduled_at,
            instance_name,
            instance_type,
            job_run_id,
        } => {
            let executor_type = match instance_type.parse::<ExecutorType>() {
                Ok(t) => t,
                Err(e) => return domain_error(e),
            };
            let config = RunConfig::new(
                Executor {
                    name: instance_name,
                    executor_type,
                },
                scheduled_at,
                job_run_id,
            );
            match engine.job_run_input(cancel, &project, &job, config).await {
                Ok(input) => Response::ExecutorInput { input },
                Err(e) => e.into(),
            }
        }

        Request::JobRun {
            project,
            job,
            start,
            end,
            filter,
        } => {
            let criteria = match job_run_criteria(&job, start, end, filter, engine.clock().now()) {
                Ok(criteria) => criteria,
                Err(e) => return domain_error(e),
            };
            match engine.get_job_runs(cancel, &project, &job, &criteria).await {
                Ok(runs) => Response::JobRuns { runs },
                Err(e) => e.into(),
            }
        }

        Request::UploadToScheduler { project } => {
            // Acknowledge first; failures are only logged
            let engine = Arc::clone(engine);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                match engine.upload_to_scheduler(&cancel, &project).await {
                    Ok(()) => info!(project, "jobs uploaded to scheduler"),
                    Err(e) => error!(project, error = %e, "upload to scheduler failed"),
                }
            });
            Response::Accepted
        }

        Request::UploadJobs {
            project,
            namespace,
            to_update,
            to_delete,
        } => {
            let tenant = match Tenant::new(&project, &namespace) {
                Ok(t) => t,
                Err(e) => return domain_error(e),
            };
            match engine
                .upload_jobs(cancel, &tenant, &to_update, &to_delete)
                .await
            {
                Ok(()) => Response::Ok,
                Err(e) => e.into(),
            }
        }

        Request::RegisterJobEvent {
            project,
            namespace,
            job,
            event_type,
            values,
        } => {
            let tenant = match Tenant::new(&project, &namespace) {
                Ok(t) => t,
                Err(e) => return domain_error(e),
            };
            match engine
                .register_job_event(cancel, &tenant, &job, &event_type, values)
                .await
            {
                Ok(()) => Response::Ok,
                Err(e) => e.into(),
            }
        }

        Request::Replay {
            project,
            namespace,
            job,
            start,
            end,
            parallel,
            description,
            job_config,
        } => {
            let tenant = match Tenant::new(&project, &namespace) {
                Ok(t) => t,
                Err(e) => return domain_error(e),
            };
            let config = ReplayConfig::new(start, end, parallel, job_config, description);
            match engine.create_replay(cancel, &tenant, &job, config).await {
                Ok(id) => Response::ReplayCreated { id },
                Err(e) => e.into(),
            }
        }

        Request::ListReplay { project } => Response::Replays {
            replays: engine.replay_list(&project),
        },

        Request::GetReplay { id } => {
            let id = match ReplayId::parse(&id) {
                Ok(id) => id,
                Err(e) => {
                    return Response::error(
                        ErrorKind::InvalidArgument,
                        format!("invalid replay id {id}: {e}"),
                    )
                }
            };
            match engine.replay_by_id(id) {
                Ok(replay) => Response::Replay { replay },
                Err(e) => e.into(),
            }
        }

        Request::Status => Response::Status {
            uptime_secs: ctx.start_time.elapsed().as_secs(),
            telemetry: engine.telemetry(),
        },

        Request::Shutdown => {
            ctx.shutdown.notify_one();
            Response::ShuttingDown
        }
    }
}

/// Without a range only the last run is asked for; a half-open range is
/// rejected.
fn job_run_criteria(
    job: &str,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    filter: Vec<String>,
    now: DateTime<Utc>,
) -> skein_core::Result<JobRunsCriteria> {
    let (start_date, end_date, only_last_run) = match (start, end) {
        (Some(start), Some(end)) => (start, end, false),
        (None, None) => (now, now, true),
        _ => {
            return Err(Error::invalid_argument(
                Entity::JobRun,
                "start and end dates must be given together",
            ))
        }
    };
    Ok(JobRunsCriteria {
        name: job.to_string(),
        start_date,
        end_date,
        filter,
        only_last_run,
    })
}

fn domain_error(e: Error) -> Response {
    EngineError::from(e).into()
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
