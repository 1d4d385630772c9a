// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic replay manager.
//!
//! Each tick fails replays that outlived the replay timeout, then claims up
//! to `num_workers` executable replays and advances each by one worker
//! step. A tick that finds the previous one still running is skipped.

use crate::error::EngineError;
use crate::runtime::Engine;
use skein_core::{Clock, ErrorKind, IdGen, ReplayState, ReplayWithRun};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Replay manager knobs
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub tick: Duration,
    /// Replays claimed per tick
    pub num_workers: usize,
    /// Bound on one worker step
    pub worker_timeout: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(60),
            num_workers: 1,
            worker_timeout: Duration::from_secs(3600),
        }
    }
}

pub struct ReplayManager<C: Clock, G: IdGen> {
    engine: Arc<Engine<C, G>>,
    config: ManagerConfig,
    busy: AtomicBool,
}

/// Clears the busy flag when a tick ends, however it ends.
struct TickGuard<'a>(&'a AtomicBool);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<C: Clock, G: IdGen> ReplayManager<C, G> {
    pub fn new(engine: Arc<Engine<C, G>>, config: ManagerConfig) -> Self {
        Self {
            engine,
            config: ManagerConfig {
                num_workers: config.num_workers.max(1),
                ..config
            },
            busy: AtomicBool::new(false),
        }
    }

    /// Tick until `cancel` fires.
    pub fn start(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!(tick_secs = self.config.tick.as_secs(), workers = self.config.num_workers, "replay manager started");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        self.tick_once(&cancel).await;
                    }
                }
            }
            tracing::info!("replay manager stopped");
        })
    }

    /// Run one manager iteration. Returns the number of replays handed to
    /// workers, or `None` when another iteration was still running.
    pub async fn tick_once(&self, cancel: &CancellationToken) -> Option<usize> {
        if self.busy.swap(true, Ordering::AcqRel) {
            tracing::debug!("previous replay tick still running, skipping");
            return None;
        }
        let _guard = TickGuard(&self.busy);

        self.fail_timed_out_replays();

        let claimed = self.claim_replays();
        let count = claimed.len();
        let mut workers = JoinSet::new();
        for request in claimed {
            let engine = Arc::clone(&self.engine);
            let cancel = cancel.clone();
            let limit = self.config.worker_timeout;
            workers.spawn(async move {
                let id = request.replay.id;
                match tokio::time::timeout(limit, engine.process_replay(&cancel, request)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(EngineError::Cancelled)) => {
                        tracing::info!(replay = %id, "replay step cancelled");
                    }
                    Ok(Err(e)) => {
                        tracing::error!(replay = %id, error = %e, "replay step failed");
                    }
                    Err(_) => {
                        let message = format!("replay worker timed out after {}s", limit.as_secs());
                        tracing::error!(replay = %id, "{message}");
                        let now = engine.clock().now();
                        if let Err(e) = engine.state().lock().update_replay_status(
                            id,
                            ReplayState::Failed,
                            &message,
                            now,
                        ) {
                            tracing::error!(replay = %id, error = %e, "unable to fail replay");
                        }
                    }
                }
            });
        }
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "replay worker panicked");
            }
        }
        Some(count)
    }

    fn fail_timed_out_replays(&self) {
        let now = self.engine.clock().now();
        let timeout = self.engine.config().replay_timeout;
        let mut state = self.engine.state().lock();
        for replay in state.replays_by_status(&ReplayState::ONGOING) {
            if now - replay.created_at <= timeout {
                continue;
            }
            tracing::warn!(replay = %replay.id, job = %replay.job_name, "replay timed out");
            if let Err(e) =
                state.update_replay_status(replay.id, ReplayState::Failed, "replay timed out", now)
            {
                tracing::error!(replay = %replay.id, error = %e, "unable to fail timed out replay");
            }
        }
    }

    fn claim_replays(&self) -> Vec<ReplayWithRun> {
        let now = self.engine.clock().now();
        let mut state = self.engine.state().lock();
        let mut claimed = Vec::new();
        while claimed.len() < self.config.num_workers {
            match state.next_executable_replay(now) {
                Ok(request) => claimed.push(request),
                Err(e) if e.is(ErrorKind::NotFound) => break,
                Err(e) => {
                    tracing::error!(error = %e, "unable to get next executable replay");
                    break;
                }
            }
        }
        claimed
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
