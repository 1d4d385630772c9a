// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replay worker: advances one claimed replay by a single step.
//!
//! A replay moves `created → partial replayed → replayed → success|failed`.
//! Each step clears runs in the scheduler, re-reads the run states in the
//! window and stores them with the next state. Any error fails the replay
//! with the error as its message; a cancelled step puts the replay back in
//! the state it was claimed from.

use super::{cancellable, job_cron, Engine};
use crate::error::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use skein_core::{
    Clock, IdGen, JobRunStatus, JobRunStatusList, JobRunsCriteria, ReplayState, ReplayWithRun,
    ScheduleSpec, State,
};
use std::future::Future;
use tokio_util::sync::CancellationToken;

const IN_FLIGHT: [State; 2] = [State::Queued, State::Running];

impl<C: Clock, G: IdGen> Engine<C, G> {
    /// Run one step of the replay state machine for a claimed replay.
    pub async fn process_replay(
        &self,
        cancel: &CancellationToken,
        request: ReplayWithRun,
    ) -> EngineResult<()> {
        let replay = &request.replay;
        tracing::info!(replay = %replay.id, state = %replay.state, job = %replay.job_name, "processing replay");

        let result = match replay.state {
            ReplayState::Created => self.process_created(cancel, &request).await,
            ReplayState::PartialReplayed => self.process_partial_replayed(cancel, &request).await,
            ReplayState::Replayed => self.process_replayed(cancel, &request).await,
            other => {
                tracing::warn!(replay = %replay.id, state = %other, "replay is not executable");
                return Ok(());
            }
        };

        let now = self.clock.now();
        match result {
            Ok(()) => Ok(()),
            Err(EngineError::Cancelled) => {
                self.state.lock().update_replay_status(
                    replay.id,
                    replay.state,
                    &replay.message,
                    now,
                )?;
                Err(EngineError::Cancelled)
            }
            Err(e) => {
                self.state.lock().update_replay(
                    replay.id,
                    ReplayState::Failed,
                    request.runs.clone(),
                    &e.to_string(),
                    now,
                )?;
                Err(e)
            }
        }
    }

    async fn process_created(
        &self,
        cancel: &CancellationToken,
        request: &ReplayWithRun,
    ) -> EngineResult<()> {
        let cron = self.replay_cron(request)?;
        let replay = &request.replay;
        let (Some(first), Some(last)) = (request.first_executable_run(), request.last_executable_run())
        else {
            let runs = self.fetch_runs(cancel, request).await?;
            return self.store_step(request, ReplayState::Replayed, runs);
        };

        let mut next = ReplayState::Replayed;
        if replay.config.parallel {
            let (start, end) = (first.logical_time(&cron), last.logical_time(&cron));
            self.bounded(cancel, "clear batch", async {
                self.scheduler
                    .clear_batch(&replay.tenant, replay.job_name.as_str(), start, end)
                    .await
                    .map_err(EngineError::from)
            })
            .await?;
        } else {
            self.clear_run(cancel, request, first.logical_time(&cron)).await?;
            if request.runs.len() > 1 {
                next = ReplayState::PartialReplayed;
            }
        }

        let runs = self.fetch_runs(cancel, request).await?;
        self.store_step(request, next, runs)
    }

    async fn process_partial_replayed(
        &self,
        cancel: &CancellationToken,
        request: &ReplayWithRun,
    ) -> EngineResult<()> {
        let cron = self.replay_cron(request)?;
        let mut runs = self.fetch_runs(cancel, request).await?;
        let list = JobRunStatusList(runs.clone());
        if !list.sorted_by_states(&IN_FLIGHT).is_empty() {
            return self.store_step(request, ReplayState::PartialReplayed, runs);
        }

        let pending = list.sorted_by_states(&[State::Pending]);
        let Some(next_run) = pending.first() else {
            return self.store_step(request, ReplayState::Replayed, runs);
        };

        self.clear_run(cancel, request, next_run.logical_time(&cron)).await?;
        runs = self.fetch_runs(cancel, request).await?;

        let next = if pending.len() > 1 {
            ReplayState::PartialReplayed
        } else {
            ReplayState::Replayed
        };
        self.store_step(request, next, runs)
    }

    async fn process_replayed(
        &self,
        cancel: &CancellationToken,
        request: &ReplayWithRun,
    ) -> EngineResult<()> {
        let runs = self.fetch_runs(cancel, request).await?;
        let list = JobRunStatusList(runs.clone());
        let next = if !list.sorted_by_states(&IN_FLIGHT).is_empty() {
            ReplayState::Replayed
        } else if !list.sorted_by_states(&[State::Failed]).is_empty() {
            ReplayState::Failed
        } else {
            ReplayState::Success
        };
        self.store_step(request, next, runs)
    }

    async fn clear_run(
        &self,
        cancel: &CancellationToken,
        request: &ReplayWithRun,
        logical_time: DateTime<Utc>,
    ) -> EngineResult<()> {
        let replay = &request.replay;
        self.bounded(cancel, "clear", async {
            self.scheduler
                .clear(&replay.tenant, replay.job_name.as_str(), logical_time)
                .await
                .map_err(EngineError::from)
        })
        .await
    }

    /// Current run states in the replay window.
    async fn fetch_runs(
        &self,
        cancel: &CancellationToken,
        request: &ReplayWithRun,
    ) -> EngineResult<Vec<JobRunStatus>> {
        let replay = &request.replay;
        let criteria = JobRunsCriteria {
            name: replay.job_name.to_string(),
            start_date: replay.config.start_time,
            end_date: replay.config.end_time,
            filter: Vec::new(),
            only_last_run: false,
        };
        let job = self.job_details(replay.tenant.project_name().as_str(), replay.job_name.as_str())?;
        self.bounded(cancel, "fetch runs", self.merged_runs(cancel, &job, &criteria))
            .await
    }

    fn store_step(
        &self,
        request: &ReplayWithRun,
        next: ReplayState,
        runs: Vec<JobRunStatus>,
    ) -> EngineResult<()> {
        let id = request.replay.id;
        self.state
            .lock()
            .update_replay(id, next, runs, "", self.clock.now())?;
        tracing::info!(replay = %id, from = %request.replay.state, to = %next, "replay advanced");
        Ok(())
    }

    fn replay_cron(&self, request: &ReplayWithRun) -> EngineResult<ScheduleSpec> {
        let replay = &request.replay;
        let job = self.job_details(replay.tenant.project_name().as_str(), replay.job_name.as_str())?;
        job_cron(&job)
    }

    /// Cancellable scheduler call bounded by the configured run timeout.
    async fn bounded<T, F>(
        &self,
        cancel: &CancellationToken,
        operation: &'static str,
        fut: F,
    ) -> EngineResult<T>
    where
        F: Future<Output = EngineResult<T>>,
    {
        let limit = self.config.run_timeout;
        cancellable(cancel, async {
            tokio::time::timeout(limit, fut)
                .await
                .unwrap_or_else(|_| {
                    Err(EngineError::Timeout {
                        operation,
                        secs: limit.as_secs(),
                    })
                })
        })
        .await
    }
}

#[cfg(test)]
#[path = "../runtime_tests/worker_tests.rs"]
mod tests;
