// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admission check for replay requests

use crate::error::{EngineError, EngineResult};
use crate::runtime::cancellable;
use parking_lot::Mutex;
use skein_adapters::Scheduler;
use skein_core::filter::{with_string, with_string_array, Filter, Operand};
use skein_core::{Entity, Error, JobRunsCriteria, Replay, ReplayState, ScheduleSpec};
use skein_storage::MaterializedState;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Rejects a replay whose window collides with another ongoing replay of
/// the same job, or with runs the scheduler is still executing.
pub struct ReplayValidator {
    state: Arc<Mutex<MaterializedState>>,
    scheduler: Arc<dyn Scheduler>,
}

impl ReplayValidator {
    pub fn new(state: Arc<Mutex<MaterializedState>>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self { state, scheduler }
    }

    pub async fn validate(
        &self,
        cancel: &CancellationToken,
        request: &Replay,
        cron: &ScheduleSpec,
    ) -> EngineResult<()> {
        self.check_conflicted_replay(request)?;
        self.check_conflicted_run(cancel, request, cron).await
    }

    fn check_conflicted_replay(&self, request: &Replay) -> EngineResult<()> {
        check_conflicted_replay(&self.state.lock(), request)
    }

    async fn check_conflicted_run(
        &self,
        cancel: &CancellationToken,
        request: &Replay,
        cron: &ScheduleSpec,
    ) -> EngineResult<()> {
        let criteria = JobRunsCriteria {
            name: request.job_name.to_string(),
            start_date: request.config.start_time,
            end_date: request.config.end_time,
            filter: Vec::new(),
            only_last_run: false,
        };
        let runs = cancellable(cancel, async {
            self.scheduler
                .get_job_runs(&request.tenant, &criteria, cron)
                .await
                .map_err(EngineError::from)
        })
        .await?;

        if let Some(run) = runs.iter().find(|r| r.state.is_in_flight()) {
            tracing::warn!(job = %request.job_name, scheduled_at = %run.scheduled_at, "conflicted job run found");
            return Err(Error::failed_precondition(
                Entity::Replay,
                format!(
                    "conflicted job run found: run at {} is {}",
                    run.scheduled_at.to_rfc3339(),
                    run.state
                ),
            )
            .into());
        }
        Ok(())
    }
}

/// Fails when an ongoing replay of the same job overlaps the request's
/// window. Callers that store the request must hold the same lock across
/// this check and the insert.
pub(crate) fn check_conflicted_replay(
    state: &MaterializedState,
    request: &Replay,
) -> EngineResult<()> {
    let namespace = request
        .tenant
        .namespace_name()
        .map(|n| n.to_string())
        .unwrap_or_default();
    let filter = Filter::new([
        with_string(Operand::PROJECT_NAME, request.tenant.project_name().as_str()),
        with_string(Operand::NAMESPACE_NAME, namespace),
        with_string(Operand::JOB_NAME, request.job_name.as_str()),
        with_string_array(
            Operand::REPLAY_STATUS,
            ReplayState::ONGOING.iter().map(ReplayState::as_str),
        ),
    ]);
    let conflict = state
        .replays_matching(&filter)
        .into_iter()
        .map(|r| r.replay)
        .find(|r| {
            r.tenant == request.tenant
                && r.config
                    .intersects(request.config.start_time, request.config.end_time)
        });
    if let Some(existing) = conflict {
        tracing::warn!(job = %request.job_name, existing = %existing.id, "conflicted replay found");
        return Err(Error::failed_precondition(
            Entity::Replay,
            format!(
                "conflicted replay found: replay {} is {} between {} and {}",
                existing.id,
                existing.state,
                existing.config.start_time.to_rfc3339(),
                existing.config.end_time.to_rfc3339()
            ),
        )
        .into());
    }
    Ok(())
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
