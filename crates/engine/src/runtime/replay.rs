// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replay requests: creation and lookup

use super::{job_cron, job_run::expected_runs, Engine};
use crate::error::EngineResult;
use crate::validator::check_conflicted_replay;
use skein_core::filter::{with_string, Filter, Operand};
use skein_core::{
    Clock, Entity, Error, IdGen, JobName, Replay, ReplayConfig, ReplayId, ReplayState,
    ReplayWithRun, Tenant,
};
use tokio_util::sync::CancellationToken;

impl<C: Clock, G: IdGen> Engine<C, G> {
    /// Validate and store a replay of `job_name` over the config window.
    ///
    /// The stored run list holds every fire time in the window as pending;
    /// the replay manager picks the request up from there.
    pub async fn create_replay(
        &self,
        cancel: &CancellationToken,
        tenant: &Tenant,
        job_name: &str,
        config: ReplayConfig,
    ) -> EngineResult<ReplayId> {
        let job = self.job_details(tenant.project_name().as_str(), job_name)?;
        if job.tenant() != tenant {
            let namespace = tenant.namespace_name().map(|n| n.to_string()).unwrap_or_default();
            return Err(Error::invalid_argument(
                Entity::Replay,
                format!("job {job_name} does not exist in {namespace} namespace"),
            )
            .into());
        }
        if config.start_time > config.end_time {
            return Err(Error::invalid_argument(
                Entity::Replay,
                "replay start time cannot be after its end time",
            )
            .into());
        }

        let cron = job_cron(&job)?;
        let request = Replay::new_request(
            JobName::try_new(job_name)?,
            tenant.clone(),
            config,
            ReplayState::Created,
            self.clock.now(),
        );
        self.validator.validate(cancel, &request, &cron).await?;

        let runs = expected_runs(&cron, request.config.start_time, request.config.end_time);
        let id = ReplayId::new(self.ids.next());
        let id = {
            // The scheduler check ran unlocked; a concurrent request may have
            // been stored since.
            let mut state = self.state.lock();
            check_conflicted_replay(&state, &request)?;
            state.register_replay(id, request, runs, self.clock.now())
        };
        tracing::info!(replay = %id, %tenant, job = job_name, "replay request created");
        Ok(id)
    }

    /// Replays of a project, newest first.
    pub fn replay_list(&self, project: &str) -> Vec<ReplayWithRun> {
        let filter = Filter::new([with_string(Operand::PROJECT_NAME, project)]);
        self.state.lock().replays_matching(&filter)
    }

    pub fn replay_by_id(&self, id: ReplayId) -> EngineResult<ReplayWithRun> {
        Ok(self.state.lock().get_replay(id)?)
    }
}

#[cfg(test)]
#[path = "../runtime_tests/replay_tests.rs"]
mod tests;
