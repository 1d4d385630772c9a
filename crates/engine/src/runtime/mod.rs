// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine that owns the store, the scheduler and the notifiers and serves
//! every control-plane operation

mod deploy;
mod job_run;
mod notify;
mod replay;
mod worker;

pub use job_run::expected_runs;

use crate::error::{EngineError, EngineResult};
use crate::telemetry::{Telemetry, TelemetrySnapshot};
use crate::validator::ReplayValidator;
use parking_lot::Mutex;
use skein_adapters::{Notifier, Scheduler};
use skein_compiler::ExecutorInputCompiler;
use skein_core::{
    parse_cron_schedule, Clock, Entity, Error, IdGen, JobWithDetails, MultiError,
    PriorityResolver, ScheduleSpec,
};
use skein_storage::{MaterializedState, SecretCipher};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Engine knobs
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Wall-clock limit of a replay, measured from its creation
    pub replay_timeout: chrono::Duration,
    /// Bound on each scheduler call made while processing a replay
    pub run_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            replay_timeout: chrono::Duration::hours(3),
            run_timeout: Duration::from_secs(300),
        }
    }
}

/// Engine adapter dependencies
pub struct EngineDeps {
    pub state: Arc<Mutex<MaterializedState>>,
    pub cipher: SecretCipher,
    pub scheduler: Arc<dyn Scheduler>,
    /// Notifiers by channel scheme (`slack`, `pagerduty`)
    pub notifiers: BTreeMap<String, Arc<dyn Notifier>>,
    pub resolver: Arc<dyn PriorityResolver>,
    pub input_compiler: ExecutorInputCompiler,
}

/// Control-plane services over one store
pub struct Engine<C: Clock, G: IdGen> {
    pub(crate) state: Arc<Mutex<MaterializedState>>,
    pub(crate) cipher: SecretCipher,
    pub(crate) scheduler: Arc<dyn Scheduler>,
    pub(crate) notifiers: BTreeMap<String, Arc<dyn Notifier>>,
    pub(crate) resolver: Arc<dyn PriorityResolver>,
    pub(crate) input_compiler: ExecutorInputCompiler,
    pub(crate) validator: ReplayValidator,
    pub(crate) telemetry: Telemetry,
    pub(crate) clock: C,
    pub(crate) ids: G,
    pub(crate) config: EngineConfig,
}

impl<C: Clock, G: IdGen> Engine<C, G> {
    pub fn new(deps: EngineDeps, clock: C, ids: G, config: EngineConfig) -> Self {
        let validator = ReplayValidator::new(Arc::clone(&deps.state), Arc::clone(&deps.scheduler));
        Self {
            state: deps.state,
            cipher: deps.cipher,
            scheduler: deps.scheduler,
            notifiers: deps.notifiers,
            resolver: deps.resolver,
            input_compiler: deps.input_compiler,
            validator,
            telemetry: Telemetry::new(),
            clock,
            ids,
            config,
        }
    }

    pub fn state(&self) -> &Arc<Mutex<MaterializedState>> {
        &self.state
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Counters of the engine plus the stats of every notifier.
    pub fn telemetry(&self) -> TelemetrySnapshot {
        let mut snapshot = self.telemetry.snapshot();
        snapshot.notifiers = self
            .notifiers
            .iter()
            .map(|(scheme, n)| (scheme.clone(), n.stats().into()))
            .collect();
        snapshot
    }

    /// Drain and stop every notifier.
    pub async fn close_notifiers(&self) -> Result<(), MultiError> {
        let mut errors = MultiError::new("errors while closing notifiers");
        for (scheme, notifier) in &self.notifiers {
            if let Err(e) = notifier.close().await {
                errors.append(format!("{scheme}: {e}"));
            }
        }
        errors.into_result()
    }

    pub(crate) fn job_details(&self, project: &str, job_name: &str) -> EngineResult<JobWithDetails> {
        Ok(self.state.lock().get_job(project, job_name)?)
    }
}

/// Parsed schedule of a job; jobs without one cannot be run or replayed.
pub(crate) fn job_cron(job: &JobWithDetails) -> EngineResult<ScheduleSpec> {
    let interval = &job.schedule.interval;
    if interval.is_empty() {
        return Err(Error::invalid_argument(
            Entity::JobRun,
            "cannot get job runs, job interval is empty",
        )
        .into());
    }
    parse_cron_schedule(interval).map_err(|e| {
        Error::internal(
            Entity::JobRun,
            format!("unable to parse job cron interval: {}", e.message()),
        )
        .into()
    })
}

/// Await `fut` unless `cancel` fires first. Nothing starts once cancelled.
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> EngineResult<T>
where
    F: Future<Output = EngineResult<T>>,
{
    if cancel.is_cancelled() {
        return Err(EngineError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(EngineError::Cancelled),
        result = fut => result,
    }
}

#[cfg(test)]
#[path = "../runtime_tests/mod.rs"]
mod tests;
