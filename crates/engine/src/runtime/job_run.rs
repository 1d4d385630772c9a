// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job-run queries, executor inputs and scheduler event ingest

use super::{cancellable, job_cron, Engine};
use crate::error::{EngineError, EngineResult};
use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use skein_core::{
    Clock, Entity, Error, ErrorKind, Event, EventType, ExecutorInput, IdGen, JobName, JobRun, JobRunId,
    JobRunStatus, JobRunStatusList, JobRunsCriteria, JobWithDetails, MultiError, OperatorRunId,
    OperatorType, RunConfig, ScheduleSpec, State, Tenant,
};
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

/// Every fire time of `cron` in `[start, end]`, as pending runs.
pub fn expected_runs(
    cron: &ScheduleSpec,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<JobRunStatus> {
    let mut runs = Vec::new();
    let mut t = cron.next(start - Duration::seconds(1));
    while t <= end {
        runs.push(JobRunStatus::new(t, State::Pending));
        t = cron.next(t);
    }
    runs
}

/// Expected runs with the state the scheduler reported, where it did.
fn merge_runs(expected: Vec<JobRunStatus>, actual: &[JobRunStatus]) -> Vec<JobRunStatus> {
    let reported = JobRunStatusList(actual.to_vec()).to_status_map();
    JobRunStatusList(expected).merge_with_updated_runs(&reported)
}

fn filter_runs(runs: Vec<JobRunStatus>, filter: &[String]) -> Vec<JobRunStatus> {
    let keep: HashSet<State> = filter.iter().filter_map(|s| s.parse().ok()).collect();
    if keep.is_empty() {
        return runs;
    }
    runs.into_iter().filter(|r| keep.contains(&r.state)).collect()
}

fn validate_job_query(criteria: &JobRunsCriteria, job: &JobWithDetails) -> EngineResult<()> {
    let job_start = job.schedule.start_date;
    if criteria.start_date < job_start || criteria.end_date < job_start {
        return Err(Error::invalid_argument(
            Entity::JobRun,
            "invalid date range, interval contains dates before job start",
        )
        .into());
    }
    Ok(())
}

impl<C: Clock, G: IdGen> Engine<C, G> {
    /// Runs of a job in the criteria window: every expected fire time, with
    /// the scheduler's state where it has one.
    pub async fn get_job_runs(
        &self,
        cancel: &CancellationToken,
        project: &str,
        job_name: &str,
        criteria: &JobRunsCriteria,
    ) -> EngineResult<Vec<JobRunStatus>> {
        let job = self.job_details(project, job_name).map_err(|e| {
            tracing::error!(project, job = job_name, error = %e, "unable to get job details");
            e
        })?;
        let cron = job_cron(&job)?;
        let tenant = job.tenant();

        if criteria.only_last_run {
            tracing::warn!(job = job_name, "getting last run only");
            return cancellable(cancel, async {
                self.scheduler
                    .get_job_runs(tenant, criteria, &cron)
                    .await
                    .map_err(EngineError::from)
            })
            .await;
        }

        validate_job_query(criteria, &job)?;
        let expected = expected_runs(&cron, criteria.start_date, criteria.end_date);

        let actual = match self.reported_runs(cancel, tenant, criteria, &cron).await {
            Ok(runs) => runs,
            Err(EngineError::Cancelled) => return Err(EngineError::Cancelled),
            Err(e) => {
                tracing::error!(job = job_name, error = %e, "unable to get job runs from scheduler");
                Vec::new()
            }
        };

        Ok(filter_runs(merge_runs(expected, &actual), &criteria.filter))
    }

    /// Expected runs of `job` in the criteria window merged with the
    /// scheduler's states. Scheduler errors are returned, not masked.
    pub(super) async fn merged_runs(
        &self,
        cancel: &CancellationToken,
        job: &JobWithDetails,
        criteria: &JobRunsCriteria,
    ) -> EngineResult<Vec<JobRunStatus>> {
        let cron = job_cron(job)?;
        let expected = expected_runs(&cron, criteria.start_date, criteria.end_date);
        let actual = self
            .reported_runs(cancel, job.tenant(), criteria, &cron)
            .await?;
        Ok(merge_runs(expected, &actual))
    }

    async fn reported_runs(
        &self,
        cancel: &CancellationToken,
        tenant: &Tenant,
        criteria: &JobRunsCriteria,
        cron: &ScheduleSpec,
    ) -> EngineResult<Vec<JobRunStatus>> {
        cancellable(cancel, async {
            self.scheduler
                .get_job_runs(tenant, criteria, cron)
                .await
                .map_err(EngineError::from)
        })
        .await
    }

    /// Compile the configs, secrets and files a run's executor needs.
    pub async fn job_run_input(
        &self,
        cancel: &CancellationToken,
        project: &str,
        job_name: &str,
        config: RunConfig,
    ) -> EngineResult<ExecutorInput> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let mut job = self.job_details(project, job_name)?;
        let tenant = job.tenant().clone();

        let (executed_at, overrides, details) = {
            let state = self.state.lock();
            let run = match config.job_run_id {
                Some(id) => state.get_job_run(id),
                None => state.get_job_run_by_scheduled_at(&tenant, &job.name, config.scheduled_at),
            };
            let executed_at = match run {
                Ok(run) => run.start_time,
                Err(e) => {
                    tracing::warn!(
                        job = job_name,
                        error = %e,
                        "no job run found, using scheduled time as execution time"
                    );
                    config.scheduled_at
                }
            };
            let overrides = state.replay_job_config(&tenant, &job.name, config.scheduled_at);
            let details = state.tenant_details(&self.cipher, &tenant)?;
            (executed_at, overrides, details)
        };

        job.job.task.config.extend(overrides);
        Ok(self
            .input_compiler
            .compile(&job.job, &details, &config, executed_at)?)
    }

    /// Validate a raw scheduler event, apply it to the run store and fan
    /// out any alerts it triggers.
    pub async fn register_job_event(
        &self,
        cancel: &CancellationToken,
        tenant: &Tenant,
        job_name: &str,
        event_type: &str,
        values: Map<String, Value>,
    ) -> EngineResult<()> {
        let job_name = JobName::try_new(job_name)?;
        let mut event = Event::from_values(event_type, values, job_name, tenant.clone())?;

        let mut errors = MultiError::new("errors in RegisterJobEvent");
        if let Err(e) = self.update_job_state(cancel, &mut event).await {
            tracing::error!(job = %event.job_name, event = event_type, error = %e, "error updating job run state");
            errors.append(e);
        }
        if let Err(e) = self.push(cancel, &event).await {
            tracing::error!(job = %event.job_name, event = event_type, error = %e, "error pushing notification");
            errors.append(e);
        }
        Ok(errors.into_result()?)
    }

    /// Apply one event to the job and operator run tables.
    ///
    /// An SLA miss event is narrowed to the runs that actually breached.
    pub async fn update_job_state(
        &self,
        cancel: &CancellationToken,
        event: &mut Event,
    ) -> EngineResult<()> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        match event.event_type {
            EventType::SlaMiss => self.process_sla_miss(event),
            EventType::JobSuccess | EventType::JobFailure => self.process_job_finish(event),
            EventType::JobStart => {
                self.register_job_run(&event.tenant, &event.job_name, event.job_scheduled_at)?;
                self.telemetry.record_run_event(State::Running.as_str());
                Ok(())
            }
            ty if ty.is_operator_start() => self.process_operator_start(event),
            _ => self.process_operator_update(event),
        }
    }

    fn process_sla_miss(&self, event: &mut Event) -> EngineResult<()> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let mut breached = Vec::new();
        for sla in &event.sla_objects {
            let run = match state.get_job_run_by_scheduled_at(
                &event.tenant,
                &sla.job_name,
                sla.job_scheduled_at,
            ) {
                Ok(run) => run,
                Err(e) => {
                    tracing::warn!(job = %sla.job_name, error = %e, "sla miss for unknown job run");
                    continue;
                }
            };
            if !run.has_sla_breached(now) {
                continue;
            }
            state.mark_sla_alert(run.id, now)?;
            self.telemetry.record_run_event("sla_miss");
            breached.push(sla.clone());
        }
        event.sla_objects = breached;
        Ok(())
    }

    fn process_job_finish(&self, event: &Event) -> EngineResult<()> {
        let run = self.get_or_create_job_run(&event.tenant, &event.job_name, event.job_scheduled_at)?;
        let status = event.status.unwrap_or(State::Failed);
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.update_job_run(run.id, Some(event.event_time), status, now)?;
        self.telemetry.record_run_event(status.as_str());
        state.update_job_run_monitoring(run.id, event.monitoring_values(), now)?;
        Ok(())
    }

    fn process_operator_start(&self, event: &Event) -> EngineResult<()> {
        let operator = operator_of(event)?;
        let run = self.get_or_create_job_run(&event.tenant, &event.job_name, event.job_scheduled_at)?;
        self.start_operator(&run, operator, event)?;
        Ok(())
    }

    fn process_operator_update(&self, event: &Event) -> EngineResult<()> {
        let operator = operator_of(event)?;
        let run = self
            .state
            .lock()
            .get_job_run_by_scheduled_at(&event.tenant, &event.job_name, event.job_scheduled_at)?;

        let existing = self
            .state
            .lock()
            .get_operator_run(&event.operator_name, operator, run.id);
        let operator_run_id = match existing {
            Ok(op) => op.id,
            Err(e) if e.is(ErrorKind::NotFound) => {
                tracing::warn!(
                    job = %event.job_name,
                    operator = %event.operator_name,
                    "operator run not found, registering it"
                );
                self.start_operator(&run, operator, event)?
            }
            Err(e) => return Err(e.into()),
        };

        let status = event.status.unwrap_or(State::Failed);
        self.state.lock().update_operator_run(
            operator,
            operator_run_id,
            event.event_time,
            status,
            self.clock.now(),
        )?;
        Ok(())
    }

    /// Record an operator start within `run`, moving the job run to the
    /// operator's start state. A start for an operator that is already
    /// running or has finished is ignored.
    fn start_operator(
        &self,
        run: &JobRun,
        operator: OperatorType,
        event: &Event,
    ) -> EngineResult<OperatorRunId> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        if let Ok(existing) = state.get_operator_run(&event.operator_name, operator, run.id) {
            if existing.status == State::Running || existing.status.is_terminal() {
                return Ok(existing.id);
            }
        }

        let job_state = operator.start_job_state();
        if !run.state.is_terminal() && run.state != job_state {
            state.update_job_run(run.id, None, job_state, now)?;
            self.telemetry.record_run_event(job_state.as_str());
        }

        let id = OperatorRunId::new(self.ids.next());
        Ok(state.create_operator_run(
            id,
            &event.operator_name,
            operator,
            run.id,
            event.event_time,
            now,
        )?)
    }

    fn get_or_create_job_run(
        &self,
        tenant: &Tenant,
        job_name: &JobName,
        scheduled_at: DateTime<Utc>,
    ) -> EngineResult<JobRun> {
        let found = self
            .state
            .lock()
            .get_job_run_by_scheduled_at(tenant, job_name, scheduled_at);
        match found {
            Ok(run) => Ok(run),
            Err(e) if e.is(ErrorKind::NotFound) => {
                let id = self.register_job_run(tenant, job_name, scheduled_at)?;
                Ok(self.state.lock().get_job_run(id)?)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn register_job_run(
        &self,
        tenant: &Tenant,
        job_name: &JobName,
        scheduled_at: DateTime<Utc>,
    ) -> EngineResult<JobRunId> {
        let job = self.job_details(tenant.project_name().as_str(), job_name.as_str())?;
        let sla = job.sla_duration()?;
        let now = self.clock.now();
        let id = self.state.lock().create_job_run(
            JobRunId::new(self.ids.next()),
            tenant,
            job_name,
            scheduled_at,
            sla,
            now,
        );
        tracing::info!(job = %job_name, scheduled_at = %scheduled_at, "registered job run");
        Ok(id)
    }
}

fn operator_of(event: &Event) -> EngineResult<OperatorType> {
    event.event_type.operator_type().ok_or_else(|| {
        Error::invalid_argument(
            Entity::Event,
            format!("invalid operator type for event {}", event.event_type.as_str()),
        )
        .into()
    })
}

#[cfg(test)]
#[path = "../runtime_tests/job_run_tests.rs"]
mod tests;
