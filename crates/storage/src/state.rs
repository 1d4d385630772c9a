// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized tables for projects, jobs, runs and replays.
//!
//! Every mutation takes the caller's `now` so stored timestamps follow the
//! injected clock. Callers serialise access by holding the state behind a
//! mutex; one locked call is one row-level transaction.

use crate::crypto::SecretCipher;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use skein_core::filter::{Filter, Operand};
use skein_core::tenant::{Secret, SecretType};
use skein_core::{
    Entity, Error, JobName, JobRun, JobRunId, JobRunStatus, JobWithDetails, Namespace,
    OperatorRun, OperatorRunId, OperatorType, PlainTextSecret, Project, Replay, ReplayId,
    ReplayState, ReplayWithRun, Result, State, Tenant, TenantDetails,
};
use std::collections::BTreeMap;

/// A stored row with its bookkeeping timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    pub value: T,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<T> Record<T> {
    fn new(value: T, now: DateTime<Utc>) -> Self {
        Self {
            value,
            created_at: now,
            updated_at: now,
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) -> &mut T {
        self.updated_at = now;
        &mut self.value
    }
}

/// Materialized state of every persisted table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterializedState {
    #[serde(default)]
    pub projects: BTreeMap<String, Record<Project>>,
    /// Keyed by `project/namespace`
    #[serde(default)]
    pub namespaces: BTreeMap<String, Record<Namespace>>,
    /// Keyed by `project/namespace/NAME`; project secrets leave the namespace empty
    #[serde(default)]
    pub secrets: BTreeMap<String, Record<Secret>>,
    /// Keyed by `project/job`
    #[serde(default)]
    pub jobs: BTreeMap<String, Record<JobWithDetails>>,
    #[serde(default)]
    pub job_runs: BTreeMap<JobRunId, Record<JobRun>>,
    /// `project/namespace/job/scheduled_at` to run id
    #[serde(default)]
    pub job_run_index: BTreeMap<String, JobRunId>,
    #[serde(default)]
    pub task_runs: BTreeMap<OperatorRunId, Record<OperatorRun>>,
    #[serde(default)]
    pub sensor_runs: BTreeMap<OperatorRunId, Record<OperatorRun>>,
    #[serde(default)]
    pub hook_runs: BTreeMap<OperatorRunId, Record<OperatorRun>>,
    #[serde(default)]
    pub replays: BTreeMap<ReplayId, Record<ReplayWithRun>>,
}

fn namespace_key(project: &str, namespace: &str) -> String {
    format!("{project}/{namespace}")
}

fn secret_key(tenant: &Tenant, name: &str) -> String {
    let namespace = tenant.namespace_name().map(|n| n.as_str()).unwrap_or_default();
    format!("{}/{}/{}", tenant.project_name(), namespace, name)
}

fn job_key(project: &str, job: &str) -> String {
    format!("{project}/{job}")
}

fn job_run_key(tenant: &Tenant, job_name: &JobName, scheduled_at: DateTime<Utc>) -> String {
    format!("{}/{}/{}", tenant, job_name, scheduled_at.timestamp_micros())
}

impl MaterializedState {
    // ── Projects, namespaces and secrets ────────────────────────────────────

    pub fn upsert_project(&mut self, project: Project, now: DateTime<Utc>) {
        let key = project.name().to_string();
        match self.projects.get_mut(&key) {
            Some(record) => *record.touch(now) = project,
            None => {
                self.projects.insert(key, Record::new(project, now));
            }
        }
    }

    pub fn get_project(&self, name: &str) -> Result<Project> {
        self.projects
            .get(name)
            .map(|r| r.value.clone())
            .ok_or_else(|| Error::not_found(Entity::Project, format!("project {name} not found")))
    }

    pub fn upsert_namespace(&mut self, namespace: Namespace, now: DateTime<Utc>) -> Result<()> {
        let project = namespace.project_name().to_string();
        if !self.projects.contains_key(&project) {
            return Err(Error::not_found(
                Entity::Project,
                format!("project {project} not found"),
            ));
        }
        let key = namespace_key(&project, namespace.name().as_str());
        match self.namespaces.get_mut(&key) {
            Some(record) => *record.touch(now) = namespace,
            None => {
                self.namespaces.insert(key, Record::new(namespace, now));
            }
        }
        Ok(())
    }

    pub fn get_namespace(&self, project: &str, name: &str) -> Result<Namespace> {
        self.namespaces
            .get(&namespace_key(project, name))
            .map(|r| r.value.clone())
            .ok_or_else(|| {
                Error::not_found(
                    Entity::Namespace,
                    format!("namespace {name} not found in project {project}"),
                )
            })
    }

    /// Encrypt and store a secret for the tenant, replacing any existing value.
    pub fn save_secret(
        &mut self,
        cipher: &SecretCipher,
        tenant: &Tenant,
        secret: &PlainTextSecret,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let name = secret.name().as_str();
        let encoded_value = cipher.encrypt(secret.value()).map_err(|e| {
            Error::internal(Entity::Secret, format!("unable to encrypt secret {name}: {e}"))
        })?;
        let stored = Secret {
            name: secret.name().clone(),
            secret_type: SecretType::for_name(name),
            encoded_value,
            tenant: tenant.clone(),
        };
        let key = secret_key(tenant, name);
        match self.secrets.get_mut(&key) {
            Some(record) => *record.touch(now) = stored,
            None => {
                self.secrets.insert(key, Record::new(stored, now));
            }
        }
        Ok(())
    }

    pub fn delete_secret(&mut self, tenant: &Tenant, name: &str) -> Result<()> {
        self.secrets
            .remove(&secret_key(tenant, name))
            .map(|_| ())
            .ok_or_else(|| Error::not_found(Entity::Secret, format!("secret {name} not found")))
    }

    /// Decrypted secrets visible to the tenant.
    ///
    /// Project secrets are included; a namespace secret of the same name wins.
    pub fn get_secrets(&self, cipher: &SecretCipher, tenant: &Tenant) -> Result<Vec<PlainTextSecret>> {
        let project = tenant.project_name().as_str();
        let namespace = tenant.namespace_name().ok().map(|n| n.as_str());
        let mut visible: BTreeMap<&str, &Secret> = BTreeMap::new();
        for record in self.secrets.values() {
            let secret = &record.value;
            if secret.tenant.project_name().as_str() != project {
                continue;
            }
            match secret.tenant.namespace_name().ok().map(|n| n.as_str()) {
                None => {
                    visible.entry(secret.name.as_str()).or_insert(secret);
                }
                Some(ns) if Some(ns) == namespace => {
                    visible.insert(secret.name.as_str(), secret);
                }
                Some(_) => {}
            }
        }
        visible
            .into_values()
            .map(|secret| decrypt(cipher, secret))
            .collect()
    }

    pub fn get_secret(
        &self,
        cipher: &SecretCipher,
        tenant: &Tenant,
        name: &str,
    ) -> Result<PlainTextSecret> {
        self.get_secrets(cipher, tenant)?
            .into_iter()
            .find(|s| s.name().as_str() == name)
            .ok_or_else(|| Error::not_found(Entity::Secret, format!("secret {name} not found")))
    }

    /// Project, namespace and decrypted secrets of a tenant.
    pub fn tenant_details(&self, cipher: &SecretCipher, tenant: &Tenant) -> Result<TenantDetails> {
        let project = self.get_project(tenant.project_name().as_str())?;
        let namespace = match tenant.namespace_name() {
            Ok(ns) => Some(self.get_namespace(tenant.project_name().as_str(), ns.as_str())?),
            Err(_) => None,
        };
        let secrets = self.get_secrets(cipher, tenant)?;
        Ok(TenantDetails::new(project, namespace).with_secrets(secrets))
    }

    // ── Jobs ────────────────────────────────────────────────────────────────

    pub fn upsert_job(&mut self, job: JobWithDetails, now: DateTime<Utc>) {
        let key = job_key(job.tenant().project_name().as_str(), job.get_name());
        match self.jobs.get_mut(&key) {
            Some(record) => *record.touch(now) = job,
            None => {
                self.jobs.insert(key, Record::new(job, now));
            }
        }
    }

    pub fn delete_job(&mut self, project: &str, name: &str) -> Result<JobWithDetails> {
        self.jobs
            .remove(&job_key(project, name))
            .map(|r| r.value)
            .ok_or_else(|| job_not_found(project, name))
    }

    pub fn get_job(&self, project: &str, name: &str) -> Result<JobWithDetails> {
        self.jobs
            .get(&job_key(project, name))
            .map(|r| r.value.clone())
            .ok_or_else(|| job_not_found(project, name))
    }

    pub fn jobs_for_project(&self, project: &str) -> Vec<JobWithDetails> {
        let prefix = format!("{project}/");
        self.jobs
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .map(|(_, r)| r.value.clone())
            .collect()
    }

    /// Jobs of the project with the given names; unknown names are skipped.
    pub fn jobs_by_names(&self, project: &str, names: &[String]) -> Vec<JobWithDetails> {
        names
            .iter()
            .filter_map(|name| self.jobs.get(&job_key(project, name)))
            .map(|r| r.value.clone())
            .collect()
    }

    // ── Job runs ────────────────────────────────────────────────────────────

    pub fn get_job_run(&self, id: JobRunId) -> Result<JobRun> {
        self.job_runs
            .get(&id)
            .map(|r| r.value.clone())
            .ok_or_else(|| Error::not_found(Entity::JobRun, format!("job run {id} not found")))
    }

    pub fn get_job_run_by_scheduled_at(
        &self,
        tenant: &Tenant,
        job_name: &JobName,
        scheduled_at: DateTime<Utc>,
    ) -> Result<JobRun> {
        self.job_run_index
            .get(&job_run_key(tenant, job_name, scheduled_at))
            .and_then(|id| self.job_runs.get(id))
            .map(|r| r.value.clone())
            .ok_or_else(|| {
                Error::not_found(
                    Entity::JobRun,
                    format!(
                        "job run not found for {job_name} scheduled at {}",
                        scheduled_at.to_rfc3339()
                    ),
                )
            })
    }

    /// Register a running job run.
    ///
    /// A row already stored for the same tenant, job and scheduled time is
    /// restarted in place, so there is never more than one. Returns the id
    /// of the stored row.
    pub fn create_job_run(
        &mut self,
        new_id: JobRunId,
        tenant: &Tenant,
        job_name: &JobName,
        scheduled_at: DateTime<Utc>,
        sla_definition: i64,
        now: DateTime<Utc>,
    ) -> JobRunId {
        let key = job_run_key(tenant, job_name, scheduled_at);
        if let Some(record) = self.job_run_index.get(&key).and_then(|id| self.job_runs.get_mut(id)) {
            let run = record.touch(now);
            run.state = State::Running;
            run.start_time = now;
            run.end_time = None;
            run.sla_definition = sla_definition;
            return run.id;
        }
        let run = JobRun {
            id: new_id,
            job_name: job_name.clone(),
            tenant: tenant.clone(),
            state: State::Running,
            scheduled_at,
            start_time: now,
            end_time: None,
            sla_definition,
            sla_alert: false,
            monitoring: Map::new(),
        };
        self.job_run_index.insert(key, new_id);
        self.job_runs.insert(new_id, Record::new(run, now));
        new_id
    }

    pub fn update_job_run(
        &mut self,
        id: JobRunId,
        end_time: Option<DateTime<Utc>>,
        state: State,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let run = self.job_run_mut(id, now)?;
        run.state = state;
        if end_time.is_some() {
            run.end_time = end_time;
        }
        Ok(())
    }

    pub fn mark_sla_alert(&mut self, id: JobRunId, now: DateTime<Utc>) -> Result<()> {
        self.job_run_mut(id, now)?.sla_alert = true;
        Ok(())
    }

    pub fn update_job_run_monitoring(
        &mut self,
        id: JobRunId,
        monitoring: Map<String, Value>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.job_run_mut(id, now)?.monitoring = monitoring;
        Ok(())
    }

    /// Stored runs of a job, oldest scheduled first.
    pub fn job_runs_for_job(&self, tenant: &Tenant, job_name: &JobName) -> Vec<JobRun> {
        let mut runs: Vec<JobRun> = self
            .job_runs
            .values()
            .filter(|r| &r.value.tenant == tenant && &r.value.job_name == job_name)
            .map(|r| r.value.clone())
            .collect();
        runs.sort_by_key(|r| r.scheduled_at);
        runs
    }

    fn job_run_mut(&mut self, id: JobRunId, now: DateTime<Utc>) -> Result<&mut JobRun> {
        self.job_runs
            .get_mut(&id)
            .map(|r| r.touch(now))
            .ok_or_else(|| Error::not_found(Entity::JobRun, format!("job run {id} not found")))
    }

    // ── Operator runs ───────────────────────────────────────────────────────

    fn operator_table(&self, operator: OperatorType) -> &BTreeMap<OperatorRunId, Record<OperatorRun>> {
        match operator {
            OperatorType::Task => &self.task_runs,
            OperatorType::Sensor => &self.sensor_runs,
            OperatorType::Hook => &self.hook_runs,
        }
    }

    fn operator_table_mut(
        &mut self,
        operator: OperatorType,
    ) -> &mut BTreeMap<OperatorRunId, Record<OperatorRun>> {
        match operator {
            OperatorType::Task => &mut self.task_runs,
            OperatorType::Sensor => &mut self.sensor_runs,
            OperatorType::Hook => &mut self.hook_runs,
        }
    }

    /// Most recently started run of the named operator within a job run.
    pub fn get_operator_run(
        &self,
        name: &str,
        operator: OperatorType,
        job_run_id: JobRunId,
    ) -> Result<OperatorRun> {
        self.operator_table(operator)
            .values()
            .map(|r| &r.value)
            .filter(|op| op.job_run_id == job_run_id && op.name == name)
            .max_by_key(|op| op.start_time)
            .cloned()
            .ok_or_else(|| {
                Error::not_found(
                    Entity::OperatorRun,
                    format!("no {operator} run found for {name} in job run {job_run_id}"),
                )
            })
    }

    pub fn create_operator_run(
        &mut self,
        id: OperatorRunId,
        name: &str,
        operator: OperatorType,
        job_run_id: JobRunId,
        start_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<OperatorRunId> {
        if !self.job_runs.contains_key(&job_run_id) {
            return Err(Error::not_found(
                Entity::JobRun,
                format!("job run {job_run_id} not found"),
            ));
        }
        let run = OperatorRun {
            id,
            name: name.to_string(),
            job_run_id,
            operator_type: operator,
            status: State::Running,
            start_time,
            end_time: None,
        };
        self.operator_table_mut(operator).insert(id, Record::new(run, now));
        Ok(id)
    }

    pub fn update_operator_run(
        &mut self,
        operator: OperatorType,
        id: OperatorRunId,
        end_time: DateTime<Utc>,
        state: State,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let run = self
            .operator_table_mut(operator)
            .get_mut(&id)
            .map(|r| r.touch(now))
            .ok_or_else(|| {
                Error::not_found(Entity::OperatorRun, format!("{operator} run {id} not found"))
            })?;
        run.status = state;
        run.end_time = Some(end_time);
        Ok(())
    }

    /// All runs of one operator kind within a job run, oldest first.
    pub fn operator_runs(&self, operator: OperatorType, job_run_id: JobRunId) -> Vec<OperatorRun> {
        let mut runs: Vec<OperatorRun> = self
            .operator_table(operator)
            .values()
            .filter(|r| r.value.job_run_id == job_run_id)
            .map(|r| r.value.clone())
            .collect();
        runs.sort_by_key(|r| r.start_time);
        runs
    }

    // ── Replays ─────────────────────────────────────────────────────────────

    /// Store a replay request under `id` together with its expected runs.
    pub fn register_replay(
        &mut self,
        id: ReplayId,
        replay: Replay,
        runs: Vec<JobRunStatus>,
        now: DateTime<Utc>,
    ) -> ReplayId {
        let replay = Replay { id, ..replay };
        self.replays
            .insert(id, Record::new(ReplayWithRun { replay, runs }, now));
        id
    }

    pub fn get_replay(&self, id: ReplayId) -> Result<ReplayWithRun> {
        self.replays
            .get(&id)
            .map(|r| r.value.clone())
            .ok_or_else(|| Error::not_found(Entity::Replay, format!("replay with id {id} not found")))
    }

    pub fn replays_by_status(&self, states: &[ReplayState]) -> Vec<Replay> {
        self.replays
            .values()
            .map(|r| &r.value.replay)
            .filter(|r| states.contains(&r.state))
            .cloned()
            .collect()
    }

    /// Replays matching `filter`, newest first. Project, namespace, job
    /// name and replay status operands narrow the result; unset ones match
    /// everything.
    pub fn replays_matching(&self, filter: &Filter) -> Vec<ReplayWithRun> {
        let project = filter.get_string_value(Operand::PROJECT_NAME);
        let namespace = filter.get_string_value(Operand::NAMESPACE_NAME);
        let job = filter.get_string_value(Operand::JOB_NAME);
        let statuses = filter.get_string_array_value(Operand::REPLAY_STATUS);

        let mut replays: Vec<ReplayWithRun> = self
            .replays
            .values()
            .map(|r| &r.value)
            .filter(|r| {
                let replay = &r.replay;
                (project.is_empty() || replay.tenant.project_name().as_str() == project)
                    && (namespace.is_empty()
                        || replay
                            .tenant
                            .namespace_name()
                            .is_ok_and(|n| n.as_str() == namespace))
                    && (job.is_empty() || replay.job_name.as_str() == job)
                    && (statuses.is_empty() || statuses.iter().any(|s| s == replay.state.as_str()))
            })
            .cloned()
            .collect();
        replays.sort_by(|a, b| b.replay.created_at.cmp(&a.replay.created_at));
        replays
    }

    /// Oldest executable replay, claimed by moving it to `in progress`.
    pub fn next_executable_replay(&mut self, now: DateTime<Utc>) -> Result<ReplayWithRun> {
        let id = self
            .replays
            .values()
            .filter(|r| ReplayState::EXECUTABLE.contains(&r.value.replay.state))
            .min_by_key(|r| (r.value.replay.created_at, r.value.replay.id))
            .map(|r| r.value.replay.id)
            .ok_or_else(|| {
                Error::not_found(Entity::Replay, "no executable replay request found")
            })?;
        let claimed = self.replay_mut(id, now)?;
        let picked = claimed.clone();
        claimed.replay.state = ReplayState::InProgress;
        claimed.replay.message.clear();
        Ok(picked)
    }

    pub fn update_replay_status(
        &mut self,
        id: ReplayId,
        state: ReplayState,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let stored = self.replay_mut(id, now)?;
        stored.replay.state = state;
        stored.replay.message = message.to_string();
        Ok(())
    }

    pub fn update_replay(
        &mut self,
        id: ReplayId,
        state: ReplayState,
        runs: Vec<JobRunStatus>,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let stored = self.replay_mut(id, now)?;
        stored.replay.state = state;
        stored.replay.message = message.to_string();
        stored.runs = runs;
        Ok(())
    }

    /// Job config overrides of every replay whose window covers
    /// `scheduled_at`, applied oldest first.
    pub fn replay_job_config(
        &self,
        tenant: &Tenant,
        job_name: &JobName,
        scheduled_at: DateTime<Utc>,
    ) -> BTreeMap<String, String> {
        let mut replays: Vec<&Replay> = self
            .replays
            .values()
            .map(|r| &r.value.replay)
            .filter(|r| {
                &r.tenant == tenant && &r.job_name == job_name && r.config.contains(scheduled_at)
            })
            .collect();
        replays.sort_by_key(|r| r.created_at);
        replays
            .into_iter()
            .flat_map(|r| r.config.job_config.clone())
            .collect()
    }

    fn replay_mut(&mut self, id: ReplayId, now: DateTime<Utc>) -> Result<&mut ReplayWithRun> {
        self.replays
            .get_mut(&id)
            .map(|r| r.touch(now))
            .ok_or_else(|| Error::not_found(Entity::Replay, format!("replay with id {id} not found")))
    }
}

fn job_not_found(project: &str, name: &str) -> Error {
    Error::not_found(Entity::Job, format!("job {name} not found in project {project}"))
}

fn decrypt(cipher: &SecretCipher, secret: &Secret) -> Result<PlainTextSecret> {
    let name = secret.name.as_str();
    let value = cipher.decrypt(&secret.encoded_value).map_err(|e| {
        Error::internal(Entity::Secret, format!("unable to decrypt secret {name}: {e}"))
    })?;
    PlainTextSecret::new(name, value)
}

#[cfg(test)]
#[path = "state_tests/mod.rs"]
mod tests;
