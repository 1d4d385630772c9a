// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconciling the scheduler with the stored jobs

use super::{cancellable, Engine};
use crate::error::{EngineError, EngineResult};
use skein_core::job::group_jobs_by_tenant;
use skein_core::{Clock, IdGen, JobWithDetails, MultiError, Tenant};
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

impl<C: Clock, G: IdGen> Engine<C, G> {
    /// Deploy every job of the project and remove scheduler jobs that no
    /// longer exist. Failures are collected per tenant.
    pub async fn upload_to_scheduler(
        &self,
        cancel: &CancellationToken,
        project: &str,
    ) -> EngineResult<()> {
        let mut errors = MultiError::new("errorInUploadToScheduler");

        let mut jobs = self.state.lock().jobs_for_project(project);
        if let Err(e) = self.resolver.resolve(&mut jobs) {
            errors.append(e);
            return Err(errors.into());
        }

        match Tenant::project_scope(project) {
            Ok(scope) => {
                let result = cancellable(cancel, async {
                    self.scheduler.bootstrap(&scope).await.map_err(EngineError::from)
                })
                .await;
                errors.collect(result);
            }
            Err(e) => errors.append(e),
        }

        for (tenant, tenant_jobs) in group_jobs_by_tenant(jobs) {
            if cancel.is_cancelled() {
                errors.append(EngineError::Cancelled);
                break;
            }
            tracing::info!(%tenant, jobs = tenant_jobs.len(), "uploading jobs");
            let deployed = cancellable(cancel, async {
                self.scheduler.deploy_jobs(&tenant, &tenant_jobs).await.map_err(EngineError::from)
            })
            .await;
            errors.collect(deployed);

            if let Err(e) = self.clean_per_tenant(cancel, &tenant, &tenant_jobs).await {
                errors.append(e);
            }
        }

        errors.into_result()?;
        tracing::info!(project, "uploaded jobs to scheduler");
        Ok(())
    }

    /// Deploy `to_update` and delete `to_delete` for one tenant.
    pub async fn upload_jobs(
        &self,
        cancel: &CancellationToken,
        tenant: &Tenant,
        to_update: &[String],
        to_delete: &[String],
    ) -> EngineResult<()> {
        let mut errors = MultiError::new("errorInUploadJobs");

        if !to_update.is_empty() {
            let mut jobs = self
                .state
                .lock()
                .jobs_by_names(tenant.project_name().as_str(), to_update);
            match self.resolver.resolve(&mut jobs) {
                Ok(()) => {
                    let deployed = cancellable(cancel, async {
                        self.scheduler.deploy_jobs(tenant, &jobs).await.map_err(EngineError::from)
                    })
                    .await;
                    errors.collect(deployed);
                }
                Err(e) => errors.append(e),
            }
        }

        if !to_delete.is_empty() {
            let deleted = cancellable(cancel, async {
                self.scheduler.delete_jobs(tenant, to_delete).await.map_err(EngineError::from)
            })
            .await;
            errors.collect(deleted);
        }

        Ok(errors.into_result()?)
    }

    async fn clean_per_tenant(
        &self,
        cancel: &CancellationToken,
        tenant: &Tenant,
        current: &[JobWithDetails],
    ) -> EngineResult<()> {
        let deployed = cancellable(cancel, async {
            self.scheduler.list_jobs(tenant).await.map_err(EngineError::from)
        })
        .await?;
        let keep: HashSet<&str> = current.iter().map(JobWithDetails::get_name).collect();
        let stale: Vec<String> = deployed
            .into_iter()
            .filter(|name| !keep.contains(name.as_str()))
            .collect();
        if stale.is_empty() {
            return Ok(());
        }

        tracing::info!(%tenant, jobs = ?stale, "deleting stale jobs");
        cancellable(cancel, async {
            self.scheduler.delete_jobs(tenant, &stale).await.map_err(EngineError::from)
        })
        .await
    }
}

#[cfg(test)]
#[path = "../runtime_tests/deploy_tests.rs"]
mod tests;
