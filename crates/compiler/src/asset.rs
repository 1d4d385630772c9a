// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job asset expansion for a single run.

use crate::plugin::{CompileAssetsRequest, PluginRepo};
use crate::template::{TemplateContext, TemplateEngine};
use chrono::{DateTime, Utc};
use skein_core::{Entity, Job, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Renders a job's asset files against a run's task context
#[derive(Clone)]
pub struct JobAssetsCompiler {
    plugins: Arc<PluginRepo>,
    engine: TemplateEngine,
}

impl JobAssetsCompiler {
    pub fn new(plugins: Arc<PluginRepo>, engine: TemplateEngine) -> Self {
        Self { plugins, engine }
    }

    /// Expand the assets of `job` for the run scheduled at `scheduled_at`.
    ///
    /// When the task plugin carries an asset compiler, its output replaces
    /// the raw assets before template expansion.
    pub fn compile_job_run_assets(
        &self,
        job: &Job,
        system_env_vars: &BTreeMap<String, String>,
        scheduled_at: DateTime<Utc>,
        ctx: &TemplateContext,
    ) -> Result<BTreeMap<String, String>> {
        let plugin = self.plugins.get_by_name(&job.task.name)?;

        let start_time = job.window.start_time(scheduled_at).map_err(|e| {
            let message = format!("error getting start time: {}", e.message());
            e.with_context(Entity::Compiler, message)
        })?;
        let end_time = job.window.end_time(scheduled_at).map_err(|e| {
            let message = format!("error getting end time: {}", e.message());
            e.with_context(Entity::Compiler, message)
        })?;

        let assets = match &plugin.asset_compiler {
            Some(mod_) => {
                let mut config = job.task.config.clone();
                config.extend(system_env_vars.iter().map(|(k, v)| (k.clone(), v.clone())));
                let req = CompileAssetsRequest {
                    window: job.window.clone(),
                    start_time,
                    end_time,
                    config,
                    assets: job.assets.clone(),
                    scheduled_at,
                };
                tracing::debug!(job = %job.name, plugin = %plugin.info.name, "plugin compiling assets");
                mod_.compile_assets(&req)?
            }
            None => job.assets.clone(),
        };

        self.engine.compile_files(&assets, ctx)
    }
}

#[cfg(test)]
#[path = "asset_tests.rs"]
mod tests;
