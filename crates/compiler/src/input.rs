// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor input: the configs, secrets and files an operator receives
//! when it starts.

use crate::asset::JobAssetsCompiler;
use crate::context::{
    merge_contexts, prepare_context, ContextLayer, CONTEXT_PROJECT, CONTEXT_SECRET,
    CONTEXT_SYSTEM_DEFINED, CONTEXT_TASK, PROJECT_CONFIG_PREFIX, TASK_CONFIG_PREFIX,
};
use crate::template::{TemplateContext, TemplateEngine};
use chrono::{DateTime, SecondsFormat, Utc};
use skein_core::{Entity, ExecutorInput, ExecutorType, Job, Result, RunConfig, TenantDetails};
use std::collections::BTreeMap;

pub const CONFIG_KEY_DSTART: &str = "DSTART";
pub const CONFIG_KEY_DEND: &str = "DEND";
pub const CONFIG_KEY_EXECUTION_TIME: &str = "EXECUTION_TIME";
pub const CONFIG_KEY_DESTINATION: &str = "JOB_DESTINATION";

/// Config values referencing a secret are compiled into the secrets half
const SECRET_MARKER: &str = ".secret.";

/// Compiles executor input for task and hook operators
#[derive(Clone)]
pub struct ExecutorInputCompiler {
    assets: JobAssetsCompiler,
    engine: TemplateEngine,
}

/// A config map compiled into its plain and secret halves
struct CompiledConfigs {
    configs: BTreeMap<String, String>,
    secrets: BTreeMap<String, String>,
}

impl ExecutorInputCompiler {
    pub fn new(assets: JobAssetsCompiler, engine: TemplateEngine) -> Self {
        Self { assets, engine }
    }

    pub fn compile(
        &self,
        job: &Job,
        details: &TenantDetails,
        config: &RunConfig,
        executed_at: DateTime<Utc>,
    ) -> Result<ExecutorInput> {
        let system_vars = system_defined_vars(job, config.scheduled_at, executed_at)?;

        let task_context = prepare_context([
            ContextLayer::from_map(&details.get_configs())
                .with_name(CONTEXT_PROJECT)
                .with_key_prefix(PROJECT_CONFIG_PREFIX),
            ContextLayer::from_map(&details.secrets_map()).with_name(CONTEXT_SECRET),
            ContextLayer::from_map(&system_vars)
                .with_name(CONTEXT_SYSTEM_DEFINED)
                .add_to_context(),
        ]);

        let files = self.assets.compile_job_run_assets(
            job,
            &system_vars,
            config.scheduled_at,
            &task_context,
        )?;

        let task = self.compile_configs(&job.task.config, &task_context)?;

        match config.executor.executor_type {
            ExecutorType::Task => Ok(ExecutorInput {
                configs: merge(task.configs, &system_vars),
                secrets: task.secrets,
                files,
            }),
            ExecutorType::Hook => {
                let hook = job.get_hook(&config.executor.name)?;
                let task_layer = prepare_context([ContextLayer::from_maps([
                    &task.configs,
                    &task.secrets,
                ])
                .with_name(CONTEXT_TASK)
                .with_key_prefix(TASK_CONFIG_PREFIX)]);
                let hook_context = merge_contexts(&task_context, task_layer);

                let compiled = self.compile_configs(&hook.config, &hook_context)?;
                Ok(ExecutorInput {
                    configs: merge(compiled.configs, &system_vars),
                    secrets: compiled.secrets,
                    files,
                })
            }
        }
    }

    fn compile_configs(
        &self,
        configs: &BTreeMap<String, String>,
        ctx: &TemplateContext,
    ) -> Result<CompiledConfigs> {
        let (plain, secret) = split_config_with_secrets(configs);
        Ok(CompiledConfigs {
            configs: self.engine.compile(&plain, ctx)?,
            secrets: self.engine.compile(&secret, ctx)?,
        })
    }
}

/// `DSTART`, `DEND`, `EXECUTION_TIME` and `JOB_DESTINATION` for a run.
pub fn system_defined_vars(
    job: &Job,
    scheduled_at: DateTime<Utc>,
    executed_at: DateTime<Utc>,
) -> Result<BTreeMap<String, String>> {
    let (start, end) = job.window.range(scheduled_at).map_err(|e| {
        let message = format!("failed to compute window for job {}: {}", job.name, e.message());
        e.with_context(Entity::Compiler, message)
    })?;
    Ok(BTreeMap::from([
        (CONFIG_KEY_DSTART.to_string(), rfc3339(start)),
        (CONFIG_KEY_DEND.to_string(), rfc3339(end)),
        (CONFIG_KEY_EXECUTION_TIME.to_string(), rfc3339(executed_at)),
        (CONFIG_KEY_DESTINATION.to_string(), job.destination.clone()),
    ]))
}

/// Partition configs into (plain, secret) by whether the value references
/// the secret context.
pub fn split_config_with_secrets(
    configs: &BTreeMap<String, String>,
) -> (BTreeMap<String, String>, BTreeMap<String, String>) {
    configs
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .partition(|(_, v)| !v.contains(SECRET_MARKER))
}

fn rfc3339(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn merge(mut base: BTreeMap<String, String>, extra: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    base.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    base
}

#[cfg(test)]
#[path = "input_tests.rs"]
mod tests;
