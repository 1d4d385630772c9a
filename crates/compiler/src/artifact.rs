// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler artifact compiler.
//!
//! Renders one Airflow DAG file per job from an embedded template. Every
//! value the template prints is computed here into [`DagTemplateData`], so
//! the template itself only loops and substitutes.

use crate::plugin::{HookType, PluginRepo};
use crate::template::{display_name, TemplateEngine};
use serde::Serialize;
use skein_core::{Entity, Error, ErrorKind, JobWithDetails, Result};
use std::sync::Arc;

/// Embedded DAG template
pub const DAG_TEMPLATE: &str = include_str!("../resources/base_dag.py.hbs");
/// Shared python library written next to the DAGs on bootstrap
pub const DAG_LIB: &str = include_str!("../resources/__lib.py");
/// File name of [`DAG_LIB`] in the bucket
pub const DAG_LIB_FILE: &str = "__lib.py";

const TEMPLATE_NAME: &str = "dag";
const SENSOR_TASK_ID_MAX: usize = 200;
const SCHEDULED_AT_MACRO: &str = "{{ next_execution_date }}";
const INIT_CONTAINER_IMAGE: &str = "skein/skein-init:latest";

#[derive(Debug, Clone, Serialize)]
struct OperatorData {
    name: String,
    display_name: String,
    image: String,
    shell: String,
    script: String,
    is_fail_hook: bool,
}

#[derive(Debug, Clone, Serialize)]
struct SensorData {
    display_name: String,
    task_id: String,
    host: String,
    project: String,
    namespace: String,
    job_name: String,
}

#[derive(Debug, Clone, Serialize)]
struct ResourceEntry {
    key: &'static str,
    value: String,
}

#[derive(Debug, Clone, Default, Serialize)]
struct ResourceData {
    requests: Vec<ResourceEntry>,
    limits: Vec<ResourceEntry>,
}

/// Precomputed values for one DAG render
#[derive(Debug, Clone, Serialize)]
pub struct DagTemplateData {
    version: String,
    hostname: String,
    project: String,
    namespace: String,
    job_name: String,
    owner: String,
    description: String,
    depends_on_past: &'static str,
    retries: String,
    retry_delay: String,
    exponential_backoff: &'static str,
    priority: i32,
    start_date: String,
    end_date: Option<String>,
    sla_seconds: i64,
    schedule_interval: String,
    catchup: &'static str,
    labels: String,
    resources: Option<ResourceData>,
    init_container_image: &'static str,
    scheduled_at_macro: &'static str,
    window_size: String,
    window_version: u8,
    task: OperatorData,
    hooks: Vec<OperatorData>,
    sensors: Vec<SensorData>,
    pre_hook_arrows: Vec<String>,
    post_chain: Option<String>,
    hook_arrows: Vec<String>,
}

/// Compiles jobs into DAG files
#[derive(Clone)]
pub struct DagCompiler {
    hostname: String,
    plugins: Arc<PluginRepo>,
    engine: TemplateEngine,
}

impl DagCompiler {
    pub fn new(hostname: impl Into<String>, plugins: Arc<PluginRepo>) -> Result<Self> {
        let mut engine = TemplateEngine::new();
        engine
            .registry_mut()
            .register_template_string(TEMPLATE_NAME, DAG_TEMPLATE)
            .map_err(|e| Error::internal_from(Entity::Compiler, "unable to parse scheduler dag template", e))?;
        Ok(Self {
            hostname: hostname.into(),
            plugins,
            engine,
        })
    }

    /// Render the DAG file for `job`.
    pub fn compile(&self, job: &JobWithDetails) -> Result<String> {
        let data = self.template_data(job)?;
        self.engine
            .registry()
            .render(TEMPLATE_NAME, &data)
            .map_err(|e| {
                Error::internal_from(
                    Entity::Compiler,
                    format!("unable to compile template for job {}", job.name),
                    e,
                )
            })
    }

    pub fn template_data(&self, job: &JobWithDetails) -> Result<DagTemplateData> {
        let task_plugin = self.plugins.get_by_name(&job.job.task.name)?;
        let task_name = task_plugin.info.name.clone();
        let task = OperatorData {
            display_name: display_name(&task_name),
            name: task_name,
            image: task_plugin.info.image.clone(),
            shell: task_plugin.info.entrypoint.shell.clone(),
            script: task_plugin.info.entrypoint.script.clone(),
            is_fail_hook: false,
        };

        let mut hooks = Vec::with_capacity(job.job.hooks.len());
        let mut pre = Vec::new();
        let mut post = Vec::new();
        let mut fail = Vec::new();
        let mut hook_arrows = Vec::new();
        for hook in &job.job.hooks {
            let plugin = self.plugins.get_by_name(&hook.name).map_err(|e| {
                if e.is(ErrorKind::NotFound) {
                    Error::not_found(Entity::Compiler, format!("hook not found for name {}", hook.name))
                } else {
                    e
                }
            })?;
            let hook_type = plugin.info.hook_type.unwrap_or(HookType::Post);
            let var = format!("hook_{}", display_name(&hook.name));
            match hook_type {
                HookType::Pre => pre.push(var.clone()),
                HookType::Post => post.push(var.clone()),
                HookType::Fail => fail.push(var.clone()),
            }

            let mut deps: Vec<&str> = plugin.info.depends_on.iter().map(String::as_str).collect();
            for dep in &hook.depends_on {
                if !deps.contains(&dep.as_str()) {
                    deps.push(dep);
                }
            }
            for dep in deps {
                if job.job.hooks.iter().any(|h| h.name == dep) {
                    hook_arrows.push(format!("hook_{} >> {var}", display_name(dep)));
                }
            }

            hooks.push(OperatorData {
                name: hook.name.clone(),
                display_name: display_name(&hook.name),
                image: plugin.info.image.clone(),
                shell: plugin.info.entrypoint.shell.clone(),
                script: plugin.info.entrypoint.script.clone(),
                is_fail_hook: hook_type == HookType::Fail,
            });
        }

        let transformation = format!("transformation_{}", task.display_name);
        let pre_hook_arrows = pre.iter().map(|h| format!("{h} >> {transformation}")).collect();
        let post_chain = match (post.is_empty(), fail.is_empty()) {
            (true, true) => None,
            (false, true) => Some(format!("{transformation} >> [{}]", hook_list(&post))),
            (true, false) => Some(format!("{transformation} >> [{}]", hook_list(&fail))),
            (false, false) => Some(format!(
                "{transformation} >> [{}] >> [{}]",
                hook_list(&post),
                hook_list(&fail)
            )),
        };

        let sensors = job
            .upstreams
            .resolved()
            .map(|up| {
                let host = if up.host.is_empty() { self.hostname.clone() } else { up.host.clone() };
                SensorData {
                    display_name: display_name(&up.job_name),
                    task_id: format!(
                        "wait_{}-{}",
                        truncate(&up.job_name, SENSOR_TASK_ID_MAX),
                        up.task_name
                    ),
                    host,
                    project: up.tenant.project_name().to_string(),
                    namespace: up
                        .tenant
                        .namespace_name()
                        .map(|ns| ns.to_string())
                        .unwrap_or_default(),
                    job_name: up.job_name.clone(),
                }
            })
            .collect();

        let tenant = job.tenant();
        let retry = &job.retry;
        let schedule = &job.schedule;
        Ok(DagTemplateData {
            version: env!("CARGO_PKG_VERSION").to_string(),
            hostname: self.hostname.clone(),
            project: tenant.project_name().to_string(),
            namespace: tenant
                .namespace_name()
                .map(|ns| ns.to_string())
                .unwrap_or_default(),
            job_name: job.name.to_string(),
            owner: job.metadata.owner.clone(),
            description: job.metadata.description.clone(),
            depends_on_past: py_bool(schedule.depends_on_past),
            retries: if retry.count > 0 { retry.count.to_string() } else { "DAG_RETRIES".to_string() },
            retry_delay: if retry.delay > 0 {
                retry.delay.to_string()
            } else {
                "DAG_RETRY_DELAY".to_string()
            },
            exponential_backoff: py_bool(retry.exponential_backoff),
            priority: job.priority,
            start_date: schedule.start_date.format("%Y-%m-%dT%H:%M:%S").to_string(),
            end_date: schedule
                .end_date
                .map(|d| d.format("%Y-%m-%dT%H:%M:%S").to_string()),
            sla_seconds: job.sla_duration()?,
            schedule_interval: if schedule.interval.is_empty() {
                "None".to_string()
            } else {
                format!("{:?}", schedule.interval)
            },
            catchup: py_bool(schedule.catch_up),
            labels: job.labels_as_string(),
            resources: resource_data(job),
            init_container_image: INIT_CONTAINER_IMAGE,
            scheduled_at_macro: SCHEDULED_AT_MACRO,
            window_size: job.job.window.size.clone(),
            window_version: job.job.window.version,
            task,
            hooks,
            sensors,
            pre_hook_arrows,
            post_chain,
            hook_arrows,
        })
    }
}

fn resource_data(job: &JobWithDetails) -> Option<ResourceData> {
    let resource = job.runtime_config.resource.as_ref()?;
    let entries = |cfg: &skein_core::job::ResourceConfig| {
        let mut out = Vec::new();
        if !cfg.memory.is_empty() {
            out.push(ResourceEntry { key: "memory", value: cfg.memory.clone() });
        }
        if !cfg.cpu.is_empty() {
            out.push(ResourceEntry { key: "cpu", value: cfg.cpu.clone() });
        }
        out
    };
    let data = ResourceData {
        requests: entries(&resource.request),
        limits: entries(&resource.limit),
    };
    if data.requests.is_empty() && data.limits.is_empty() {
        return None;
    }
    Some(data)
}

fn hook_list(hooks: &[String]) -> String {
    hooks.iter().map(|h| format!("{h},")).collect::<Vec<_>>().join(" ")
}

fn py_bool(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
#[path = "artifact_tests.rs"]
mod tests;
