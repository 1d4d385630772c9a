// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `skein job` - run inputs, run status and lifecycle events

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use skein_core::{ExecutorInput, JobRunId, JobRunStatus};

use crate::args::{parse_time, parse_values, TenantArgs};
use crate::client::DaemonClient;
use crate::output::{format_time, print_json, OutputFormat};
use crate::table::{Column, Table};

#[derive(Args, Debug)]
pub struct JobArgs {
    #[command(subcommand)]
    pub command: JobCommand,
}

#[derive(Subcommand, Debug)]
pub enum JobCommand {
    /// Compiled configs, secrets and files for one operator of a run
    Input {
        job: String,
        #[command(flatten)]
        tenant: TenantArgs,
        /// Scheduled time of the run
        #[arg(long, value_parser = parse_time)]
        scheduled_at: DateTime<Utc>,
        /// Operator name (the task, or a hook name)
        #[arg(long)]
        instance: String,
        /// Operator kind: task or hook
        #[arg(long = "type", default_value = "task")]
        instance_type: String,
        /// Run id the scheduler assigned, if known
        #[arg(long)]
        job_run_id: Option<String>,
        /// Include secret values in the output
        #[arg(long)]
        show_secrets: bool,
    },
    /// Run states of a job; without a range only the last run is shown
    Runs {
        job: String,
        #[command(flatten)]
        tenant: TenantArgs,
        #[arg(long, value_parser = parse_time, requires = "end")]
        start: Option<DateTime<Utc>>,
        #[arg(long, value_parser = parse_time, requires = "start")]
        end: Option<DateTime<Utc>>,
        /// Only runs in these states (repeatable)
        #[arg(long = "filter", value_name = "STATE")]
        filter: Vec<String>,
    },
    /// Record a scheduler lifecycle event (job_success, task_fail, sla_miss, ...)
    Event {
        job: String,
        event_type: String,
        #[command(flatten)]
        tenant: TenantArgs,
        /// Event payload as a JSON object
        #[arg(long, default_value = "{}")]
        values: String,
    },
}

pub async fn handle(command: JobCommand, client: &DaemonClient, format: OutputFormat) -> Result<()> {
    match command {
        JobCommand::Input {
            job,
            tenant,
            scheduled_at,
            instance,
            instance_type,
            job_run_id,
            show_secrets,
        } => {
            let job_run_id = job_run_id
                .as_deref()
                .map(JobRunId::parse)
                .transpose()
                .map_err(|e| anyhow!("invalid job run id: {}", e))?;
            let input = client
                .job_run_input(
                    &tenant.project()?,
                    &job,
                    scheduled_at,
                    &instance,
                    &instance_type,
                    job_run_id,
                )
                .await?;
            print_input(&input, show_secrets, format)
        }

        JobCommand::Runs {
            job,
            tenant,
            start,
            end,
            filter,
        } => {
            let range = start.zip(end);
            let runs = client
                .job_runs(&tenant.project()?, &job, range, filter)
                .await?;
            print_runs(&runs, format)
        }

        JobCommand::Event {
            job,
            event_type,
            tenant,
            values,
        } => {
            let values = parse_values(&values)?;
            client
                .register_job_event(
                    &tenant.project()?,
                    &tenant.namespace()?,
                    &job,
                    &event_type,
                    values,
                )
                .await?;
            match format {
                OutputFormat::Text => {
                    println!("Registered {} for {}", event_type, job);
                    Ok(())
                }
                OutputFormat::Json => print_json(&serde_json::json!({
                    "job": job,
                    "event_type": event_type,
                    "registered": true,
                })),
            }
        }
    }
}

/// Secrets are masked unless asked for; the input is often pasted into
/// tickets.
fn masked(input: &ExecutorInput, show_secrets: bool) -> ExecutorInput {
    if show_secrets {
        return input.clone();
    }
    ExecutorInput {
        configs: input.configs.clone(),
        secrets: input
            .secrets
            .keys()
            .map(|k| (k.clone(), "****".to_string()))
            .collect(),
        files: input.files.clone(),
    }
}

fn print_input(input: &ExecutorInput, show_secrets: bool, format: OutputFormat) -> Result<()> {
    let input = masked(input, show_secrets);
    match format {
        OutputFormat::Json => print_json(&input),
        OutputFormat::Text => {
            let mut table = Table::new(vec![
                Column::muted("KIND"),
                Column::left("KEY"),
                Column::left("VALUE").with_max(80),
            ]);
            for (kind, map) in [("config", &input.configs), ("secret", &input.secrets)] {
                for (key, value) in map {
                    table.row(vec![kind.to_string(), key.clone(), value.clone()]);
                }
            }
            for (name, content) in &input.files {
                let summary = format!("{} line(s)", content.lines().count());
                table.row(vec!["file".to_string(), name.clone(), summary]);
            }
            if table.is_empty() {
                println!("Executor input is empty");
            }
            table.print();
            Ok(())
        }
    }
}

fn print_runs(runs: &[JobRunStatus], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(runs),
        OutputFormat::Text => {
            if runs.is_empty() {
                println!("No runs found");
                return Ok(());
            }
            let mut table = Table::new(vec![Column::left("SCHEDULED AT"), Column::state("STATE")]);
            for run in runs {
                table.row(vec![format_time(&run.scheduled_at), run.state.to_string()]);
            }
            table.print();
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
