// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `skein replay` - re-run a historical window of a job

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use skein_core::{ReplayConfig, ReplayWithRun};

use crate::args::{parse_key_value, parse_time, TenantArgs};
use crate::client::DaemonClient;
use crate::color;
use crate::output::{format_time, print_json, OutputFormat};
use crate::table::{Column, Table};

#[derive(Args, Debug)]
pub struct ReplayArgs {
    #[command(subcommand)]
    pub command: ReplayCommand,
}

#[derive(Subcommand, Debug)]
pub enum ReplayCommand {
    /// Request a replay of the runs scheduled in [start, end]
    Create {
        job: String,
        #[command(flatten)]
        tenant: TenantArgs,
        #[arg(long, value_parser = parse_time)]
        start: DateTime<Utc>,
        #[arg(long, value_parser = parse_time)]
        end: DateTime<Utc>,
        /// Clear all runs at once instead of one after another
        #[arg(long)]
        parallel: bool,
        #[arg(long, default_value = "")]
        description: String,
        /// Task config override for replayed runs (KEY=VALUE, repeatable)
        #[arg(long = "config", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        config: Vec<(String, String)>,
    },
    /// Replays of a project, newest first
    List {
        #[command(flatten)]
        tenant: TenantArgs,
    },
    /// One replay with the state of each run in its window
    Show { id: String },
}

pub async fn handle(
    command: ReplayCommand,
    client: &DaemonClient,
    format: OutputFormat,
) -> Result<()> {
    match command {
        ReplayCommand::Create {
            job,
            tenant,
            start,
            end,
            parallel,
            description,
            config,
        } => {
            let job_config: BTreeMap<String, String> = config.into_iter().collect();
            let replay_config = ReplayConfig::new(start, end, parallel, job_config, description);
            let id = client
                .create_replay(&tenant.project()?, &tenant.namespace()?, &job, replay_config)
                .await?;
            match format {
                OutputFormat::Text => {
                    println!("Replay {} created for {}", id, job);
                    Ok(())
                }
                OutputFormat::Json => print_json(&serde_json::json!({ "id": id })),
            }
        }

        ReplayCommand::List { tenant } => {
            let replays = client.list_replays(&tenant.project()?).await?;
            match format {
                OutputFormat::Json => print_json(&replays),
                OutputFormat::Text => {
                    if replays.is_empty() {
                        println!("No replays found");
                        return Ok(());
                    }
                    replay_table(&replays).print();
                    Ok(())
                }
            }
        }

        ReplayCommand::Show { id } => {
            let replay = client.get_replay(&id).await?;
            match format {
                OutputFormat::Json => print_json(&replay),
                OutputFormat::Text => {
                    print_replay(&replay);
                    Ok(())
                }
            }
        }
    }
}

fn replay_table(replays: &[ReplayWithRun]) -> Table {
    let mut table = Table::new(vec![
        Column::muted("ID"),
        Column::left("JOB"),
        Column::left("START"),
        Column::left("END"),
        Column::state("STATE"),
        Column::right("RUNS"),
        Column::left("DESCRIPTION").with_max(40),
    ]);
    for r in replays {
        let replay = &r.replay;
        table.row(vec![
            replay.id.to_string(),
            replay.job_name.to_string(),
            format_time(&replay.config.start_time),
            format_time(&replay.config.end_time),
            replay.state.to_string(),
            r.runs.len().to_string(),
            replay.config.description.clone(),
        ]);
    }
    table
}

fn print_replay(r: &ReplayWithRun) {
    let replay = &r.replay;
    println!("{} {}", color::header("Replay:"), replay.id);
    println!("Job: {} ({})", replay.job_name, replay.tenant);
    println!(
        "Window: {} .. {}",
        format_time(&replay.config.start_time),
        format_time(&replay.config.end_time)
    );
    println!("State: {}", color::state(replay.state.as_str()));
    if !replay.message.is_empty() {
        println!("Message: {}", replay.message);
    }
    if !replay.config.description.is_empty() {
        println!("Description: {}", replay.config.description);
    }
    println!("Parallel: {}", replay.config.parallel);
    println!("Created: {}", format_time(&replay.created_at));
    for (key, value) in &replay.config.job_config {
        println!("Config: {}={}", key, value);
    }

    if r.runs.is_empty() {
        return;
    }
    println!();
    let mut table = Table::new(vec![Column::left("SCHEDULED AT"), Column::state("STATE")]);
    for run in &r.runs {
        table.row(vec![format_time(&run.scheduled_at), run.state.to_string()]);
    }
    table.print();
}

#[cfg(test)]
#[path = "replay_tests.rs"]
mod tests;
