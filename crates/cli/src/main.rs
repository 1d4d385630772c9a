// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! skein - job-run orchestration CLI

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod args;
mod client;
mod client_lifecycle;
mod color;
mod commands;
mod daemon_process;
mod env;
mod output;
mod table;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use commands::{daemon, deploy, job, replay, status};
use output::OutputFormat;

use crate::client::DaemonClient;

#[derive(Parser)]
#[command(
    name = "skein",
    version,
    about = "skein - deploy data-pipeline jobs, track their runs and replay history"
)]
struct Cli {
    /// Output format
    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value_t,
        global = true
    )]
    output: OutputFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a project's jobs to the scheduler
    Deploy(deploy::DeployArgs),
    /// Job run inputs, run states and lifecycle events
    Job(job::JobArgs),
    /// Replay a historical window of a job
    Replay(replay::ReplayArgs),
    /// Daemon management
    Daemon(daemon::DaemonArgs),
    /// Daemon counters: run events, SLA misses, notifier pushes
    Status,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let msg = format_error(&e);
        if !msg.is_empty() {
            eprintln!("Error: {}", msg);
        }
        std::process::exit(1);
    }
}

/// Format an anyhow error, deduplicating the chain.
///
/// thiserror variants that embed their source (`#[error("... {0}")]`)
/// would otherwise print the same text twice.
fn format_error(err: &anyhow::Error) -> String {
    let top = err.to_string();

    let chain_redundant = err
        .chain()
        .skip(1)
        .all(|cause| top.contains(&cause.to_string()));

    if chain_redundant {
        return top;
    }

    let mut buf = top;
    for (i, cause) in err.chain().skip(1).enumerate() {
        buf.push_str(&format!("\n\nCaused by:\n    {}: {}", i, cause));
    }
    buf
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = cli.output;

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    // Client semantics:
    // - Action commands: auto-start daemon, max 1 restart (mutations)
    // - Query commands: connect only, no restart (reads of existing state)
    match command {
        Commands::Daemon(args) => daemon::daemon(args, format).await?,

        Commands::Deploy(args) => {
            let client = DaemonClient::for_action()?;
            deploy::handle(args, &client, format).await?
        }

        Commands::Job(args) => {
            let client = match &args.command {
                job::JobCommand::Event { .. } => DaemonClient::for_action()?,
                job::JobCommand::Input { .. } | job::JobCommand::Runs { .. } => {
                    DaemonClient::for_query()?
                }
            };
            job::handle(args.command, &client, format).await?
        }

        Commands::Replay(args) => {
            let client = match &args.command {
                replay::ReplayCommand::Create { .. } => DaemonClient::for_action()?,
                replay::ReplayCommand::List { .. } | replay::ReplayCommand::Show { .. } => {
                    DaemonClient::for_query()?
                }
            };
            replay::handle(args.command, &client, format).await?
        }

        Commands::Status => status::handle(format).await?,
    }

    Ok(())
}

#[cfg(test)]
fn parse_from<I, T>(argv: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(argv)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
