// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `skein daemon` - Daemon management commands

use std::process::Command;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};

use crate::client::DaemonClient;
use crate::client_lifecycle::daemon_stop;
use crate::daemon_process::{daemon_dir, find_daemon_binary};
use crate::output::{format_uptime, print_json, OutputFormat};

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon (background unless --foreground)
    Start {
        /// Run in the foreground (useful for debugging)
        #[arg(long)]
        foreground: bool,
    },
    /// Stop the daemon, saving a final snapshot
    Stop,
    /// Stop and restart the daemon
    Restart,
    /// Check daemon status
    Status,
    /// View daemon logs
    Logs {
        /// Number of recent lines to show
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

pub async fn daemon(args: DaemonArgs, format: OutputFormat) -> Result<()> {
    match args.command {
        DaemonCommand::Start { foreground } => start(foreground).await,
        DaemonCommand::Stop => stop().await,
        DaemonCommand::Restart => restart().await,
        DaemonCommand::Status => status(format).await,
        DaemonCommand::Logs { limit } => logs(limit, format),
    }
}

async fn start(foreground: bool) -> Result<()> {
    if foreground {
        let status = Command::new(find_daemon_binary()).status()?;
        if !status.success() {
            return Err(anyhow!("Daemon exited with status: {}", status));
        }
        return Ok(());
    }

    if let Ok(client) = DaemonClient::connect() {
        if let Ok((uptime, _)) = client.status().await {
            println!("Daemon already running (uptime: {})", format_uptime(uptime));
            return Ok(());
        }
    }

    DaemonClient::connect_or_start()?;
    println!("Daemon started");
    Ok(())
}

async fn stop() -> Result<()> {
    match daemon_stop().await {
        Ok(true) => println!("Daemon stopped"),
        Ok(false) => println!("Daemon not running"),
        Err(e) => return Err(anyhow!("Failed to stop daemon: {}", e)),
    }
    Ok(())
}

async fn restart() -> Result<()> {
    let was_running = daemon_stop()
        .await
        .map_err(|e| anyhow!("Failed to stop daemon: {}", e))?;

    if was_running {
        // Grace period for the OS to release the socket
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    DaemonClient::connect_or_start()?;
    println!("Daemon restarted");
    Ok(())
}

async fn status(format: OutputFormat) -> Result<()> {
    let not_running = || match format {
        OutputFormat::Text => {
            println!("Daemon not running");
            Ok(())
        }
        OutputFormat::Json => print_json(&serde_json::json!({ "status": "not_running" })),
    };

    let client = match DaemonClient::connect() {
        Ok(c) => c,
        Err(_) => return not_running(),
    };

    let (uptime, _) = match client.status().await {
        Ok(result) => result,
        Err(e) if e.is_not_running() => return not_running(),
        Err(e) => return Err(e.into()),
    };
    let version = client
        .hello()
        .await
        .unwrap_or_else(|_| "unknown".to_string());

    match format {
        OutputFormat::Text => {
            println!("Status: running");
            println!("Version: {}", version);
            println!("Uptime: {}", format_uptime(uptime));
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "status": "running",
            "version": version,
            "uptime_secs": uptime,
            "uptime": format_uptime(uptime),
        }))?,
    }
    Ok(())
}

fn logs(limit: usize, format: OutputFormat) -> Result<()> {
    let log_path = daemon_dir()?.join("daemon.log");

    let content = if log_path.exists() {
        std::fs::read_to_string(&log_path)?
    } else {
        String::new()
    };
    let lines = read_last_lines(&content, limit);

    match format {
        OutputFormat::Text if !log_path.exists() => {
            println!("No log file found at {}", log_path.display());
        }
        OutputFormat::Text => {
            for line in lines {
                println!("{}", line);
            }
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "log_path": log_path.to_string_lossy(),
            "lines": lines,
        }))?,
    }
    Ok(())
}

fn read_last_lines(content: &str, n: usize) -> Vec<&str> {
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].to_vec()
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
