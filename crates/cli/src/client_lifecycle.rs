// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon stop and diagnostic logging for the CLI client.

use std::path::PathBuf;

use chrono::Utc;

use crate::client::{timeout_exit, ClientError, DaemonClient};
use crate::daemon_process::{
    cleanup_stale_pid, daemon_dir, daemon_socket, force_kill_daemon, process_exists,
    read_daemon_pid, wait_for_exit,
};

/// Stop the daemon, gracefully first and then by force.
///
/// Returns `false` when no daemon was running. A graceful stop lets the
/// daemon write its final snapshot, so the kill only follows a timeout.
pub async fn daemon_stop() -> Result<bool, ClientError> {
    let client = match DaemonClient::connect() {
        Ok(c) => c,
        Err(ClientError::DaemonNotRunning) => {
            if let Ok(dir) = daemon_dir() {
                cleanup_stale_pid(&dir);
            }
            return Ok(false);
        }
        Err(e) => return Err(e),
    };

    let shutdown_result = client.shutdown().await;

    if let Some(pid) = read_daemon_pid()? {
        if shutdown_result.is_ok() {
            wait_for_exit(pid, timeout_exit()).await;
        }

        if process_exists(pid) {
            force_kill_daemon(pid);
            wait_for_exit(pid, timeout_exit()).await;
        }
    }

    if let Ok(dir) = daemon_dir() {
        cleanup_stale_pid(&dir);
    }

    Ok(true)
}

/// Append a diagnostic line to `<state dir>/cli.log`.
fn write_cli_log(message: String) {
    use std::io::Write;

    let log_path = daemon_dir()
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join("cli.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    else {
        return;
    };

    let cwd = std::env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "(unknown)".to_string());
    let state_dir = crate::env::state_dir_raw().unwrap_or_else(|| "(not set)".to_string());

    let _ = writeln!(
        file,
        "[ts={}] pid={} cwd={} SKEIN_STATE_DIR={} {}",
        Utc::now().to_rfc3339(),
        std::process::id(),
        cwd,
        state_dir,
        message
    );
}

/// Record a failed daemon connection in `cli.log`.
///
/// Scheduler hooks run the CLI without a terminal; the log is the only
/// place their connection failures show up.
pub fn log_connection_error(error: &ClientError) {
    let socket_path = daemon_socket()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "(unknown)".to_string());
    write_cli_log(format!("socket={} error={}", socket_path, error));
}
