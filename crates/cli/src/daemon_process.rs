// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon process management utilities.
//!
//! Starting, stopping, and probing the `skeind` process that owns the
//! state directory.

use crate::client::{poll_interval, timeout_exit, ClientError};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

const DAEMON_BINARY: &str = "skeind";

/// Startup marker prefix the daemon appends to its log before anything else.
const STARTUP_MARKER_PREFIX: &str = "--- skeind: starting (pid: ";

/// Start the daemon in the background, returning the child process handle
pub fn start_daemon_background() -> Result<Child, ClientError> {
    let path = find_daemon_binary();

    Command::new(&path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| ClientError::DaemonStartFailed(format!("{}: {}", path.display(), e)))
}

/// Stop the daemon synchronously using SIGTERM + polling.
///
/// Used for the version-mismatch restart, which runs before any request is
/// sent and so cannot go through the socket.
pub fn stop_daemon_sync() {
    if let Ok(Some(pid)) = read_daemon_pid() {
        kill_signal("-15", pid);
        if !wait_for_exit_sync(pid, timeout_exit()) {
            force_kill_daemon(pid);
            wait_for_exit_sync(pid, timeout_exit());
        }
    }

    if let Ok(dir) = daemon_dir() {
        cleanup_stale_pid(&dir);
    }
}

fn wait_for_exit_sync(pid: u32, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if !process_exists(pid) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    !process_exists(pid)
}

/// Wait for a process to exit
pub async fn wait_for_exit(pid: u32, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if !process_exists(pid) {
            return true;
        }
        tokio::time::sleep(poll_interval()).await;
    }
    false
}

/// Locate `skeind`: env override, then the workspace debug build (only when
/// the CLI itself is a debug build), then a sibling of the current
/// executable, then `$PATH`.
pub fn find_daemon_binary() -> PathBuf {
    if let Some(path) = crate::env::daemon_binary() {
        return PathBuf::from(path);
    }

    let current_exe = std::env::current_exe().ok();

    let is_debug_build = current_exe
        .as_ref()
        .and_then(|p| p.to_str())
        .is_some_and(|s| s.contains("target/debug"));

    if is_debug_build {
        if let Some(manifest_dir) = crate::env::cargo_manifest_dir() {
            let dev_path = PathBuf::from(manifest_dir)
                .parent()
                .and_then(|p| p.parent())
                .map(|p| p.join("target/debug").join(DAEMON_BINARY));
            if let Some(path) = dev_path.filter(|p| p.exists()) {
                return path;
            }
        }
    }

    if let Some(dir) = current_exe.as_deref().and_then(Path::parent) {
        let sibling = dir.join(DAEMON_BINARY);
        if sibling.exists() {
            return sibling;
        }
    }

    PathBuf::from(DAEMON_BINARY)
}

/// Socket path of the daemon.
pub fn daemon_socket() -> Result<PathBuf, ClientError> {
    Ok(daemon_dir()?.join("daemon.sock"))
}

/// State directory shared with the daemon.
pub fn daemon_dir() -> Result<PathBuf, ClientError> {
    crate::env::state_dir()
}

/// Remove an orphaned PID file.
pub fn cleanup_stale_pid(dir: &Path) {
    let pid_path = dir.join("daemon.pid");
    if pid_path.exists() {
        let _ = std::fs::remove_file(&pid_path);
    }
}

/// PID from the daemon PID file, if one exists and parses
pub fn read_daemon_pid() -> Result<Option<u32>, ClientError> {
    let pid_path = daemon_dir()?.join("daemon.pid");

    match std::fs::read_to_string(&pid_path) {
        Ok(content) => Ok(content.trim().parse::<u32>().ok()),
        Err(_) => Ok(None),
    }
}

/// Version the running daemon recorded at startup
pub fn read_daemon_version() -> Option<String> {
    let path = daemon_dir().ok()?.join("daemon.version");
    std::fs::read_to_string(path)
        .ok()
        .map(|v| v.trim().to_string())
}

fn kill_signal(signal: &str, pid: u32) -> bool {
    Command::new("kill")
        .args([signal, &pid.to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn process_exists(pid: u32) -> bool {
    kill_signal("-0", pid)
}

pub fn force_kill_daemon(pid: u32) -> bool {
    kill_signal("-9", pid)
}

/// Errors the daemon logged since its most recent startup marker.
pub fn read_startup_error() -> Option<String> {
    let log_path = daemon_dir().ok()?.join("daemon.log");
    let content = std::fs::read_to_string(log_path).ok()?;
    parse_startup_error(&content)
}

/// Extract startup errors from log content.
///
/// Only lines after the last marker count. The synchronous error line and
/// the tracing line carry the same message, so repeats are dropped.
fn parse_startup_error(content: &str) -> Option<String> {
    let start_pos = content.rfind(STARTUP_MARKER_PREFIX)?;
    let startup_log = &content[start_pos..];

    let mut messages: Vec<&str> = Vec::new();
    for line in startup_log
        .lines()
        .filter(|line| line.contains(" ERROR ") || line.contains("Failed to start"))
    {
        let message = line
            .find("Failed to start daemon: ")
            .map(|at| &line[at + "Failed to start daemon: ".len()..])
            .or_else(|| line.split_once(": ").map(|(_, msg)| msg))
            .unwrap_or(line);
        if !messages.contains(&message) {
            messages.push(message);
        }
    }

    if messages.is_empty() {
        None
    } else {
        Some(messages.join("\n"))
    }
}

/// Replace a connection error with the daemon's own startup error, when the
/// log has one.
pub fn wrap_with_startup_error(err: ClientError) -> ClientError {
    if matches!(err, ClientError::DaemonStartFailed(_)) {
        return err;
    }

    match read_startup_error() {
        Some(startup_error) => ClientError::DaemonStartFailed(startup_error),
        None => err,
    }
}

/// Whether a Unix socket is accepting connections.
pub fn probe_socket(socket_path: &Path) -> bool {
    std::os::unix::net::UnixStream::connect(socket_path).is_ok()
}

/// Remove socket and PID files left behind by a dead daemon.
///
/// A live PID keeps its files; the socket may just not be bound yet.
pub fn cleanup_stale_socket() -> Result<(), ClientError> {
    let dir = daemon_dir()?;
    let socket_path = dir.join("daemon.sock");
    let pid_path = dir.join("daemon.pid");

    if let Some(pid) = read_daemon_pid()? {
        if process_exists(pid) {
            return Ok(());
        }
    }

    let _ = std::fs::remove_file(&socket_path);
    let _ = std::fs::remove_file(&pid_path);
    Ok(())
}

#[cfg(test)]
#[path = "daemon_process_tests.rs"]
mod tests;
