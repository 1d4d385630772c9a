//! Daemon lifecycle specs
//!
//! Verify daemon start/stop/status lifecycle and crash recovery.

use crate::prelude::*;

#[test]
fn daemon_status_fails_gracefully_when_not_running() {
    let temp = Project::empty();
    temp.skein()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("Daemon not running");
}

#[test]
fn daemon_start_reports_success() {
    let temp = Project::empty();
    temp.skein()
        .args(&["daemon", "start"])
        .passes()
        .stdout_has("Daemon started");
}

#[test]
fn daemon_status_shows_running_after_start() {
    let temp = Project::empty();
    temp.skein().args(&["daemon", "start"]).passes();

    temp.skein()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("Status: running")
        .stdout_has(&format!("Version: {}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn daemon_start_twice_reports_already_running() {
    let temp = Project::empty();
    temp.skein().args(&["daemon", "start"]).passes();

    temp.skein()
        .args(&["daemon", "start"])
        .passes()
        .stdout_has("Daemon already running");
}

#[test]
fn daemon_stop_reports_success() {
    let temp = Project::empty();
    temp.skein().args(&["daemon", "start"]).passes();

    temp.skein()
        .args(&["daemon", "stop"])
        .passes()
        .stdout_has("Daemon stopped");

    temp.skein()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("Daemon not running");
}

#[test]
fn daemon_stop_when_not_running_is_a_no_op() {
    let temp = Project::empty();
    temp.skein()
        .args(&["daemon", "stop"])
        .passes()
        .stdout_has("Daemon not running");
}

#[test]
fn daemon_status_json_reports_uptime() {
    let temp = Project::empty();
    temp.skein().args(&["daemon", "start"]).passes();

    let out = temp
        .skein()
        .args(&["daemon", "status", "-o", "json"])
        .passes()
        .stdout();
    let status: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(status["status"], "running");
    assert!(status["uptime_secs"].is_u64());
}

#[test]
fn daemon_without_app_key_fails_to_start() {
    let temp = Project::empty();
    temp.file("config.toml", "[replay]\nnum_workers = 2\n");

    temp.skein()
        .args(&["daemon", "start"])
        .fails()
        .stderr_has("app key is not configured");
}

#[test]
fn daemon_restarts_after_crash() {
    let temp = Project::empty();
    temp.skein().args(&["daemon", "start"]).passes();

    assert!(temp.daemon_kill(), "daemon should be killed");
    let stopped = wait_for(SPEC_WAIT_MAX_MS, || {
        temp.skein()
            .args(&["daemon", "status"])
            .passes()
            .stdout()
            .contains("Daemon not running")
    });
    assert!(stopped, "daemon should be reported as stopped after kill");

    temp.skein()
        .args(&["daemon", "start"])
        .passes()
        .stdout_has("Daemon started");
    temp.skein()
        .args(&["replay", "list", "-p", "proj"])
        .passes()
        .stdout_has("No replays found");
}
