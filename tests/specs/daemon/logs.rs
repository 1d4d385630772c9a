//! Daemon log specs

use crate::prelude::*;

#[test]
fn daemon_logs_without_log_file() {
    let temp = Project::empty();
    temp.skein()
        .args(&["daemon", "logs"])
        .passes()
        .stdout_has("No log file found");
}

#[test]
fn daemon_logs_show_startup_marker() {
    let temp = Project::empty();
    temp.skein().args(&["daemon", "start"]).passes();

    let found = wait_for(SPEC_WAIT_MAX_MS, || {
        temp.daemon_log().contains("--- skeind: starting (pid: ")
    });
    assert!(found, "daemon log: {}", temp.daemon_log());

    temp.skein()
        .args(&["daemon", "logs", "-n", "200"])
        .passes()
        .stdout_has("skeind: starting");
}
