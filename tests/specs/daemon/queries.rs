//! Query specs against a running daemon
//!
//! Exercise the seeded tenant through the request surface without a
//! reachable scheduler.

use crate::prelude::*;

#[test]
fn replay_list_of_seeded_project_is_empty() {
    let temp = Project::empty();
    temp.skein().args(&["daemon", "start"]).passes();

    temp.skein()
        .args(&["replay", "list", "-p", "proj"])
        .passes()
        .stdout_eq("No replays found\n");
}

#[test]
fn replay_list_json_is_an_empty_array() {
    let temp = Project::empty();
    temp.skein().args(&["daemon", "start"]).passes();

    let out = temp
        .skein()
        .args(&["replay", "list", "-o", "json"])
        .env("SKEIN_PROJECT", "proj")
        .passes()
        .stdout();
    let replays: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(replays, serde_json::json!([]));
}

#[test]
fn replay_show_rejects_a_malformed_id() {
    let temp = Project::empty();
    temp.skein().args(&["daemon", "start"]).passes();

    temp.skein()
        .args(&["replay", "show", "not-a-uuid"])
        .fails()
        .stderr_has("invalid argument")
        .stderr_has("invalid replay id not-a-uuid");
}

#[test]
fn replay_show_of_unknown_id_is_not_found() {
    let temp = Project::empty();
    temp.skein().args(&["daemon", "start"]).passes();

    temp.skein()
        .args(&["replay", "show", "6f1c3a36-8f5b-4f0e-9a55-0a8b2f3f4e21"])
        .fails()
        .stderr_has("not found");
}

#[test]
fn runs_of_unknown_job_are_not_found() {
    let temp = Project::empty();
    temp.skein().args(&["daemon", "start"]).passes();

    temp.skein()
        .args(&["job", "runs", "missing-job", "-p", "proj"])
        .fails()
        .stderr_has("not found");
}

#[test]
fn replay_of_unknown_job_is_rejected() {
    let temp = Project::empty();

    temp.skein()
        .args(&[
            "replay", "create", "missing-job", "-p", "proj", "-n", "ns", "--start", "2023-01-01",
            "--end", "2023-01-02",
        ])
        .fails()
        .stderr_has("not found");
}

#[test]
fn status_shows_empty_counters() {
    let temp = Project::empty();
    temp.skein().args(&["daemon", "start"]).passes();

    temp.skein()
        .args(&["status"])
        .env("NO_COLOR", "1")
        .passes()
        .stdout_has("skeind: running")
        .stdout_has("Job events: 0 failure(s), 0 SLA miss(es)");
}

#[test]
fn status_without_daemon() {
    let temp = Project::empty();
    temp.skein()
        .args(&["status"])
        .passes()
        .stdout_eq("skein daemon not running\n");
}
