//! CLI argument error specs
//!
//! Bad arguments are rejected before any daemon is contacted.

use crate::prelude::*;

#[test]
fn unknown_subcommand_fails() {
    cli().args(&["frobnicate"]).fails().stderr_has("unrecognized subcommand");
}

#[test]
fn replay_create_requires_a_window() {
    cli()
        .args(&["replay", "create", "sample-job", "-p", "proj", "-n", "ns"])
        .fails()
        .stderr_has("--start");
}

#[test]
fn job_runs_rejects_a_half_open_range() {
    cli()
        .args(&["job", "runs", "sample-job", "-p", "proj", "--start", "2023-01-01"])
        .fails()
        .stderr_has("--end");
}

#[test]
fn malformed_time_is_rejected() {
    cli()
        .args(&[
            "replay", "create", "sample-job", "-p", "proj", "-n", "ns", "--start", "yesterday",
            "--end", "2023-01-02",
        ])
        .fails()
        .stderr_has("invalid value 'yesterday'");
}

#[test]
fn missing_project_names_the_environment_variable() {
    let temp = Project::empty();
    temp.skein().args(&["daemon", "start"]).passes();

    temp.skein()
        .args(&["replay", "list"])
        .fails()
        .stderr_has("SKEIN_PROJECT");
}
