//! CLI help output specs
//!
//! Verify help text displays for all commands.

use crate::prelude::*;

#[test]
fn skein_no_args_shows_usage_and_exits_zero() {
    cli().passes().stdout_has("Usage:");
}

#[test]
fn skein_help_lists_commands() {
    cli()
        .args(&["--help"])
        .passes()
        .stdout_has("deploy")
        .stdout_has("job")
        .stdout_has("replay")
        .stdout_has("daemon")
        .stdout_has("status");
}

#[test]
fn skein_daemon_help_shows_subcommands() {
    cli()
        .args(&["daemon", "--help"])
        .passes()
        .stdout_has("start")
        .stdout_has("stop")
        .stdout_has("status")
        .stdout_has("logs");
}

#[test]
fn skein_job_help_shows_subcommands() {
    cli()
        .args(&["job", "--help"])
        .passes()
        .stdout_has("input")
        .stdout_has("runs")
        .stdout_has("event");
}

#[test]
fn skein_replay_help_shows_subcommands() {
    cli()
        .args(&["replay", "--help"])
        .passes()
        .stdout_has("create")
        .stdout_has("list")
        .stdout_has("show");
}

#[test]
fn skein_version_shows_version() {
    cli()
        .args(&["--version"])
        .passes()
        .stdout_has(env!("CARGO_PKG_VERSION"));
}
