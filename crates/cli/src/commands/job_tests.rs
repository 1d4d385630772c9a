// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{parse_from, Commands};
use std::collections::BTreeMap;

fn job_command(args: &[&str]) -> JobCommand {
    let argv = ["skein", "job"].iter().chain(args).copied();
    match parse_from(argv).unwrap().command {
        Some(Commands::Job(JobArgs { command })) => command,
        _ => panic!("expected a job command"),
    }
}

#[test]
fn input_defaults_to_task_operators() {
    let command = job_command(&[
        "input",
        "sample-job",
        "--project",
        "proj",
        "--scheduled-at",
        "2023-01-01T12:00:00Z",
        "--instance",
        "bq2bq",
    ]);

    let JobCommand::Input {
        job,
        tenant,
        scheduled_at,
        instance_type,
        show_secrets,
        ..
    } = command
    else {
        panic!("expected input");
    };
    assert_eq!(job, "sample-job");
    assert_eq!(tenant.project.as_deref(), Some("proj"));
    assert_eq!(scheduled_at, "2023-01-01T12:00:00Z".parse::<DateTime<Utc>>().unwrap());
    assert_eq!(instance_type, "task");
    assert!(!show_secrets);
}

#[test]
fn runs_without_range_parse() {
    let JobCommand::Runs { start, end, filter, .. } =
        job_command(&["runs", "sample-job", "--filter", "failed", "--filter", "running"])
    else {
        panic!("expected runs");
    };
    assert_eq!((start, end), (None, None));
    assert_eq!(filter, vec!["failed", "running"]);
}

#[test]
fn runs_need_both_ends_of_a_range() {
    let argv = ["skein", "job", "runs", "sample-job", "--start", "2023-01-01"];
    assert!(parse_from(argv).is_err());
}

#[test]
fn event_values_default_to_empty_object() {
    let JobCommand::Event {
        event_type, values, ..
    } = job_command(&["event", "sample-job", "job_success", "-n", "ns"])
    else {
        panic!("expected event");
    };
    assert_eq!(event_type, "job_success");
    assert!(parse_values(&values).unwrap().is_empty());
}

#[test]
fn secrets_are_masked_unless_requested() {
    let input = ExecutorInput {
        configs: BTreeMap::from([("SQL_TYPE".to_string(), "STANDARD".to_string())]),
        secrets: BTreeMap::from([("STORAGE".to_string(), "c2VjcmV0".to_string())]),
        files: BTreeMap::new(),
    };

    let hidden = masked(&input, false);
    assert_eq!(hidden.secrets["STORAGE"], "****");
    assert_eq!(hidden.configs, input.configs);

    assert_eq!(masked(&input, true), input);
}
