// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{parse_from, Commands};
use serial_test::serial;
use skein_core::{JobName, JobRunStatus, Replay, ReplayId, ReplayState, State, Tenant};

fn replay_command(args: &[&str]) -> ReplayCommand {
    let argv = ["skein", "replay"].iter().chain(args).copied();
    match parse_from(argv).unwrap().command {
        Some(Commands::Replay(ReplayArgs { command })) => command,
        _ => panic!("expected a replay command"),
    }
}

fn t(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

#[test]
fn create_collects_config_overrides() {
    let command = replay_command(&[
        "create",
        "sample-job",
        "-p",
        "proj",
        "-n",
        "ns",
        "--start",
        "2023-01-01",
        "--end",
        "2023-01-03",
        "--config",
        "EXECUTION_PROJECT=backfill",
        "--config",
        "FILTER=dt>='2023-01-01'",
        "--parallel",
    ]);

    let ReplayCommand::Create {
        start,
        end,
        parallel,
        config,
        description,
        ..
    } = command
    else {
        panic!("expected create");
    };
    assert_eq!(start, t("2023-01-01T00:00:00Z"));
    assert_eq!(end, t("2023-01-03T00:00:00Z"));
    assert!(parallel);
    assert_eq!(description, "");
    assert_eq!(
        config,
        vec![
            ("EXECUTION_PROJECT".to_string(), "backfill".to_string()),
            ("FILTER".to_string(), "dt>='2023-01-01'".to_string()),
        ]
    );
}

#[test]
fn create_requires_the_window() {
    let argv = ["skein", "replay", "create", "sample-job", "--start", "2023-01-01"];
    assert!(parse_from(argv).is_err());
}

#[test]
fn malformed_config_override_is_rejected() {
    let argv = [
        "skein",
        "replay",
        "create",
        "sample-job",
        "--start",
        "2023-01-01",
        "--end",
        "2023-01-02",
        "--config",
        "NOEQUALS",
    ];
    assert!(parse_from(argv).is_err());
}

#[test]
#[serial]
fn list_table_shows_one_row_per_replay() {
    std::env::set_var("NO_COLOR", "1");
    let replay = ReplayWithRun {
        replay: Replay {
            id: ReplayId::parse("6f1c3a36-8f5b-4f0e-9a55-0a8b2f3f4e21").unwrap(),
            job_name: JobName::try_new("sample-job").unwrap(),
            tenant: Tenant::new("proj", "ns").unwrap(),
            config: ReplayConfig::new(
                t("2023-01-01T00:00:00Z"),
                t("2023-01-02T00:00:00Z"),
                false,
                BTreeMap::new(),
                "rerun after fix",
            ),
            state: ReplayState::InProgress,
            message: String::new(),
            created_at: t("2023-01-05T08:00:00Z"),
        },
        runs: vec![
            JobRunStatus::new(t("2023-01-01T12:00:00Z"), State::Replayed),
            JobRunStatus::new(t("2023-01-02T12:00:00Z"), State::Pending),
        ],
    };

    let mut buf = Vec::new();
    replay_table(&[replay]).render(&mut buf);
    let out = String::from_utf8(buf).unwrap();
    let lines: Vec<&str> = out.lines().collect();

    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("ID"));
    assert!(lines[1].contains("sample-job"));
    assert!(lines[1].contains("in progress"));
    assert!(lines[1].contains("2023-01-01 00:00"));
    assert!(lines[1].ends_with("rerun after fix"));
    std::env::remove_var("NO_COLOR");
}
