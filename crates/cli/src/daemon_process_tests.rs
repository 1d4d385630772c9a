// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use tempfile::tempdir;

#[test]
fn startup_error_without_marker_is_none() {
    assert_eq!(parse_startup_error("ERROR Failed to start daemon: boom\n"), None);
}

#[test]
fn startup_error_only_reads_the_last_attempt() {
    let log = "\
--- skeind: starting (pid: 100) ---
ERROR Failed to start daemon: old failure
--- skeind: starting (pid: 200) ---
2026-01-01T00:00:00.000000Z  INFO skeind: Starting skein daemon
";
    assert_eq!(parse_startup_error(log), None);
}

#[test]
fn startup_error_dedups_sync_and_traced_lines() {
    let log = "\
--- skeind: starting (pid: 200) ---
ERROR Failed to start daemon: configuration error: app key is required
2026-01-01T00:00:00.000000Z ERROR skeind: Failed to start daemon: configuration error: app key is required
";
    assert_eq!(
        parse_startup_error(log).as_deref(),
        Some("configuration error: app key is required")
    );
}

#[test]
fn startup_error_keeps_distinct_errors_in_order() {
    let log = "\
--- skeind: starting (pid: 300) ---
2026-01-01T00:00:00.000000Z ERROR skein_daemon::lifecycle: plugins.toml: unknown field
ERROR Failed to start daemon: invalid plugin file
";
    assert_eq!(
        parse_startup_error(log).as_deref(),
        Some("plugins.toml: unknown field\ninvalid plugin file")
    );
}

#[test]
#[serial]
fn stale_socket_of_a_dead_daemon_is_removed() {
    let dir = tempdir().unwrap();
    std::env::set_var("SKEIN_STATE_DIR", dir.path());
    std::fs::write(dir.path().join("daemon.sock"), b"").unwrap();
    std::fs::write(dir.path().join("daemon.pid"), b"999999999\n").unwrap();

    cleanup_stale_socket().unwrap();

    assert!(!dir.path().join("daemon.sock").exists());
    assert!(!dir.path().join("daemon.pid").exists());
    std::env::remove_var("SKEIN_STATE_DIR");
}

#[test]
#[serial]
fn socket_of_a_live_daemon_is_kept() {
    let dir = tempdir().unwrap();
    std::env::set_var("SKEIN_STATE_DIR", dir.path());
    std::fs::write(dir.path().join("daemon.sock"), b"").unwrap();
    std::fs::write(
        dir.path().join("daemon.pid"),
        std::process::id().to_string(),
    )
    .unwrap();

    cleanup_stale_socket().unwrap();

    assert!(dir.path().join("daemon.sock").exists());
    std::env::remove_var("SKEIN_STATE_DIR");
}

#[test]
#[serial]
fn daemon_binary_override_wins() {
    std::env::set_var("SKEIN_DAEMON_BINARY", "/opt/skein/bin/skeind");
    assert_eq!(
        find_daemon_binary(),
        PathBuf::from("/opt/skein/bin/skeind")
    );
    std::env::remove_var("SKEIN_DAEMON_BINARY");
}

#[test]
#[serial]
fn daemon_version_is_trimmed() {
    let dir = tempdir().unwrap();
    std::env::set_var("SKEIN_STATE_DIR", dir.path());
    std::fs::write(dir.path().join("daemon.version"), "0.1.0\n").unwrap();

    assert_eq!(read_daemon_version().as_deref(), Some("0.1.0"));
    std::env::remove_var("SKEIN_STATE_DIR");
}
