// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use tempfile::tempdir;

const KEY: &str = "Yjo4a0NZTlpGUlJwbnBxbXMyTjJ0eTVx";

#[test]
fn missing_config_file_means_defaults() {
    let dir = tempdir().unwrap();

    let config = Config::for_state_dir(dir.path().to_path_buf()).unwrap();

    assert_eq!(config.settings, Settings::default());
    assert_eq!(config.socket_path, dir.path().join("daemon.sock"));
    assert_eq!(config.jobs_path, dir.path().join("jobs"));
    assert_eq!(config.settings.replay.timeout_secs, 10_800);
    assert_eq!(config.settings.throttle(), DeployThrottle::default());
    assert_eq!(config.settings.manager_config().tick, Duration::from_secs(60));
}

#[test]
fn settings_file_overrides_defaults_and_seeds_tenants() {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        r#"
[server]
host = "skein.internal:9100"

[replay]
num_workers = 4
tick = "@every 30s"

[[projects]]
name = "proj"
config = { STORAGE_PATH = "mem://bucket", SCHEDULER_HOST = "http://airflow" }

[[namespaces]]
project = "proj"
name = "ns"

[[secrets]]
project = "proj"
name = "SLACK_TOKEN"
value = "xoxb-1"
"#,
    )
    .unwrap();

    let config = Config::for_state_dir(dir.path().to_path_buf()).unwrap();
    let settings = &config.settings;

    assert_eq!(settings.server.host, "skein.internal:9100");
    assert_eq!(settings.manager_config().num_workers, 4);
    assert_eq!(settings.manager_config().tick, Duration::from_secs(30));
    assert_eq!(settings.projects[0].config["STORAGE_PATH"], "mem://bucket");
    assert_eq!(settings.namespaces[0].name, "ns");
    assert_eq!(settings.secrets[0].namespace, None);
    assert_eq!(settings.notify.slack_api, SLACK_API);
}

#[yare::parameterized(
    zero_workers = { "[replay]\nnum_workers = 0", "num_workers" },
    bad_tick = { "[replay]\ntick = \"every minute\"", "replay.tick" },
    zero_tickets = { "[deploy]\ntickets_per_sec = 0", "tickets_per_sec" },
)]
fn invalid_settings_are_rejected(content: &str, needle: &str) {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("config.toml"), content).unwrap();

    let err = Config::for_state_dir(dir.path().to_path_buf()).unwrap_err();

    assert!(matches!(err, ConfigError::Invalid(_)));
    assert!(err.to_string().contains(needle), "{err}");
}

#[test]
fn malformed_toml_names_the_file() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("config.toml"), "[replay\n").unwrap();

    let err = Config::for_state_dir(dir.path().to_path_buf()).unwrap_err();

    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("config.toml"));
}

#[test]
fn overrides_win_over_file_values() {
    let settings = Settings::default().with_overrides(Some(KEY.to_string()), Some(60));

    assert_eq!(settings.server.app_key.as_deref(), Some(KEY));
    assert_eq!(
        settings.engine_config().replay_timeout,
        chrono::Duration::seconds(60)
    );
}

#[test]
fn app_key_is_required_and_validated() {
    assert!(matches!(
        Settings::default().app_key(),
        Err(ConfigError::MissingAppKey)
    ));

    let short = Settings::default().with_overrides(Some("too-short".to_string()), None);
    assert!(matches!(short.app_key(), Err(ConfigError::AppKey(_))));

    let good = Settings::default().with_overrides(Some(KEY.to_string()), None);
    assert!(good.app_key().is_ok());
}

#[test]
#[serial]
fn load_reads_state_dir_and_env_overrides() {
    let dir = tempdir().unwrap();
    std::env::set_var("SKEIN_STATE_DIR", dir.path());
    std::env::set_var("SKEIN_APP_KEY", KEY);
    std::env::set_var("SKEIN_REPLAY_TIMEOUT_SECS", "120");

    let config = Config::load();

    std::env::remove_var("SKEIN_STATE_DIR");
    std::env::remove_var("SKEIN_APP_KEY");
    std::env::remove_var("SKEIN_REPLAY_TIMEOUT_SECS");

    let config = config.unwrap();
    assert_eq!(config.state_dir, dir.path());
    assert_eq!(config.settings.server.app_key.as_deref(), Some(KEY));
    assert_eq!(config.settings.replay.timeout_secs, 120);
}
