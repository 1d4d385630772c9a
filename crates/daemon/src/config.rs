// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: fixed paths under the state directory plus the
//! optional `config.toml` settings file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use skein_adapters::notify::{DEFAULT_BATCH_INTERVAL, PAGERDUTY_API, SLACK_API};
use skein_adapters::DeployThrottle;
use skein_core::parse_cron_schedule;
use skein_engine::{EngineConfig, ManagerConfig};
use skein_storage::{AppKey, CryptoError};
use thiserror::Error;

/// Configuration errors; any of them aborts startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("app key is not configured; set [server] app_key or SKEIN_APP_KEY")]
    MissingAppKey,

    #[error("invalid app key: {0}")]
    AppKey(#[from] CryptoError),
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/skein)
    pub state_dir: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to version file
    pub version_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Path to the zstd snapshot of the store
    pub snapshot_path: PathBuf,
    /// Task and hook plugin definitions
    pub plugins_path: PathBuf,
    /// Job specs (`*.json`) loaded at startup
    pub jobs_path: PathBuf,
    pub settings: Settings,
}

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub replay: ReplaySettings,
    pub deploy: DeploySettings,
    pub notify: NotifySettings,
    pub projects: Vec<ProjectSeed>,
    pub namespaces: Vec<NamespaceSeed>,
    pub secrets: Vec<SecretSeed>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// 32-byte key, raw or base64, used to encrypt secrets at rest
    pub app_key: Option<String>,
    /// Hostname compiled into DAG artifacts for upstream sensors
    pub host: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            app_key: None,
            host: "localhost".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReplaySettings {
    pub timeout_secs: u64,
    pub num_workers: usize,
    pub run_timeout_secs: u64,
    pub worker_timeout_secs: u64,
    /// Manager tick as a cron descriptor
    pub tick: String,
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            timeout_secs: 3 * 60 * 60,
            num_workers: 1,
            run_timeout_secs: 300,
            worker_timeout_secs: 3600,
            tick: "@every 1m".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DeploySettings {
    pub tickets_per_sec: u32,
    pub concurrent_limit: usize,
}

impl Default for DeploySettings {
    fn default() -> Self {
        let throttle = DeployThrottle::default();
        Self {
            tickets_per_sec: throttle.tickets_per_sec,
            concurrent_limit: throttle.concurrent_limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NotifySettings {
    pub batch_interval_ms: u64,
    pub slack_api: String,
    pub pagerduty_api: String,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            batch_interval_ms: DEFAULT_BATCH_INTERVAL.as_millis() as u64,
            slack_api: SLACK_API.to_string(),
            pagerduty_api: PAGERDUTY_API.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProjectSeed {
    pub name: String,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NamespaceSeed {
    pub project: String,
    pub name: String,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SecretSeed {
    pub project: String,
    /// Project-wide when absent
    #[serde(default)]
    pub namespace: Option<String>,
    pub name: String,
    pub value: String,
}

impl Config {
    /// Load configuration for the user-level daemon, applying environment
    /// overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::for_state_dir(crate::env::state_dir()?)?;
        config.settings = config
            .settings
            .with_overrides(crate::env::app_key(), crate::env::replay_timeout_secs());
        config.settings.validate()?;
        Ok(config)
    }

    /// Paths under `state_dir` and the settings in its `config.toml`.
    pub fn for_state_dir(state_dir: PathBuf) -> Result<Self, ConfigError> {
        let settings = Settings::read(&state_dir.join("config.toml"))?;
        settings.validate()?;
        Ok(Self {
            socket_path: state_dir.join("daemon.sock"),
            lock_path: state_dir.join("daemon.pid"),
            version_path: state_dir.join("daemon.version"),
            log_path: state_dir.join("daemon.log"),
            snapshot_path: state_dir.join("snapshot.zst"),
            plugins_path: state_dir.join("plugins.toml"),
            jobs_path: state_dir.join("jobs"),
            state_dir,
            settings,
        })
    }
}

impl Settings {
    /// Parse the settings file; a missing file means defaults.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn with_overrides(mut self, app_key: Option<String>, replay_timeout_secs: Option<u64>) -> Self {
        if let Some(key) = app_key {
            self.server.app_key = Some(key);
        }
        if let Some(secs) = replay_timeout_secs {
            self.replay.timeout_secs = secs;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.replay.num_workers < 1 {
            return Err(ConfigError::Invalid(
                "replay.num_workers must be at least 1".to_string(),
            ));
        }
        if self.deploy.tickets_per_sec == 0 || self.deploy.concurrent_limit == 0 {
            return Err(ConfigError::Invalid(
                "deploy.tickets_per_sec and deploy.concurrent_limit must be positive".to_string(),
            ));
        }
        parse_cron_schedule(&self.replay.tick)
            .map_err(|e| ConfigError::Invalid(format!("replay.tick: {e}")))?;
        Ok(())
    }

    pub fn app_key(&self) -> Result<AppKey, ConfigError> {
        let key = self.server.app_key.as_deref().ok_or(ConfigError::MissingAppKey)?;
        Ok(AppKey::parse(key)?)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            replay_timeout: chrono::Duration::seconds(self.replay.timeout_secs as i64),
            run_timeout: Duration::from_secs(self.replay.run_timeout_secs),
        }
    }

    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            tick: self.manager_tick(),
            num_workers: self.replay.num_workers,
            worker_timeout: Duration::from_secs(self.replay.worker_timeout_secs),
        }
    }

    pub fn throttle(&self) -> DeployThrottle {
        DeployThrottle {
            tickets_per_sec: self.deploy.tickets_per_sec,
            concurrent_limit: self.deploy.concurrent_limit,
        }
    }

    pub fn batch_interval(&self) -> Duration {
        Duration::from_millis(self.notify.batch_interval_ms)
    }

    fn manager_tick(&self) -> Duration {
        parse_cron_schedule(&self.replay.tick)
            .ok()
            .and_then(|cron| cron.interval(chrono::Utc::now()).to_std().ok())
            .filter(|d| !d.is_zero())
            .unwrap_or_else(|| ManagerConfig::default().tick)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
