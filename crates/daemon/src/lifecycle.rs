// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use parking_lot::Mutex;
use skein_adapters::{
    AirflowScheduler, BatchingNotifier, BucketOpener, Notifier, PagerDutySender, SlackSender,
    TracedNotifier, TracedScheduler,
};
use skein_compiler::{
    DagCompiler, ExecutorInputCompiler, Format, JobAssetsCompiler, PluginError, PluginRepo,
    TemplateEngine,
};
use skein_core::notify::{PAGERDUTY_SCHEME, SLACK_SCHEME};
use skein_core::{
    Clock, JobWithDetails, Namespace, PlainTextSecret, Project, ProjectName, SystemClock, Tenant,
    TreePriorityResolver, UuidIdGen,
};
use skein_engine::{Engine, EngineDeps, ReplayManager, StateTenants};
use skein_storage::{Checkpointer, MaterializedState, SecretCipher, Snapshot, SnapshotError};
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{Config, ConfigError, Settings};

/// Engine over the real clock and random ids
pub type DaemonEngine = Engine<SystemClock, UuidIdGen>;

/// Checkpoint interval (60 seconds)
pub const CHECKPOINT_INTERVAL: Duration = Duration::from_secs(60);

/// Daemon state during operation.
///
/// The listener is returned separately from startup to be spawned as a Listener task.
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub engine: Arc<DaemonEngine>,
    /// Stops the replay manager and the checkpoint task
    pub cancel: CancellationToken,
    manager: JoinHandle<()>,
    pub start_time: Instant,
}

/// Result of daemon startup - includes both the daemon state and the listener.
pub struct StartupResult {
    pub daemon: DaemonState,
    /// The Unix socket listener to spawn as a task
    pub listener: UnixListener,
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Plugin error: {0}")]
    Plugins(#[from] PluginError),

    #[error("invalid job file {path}: {source}")]
    JobFile {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Domain(#[from] skein_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DaemonState {
    /// Shutdown the daemon gracefully.
    ///
    /// Replays the manager had claimed are handed back by the workers when
    /// the cancel token fires; the final snapshot keeps them.
    pub async fn shutdown(self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        self.cancel.cancel();
        if let Err(e) = self.manager.await {
            warn!("replay manager ended abnormally: {}", e);
        }

        // Pending alerts are flushed before the state is saved
        if let Err(e) = self.engine.close_notifiers().await {
            warn!("{}", e);
        }

        let telemetry = self.engine.telemetry();
        info!(
            job_event_failure = telemetry.job_event_failure,
            job_event_slamiss = telemetry.job_event_slamiss,
            jobrun_events = ?telemetry.jobrun_events_total,
            "final telemetry"
        );

        let state_clone = self.engine.state().lock().clone();
        let checkpointer = Checkpointer::new(self.config.snapshot_path.clone());
        match checkpointer.checkpoint_sync(&state_clone, self.engine.clock().now()) {
            Ok(result) => info!(
                size_bytes = result.size_bytes,
                "saved final shutdown snapshot"
            ),
            Err(e) => warn!("Failed to save shutdown snapshot: {}", e),
        }

        remove_runtime_files(&self.config);

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // A failed lock means the runtime files belong to the running daemon.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                remove_runtime_files(config);
            }
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup called if this fails
async fn startup_inner(config: &Config) -> Result<StartupResult, LifecycleError> {
    // 1. Create state directory (needed for socket, lock, etc.)
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire lock file FIRST - prevents races
    // Open without truncating; the running daemon's PID must survive.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    use std::io::Write;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    std::fs::write(&config.version_path, env!("CARGO_PKG_VERSION"))?;

    // 3. Secrets cannot be read back without the key
    let cipher = SecretCipher::new(&config.settings.app_key()?);

    // 4. Load state from snapshot (if exists) and apply seeds
    let clock = SystemClock;
    let now = clock.now();
    let mut state = match Snapshot::load(&config.snapshot_path)? {
        Some(snapshot) => {
            info!(
                created_at = %snapshot.created_at,
                "Loaded snapshot: {} projects, {} jobs, {} replays",
                snapshot.state.projects.len(),
                snapshot.state.jobs.len(),
                snapshot.state.replays.len(),
            );
            snapshot.state
        }
        None => {
            info!("No snapshot found, starting with empty state");
            MaterializedState::default()
        }
    };
    seed_tenants(&mut state, &config.settings, &cipher, now)?;
    let jobs = load_jobs(&config.jobs_path)?;
    let job_count = jobs.len();
    for job in jobs {
        state.upsert_job(job, now);
    }
    if job_count > 0 {
        info!("Loaded {} job specs from {}", job_count, config.jobs_path.display());
    }
    let state = Arc::new(Mutex::new(state));

    // 5. Set up adapters (wrapped with tracing for observability)
    let plugins = Arc::new(load_plugins(&config.plugins_path)?);
    let dag_compiler = Arc::new(DagCompiler::new(
        config.settings.server.host.clone(),
        Arc::clone(&plugins),
    )?);
    let client = reqwest::Client::new();
    let scheduler = TracedScheduler::new(
        AirflowScheduler::new(
            BucketOpener::new(client.clone()),
            dag_compiler,
            Arc::new(StateTenants::new(Arc::clone(&state), cipher.clone())),
            client.clone(),
        )
        .with_throttle(config.settings.throttle()),
    );
    let notifiers = build_notifiers(&config.settings, &client);

    let templates = TemplateEngine::new();
    let input_compiler = ExecutorInputCompiler::new(
        JobAssetsCompiler::new(plugins, templates.clone()),
        templates,
    );

    // 6. Create engine and start the replay manager
    let engine = Arc::new(Engine::new(
        EngineDeps {
            state,
            cipher,
            scheduler: Arc::new(scheduler),
            notifiers,
            resolver: Arc::new(TreePriorityResolver),
            input_compiler,
        },
        clock,
        UuidIdGen,
        config.settings.engine_config(),
    ));

    let cancel = CancellationToken::new();
    let manager = Arc::new(ReplayManager::new(
        Arc::clone(&engine),
        config.settings.manager_config(),
    ))
    .start(cancel.clone());
    spawn_checkpoint(Arc::clone(&engine), config.snapshot_path.clone(), cancel.clone());

    // 7. Remove stale socket and bind (LAST - only after all validation passes)
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = match UnixListener::bind(&config.socket_path) {
        Ok(listener) => listener,
        Err(e) => {
            cancel.cancel();
            return Err(LifecycleError::BindFailed(config.socket_path.clone(), e));
        }
    };

    info!("Daemon started");

    Ok(StartupResult {
        daemon: DaemonState {
            config: config.clone(),
            lock_file,
            engine,
            cancel,
            manager,
            start_time: Instant::now(),
        },
        listener,
    })
}

/// Projects, namespaces and secrets from the settings file. Existing rows
/// are overwritten so edits take effect on restart.
pub(crate) fn seed_tenants(
    state: &mut MaterializedState,
    settings: &Settings,
    cipher: &SecretCipher,
    now: DateTime<Utc>,
) -> Result<(), LifecycleError> {
    for seed in &settings.projects {
        state.upsert_project(Project::new(&seed.name, seed.config.clone())?, now);
    }
    for seed in &settings.namespaces {
        let project = ProjectName::try_new(&seed.project)?;
        state.upsert_namespace(Namespace::new(&seed.name, project, seed.config.clone())?, now)?;
    }
    for seed in &settings.secrets {
        let tenant = match &seed.namespace {
            Some(ns) => Tenant::new(&seed.project, ns)?,
            None => Tenant::project_scope(&seed.project)?,
        };
        let secret = PlainTextSecret::new(&seed.name, seed.value.clone())?;
        state.save_secret(cipher, &tenant, &secret, now)?;
    }
    Ok(())
}

/// Every `*.json` file in `dir`, in name order. A missing directory has no jobs.
pub(crate) fn load_jobs(dir: &Path) -> Result<Vec<JobWithDetails>, LifecycleError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut jobs = Vec::with_capacity(paths.len());
    for path in paths {
        let content = std::fs::read(&path)?;
        let job = serde_json::from_slice(&content)
            .map_err(|source| LifecycleError::JobFile { path, source })?;
        jobs.push(job);
    }
    Ok(jobs)
}

/// Plugin definitions; none are registered when the file is absent.
pub(crate) fn load_plugins(path: &Path) -> Result<PluginRepo, LifecycleError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(PluginRepo::parse(&content, Format::Toml)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("no plugin file at {}, executor inputs will fail", path.display());
            Ok(PluginRepo::new())
        }
        Err(e) => Err(e.into()),
    }
}

/// Batching Slack and PagerDuty notifiers keyed by channel scheme.
fn build_notifiers(
    settings: &Settings,
    client: &reqwest::Client,
) -> BTreeMap<String, Arc<dyn Notifier>> {
    let interval = settings.batch_interval();
    let slack = TracedNotifier::new(
        SLACK_SCHEME,
        BatchingNotifier::new(
            SlackSender::new(client.clone(), settings.notify.slack_api.clone()),
            interval,
        ),
    );
    let pagerduty = TracedNotifier::new(
        PAGERDUTY_SCHEME,
        BatchingNotifier::new(
            PagerDutySender::new(client.clone(), settings.notify.pagerduty_api.clone()),
            interval,
        ),
    );
    BTreeMap::from([
        (SLACK_SCHEME.to_string(), Arc::new(slack) as Arc<dyn Notifier>),
        (PAGERDUTY_SCHEME.to_string(), Arc::new(pagerduty) as Arc<dyn Notifier>),
    ])
}

/// Spawn a task that periodically snapshots the store.
fn spawn_checkpoint<C: Clock, G: skein_core::IdGen>(
    engine: Arc<Engine<C, G>>,
    snapshot_path: PathBuf,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        let checkpointer = Checkpointer::new(snapshot_path);
        let mut interval = tokio::time::interval(CHECKPOINT_INTERVAL);
        // The first tick completes immediately
        interval.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            let handle = {
                let state = engine.state().lock();
                checkpointer.start(&state, engine.clock().now())
            };
            match tokio::task::spawn_blocking(move || handle.wait()).await {
                Ok(Ok(result)) => {
                    tracing::debug!(size_bytes = result.size_bytes, "saved checkpoint snapshot")
                }
                Ok(Err(e)) => warn!(error = %e, "failed to save checkpoint snapshot"),
                Err(e) => warn!(error = %e, "checkpoint task panicked"),
            }
        }
    });
}

/// Remove socket, version and PID files
fn remove_runtime_files(config: &Config) {
    for path in [&config.socket_path, &config.version_path, &config.lock_path] {
        if path.exists() {
            if let Err(e) = std::fs::remove_file(path) {
                warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
