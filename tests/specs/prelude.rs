//! Test helpers for behavioral specifications.
//!
//! Provides a small DSL for driving the skein CLI against an isolated daemon.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

// Aggressive timeouts for fast tests.
//
// IMPORTANT:
//   Do NOT change these.
//   File a performance bug instead.
const SKEIN_TIMEOUT_CONNECT_MS: &str = "2000";
const SKEIN_TIMEOUT_EXIT_MS: &str = "500";
const SKEIN_TIMEOUT_IPC_MS: &str = "500";
const SKEIN_CONNECT_POLL_MS: &str = "5";

// Spec polling timeouts
pub const SPEC_POLL_INTERVAL_MS: u64 = 10;
pub const SPEC_WAIT_MAX_MS: u64 = 2000;

/// Secret encryption key written into every test project's config
pub const APP_KEY: &str = "Yjo4a0jn1NvYdq79SADC/KaVv9Wu0Ffc";

/// Returns the path to a binary, checking llvm-cov target directory first.
/// This works with both standard builds and llvm-cov coverage runs.
/// Falls back to resolving relative to the test binary itself when
/// CARGO_MANIFEST_DIR is stale (e.g. compiled by a removed worktree
/// into a shared target directory).
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    // Check for llvm-cov target directory first
    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    // Standard target directory (works when CARGO_MANIFEST_DIR is correct)
    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    // Fallback: resolve relative to the test binary itself.
    // The test binary lives at target/debug/deps/specs-<hash>, so its
    // grandparent is target/debug/ where skein and skeind are built.
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

fn skein_binary() -> PathBuf {
    binary_path("skein")
}

/// Returns the path to the skeind daemon binary.
pub fn skeind_binary() -> PathBuf {
    binary_path("skeind")
}

/// Create a CLI builder for skein commands
pub fn cli() -> CliBuilder {
    CliBuilder::new()
}

/// High-level CLI builder for fluent test assertions
pub struct CliBuilder {
    args: Vec<String>,
    dir: Option<PathBuf>,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new() -> Self {
        Self {
            args: Vec::new(),
            dir: None,
            envs: vec![
                (
                    "SKEIN_DAEMON_BINARY".into(),
                    skeind_binary().to_string_lossy().into(),
                ),
                (
                    "SKEIN_TIMEOUT_CONNECT_MS".into(),
                    SKEIN_TIMEOUT_CONNECT_MS.into(),
                ),
                ("SKEIN_TIMEOUT_EXIT_MS".into(), SKEIN_TIMEOUT_EXIT_MS.into()),
                ("SKEIN_TIMEOUT_IPC_MS".into(), SKEIN_TIMEOUT_IPC_MS.into()),
                ("SKEIN_CONNECT_POLL_MS".into(), SKEIN_CONNECT_POLL_MS.into()),
            ],
        }
    }

    /// Add CLI arguments
    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Set working directory
    pub fn pwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.dir = Some(path.into());
        self
    }

    /// Set environment variable
    pub fn env(mut self, key: &str, value: impl AsRef<Path>) -> Self {
        self.envs.push((
            key.to_string(),
            value.as_ref().to_string_lossy().to_string(),
        ));
        self
    }

    /// Build the command without running it
    pub fn command(self) -> Command {
        let mut cmd = Command::new(skein_binary());
        cmd.args(&self.args);

        if let Some(dir) = self.dir {
            cmd.current_dir(dir);
        }

        // Tenant defaults from the parent shell would change which
        // project a command talks about.
        cmd.env_remove("SKEIN_PROJECT");
        cmd.env_remove("SKEIN_NAMESPACE");
        cmd.env_remove("SKEIN_APP_KEY");

        for (key, value) in self.envs {
            cmd.env(key, value);
        }

        cmd
    }

    /// Run and expect success (exit code 0)
    pub fn passes(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        assert!(
            output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    /// Run and expect failure (non-zero exit code)
    pub fn fails(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        assert!(
            !output.status.success(),
            "expected command to fail, but it passed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }
}

/// Result of a CLI run for chaining assertions
pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    /// Get stdout as string
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    /// Get stderr as string
    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    /// Assert stdout equals expected exactly (with diff on failure).
    /// **Prefer this for format specs** - catches format regressions.
    pub fn stdout_eq(self, expected: &str) -> Self {
        let stdout = self.stdout();
        similar_asserts::assert_eq!(stdout, expected);
        self
    }

    /// Assert stderr equals expected exactly (with diff on failure).
    pub fn stderr_eq(self, expected: &str) -> Self {
        let stderr = self.stderr();
        similar_asserts::assert_eq!(stderr, expected);
        self
    }

    /// Assert stdout contains substring.
    /// Use when exact comparison isn't practical.
    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            stdout.contains(expected),
            "stdout does not contain '{}'\nstdout: {}",
            expected,
            stdout
        );
        self
    }

    /// Assert stdout does not contain substring.
    pub fn stdout_lacks(self, unexpected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            !stdout.contains(unexpected),
            "stdout should not contain '{}'\nstdout: {}",
            unexpected,
            stdout
        );
        self
    }

    /// Assert stderr contains substring.
    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(
            stderr.contains(expected),
            "stderr does not contain '{}'\nstderr: {}",
            expected,
            stderr
        );
        self
    }

    /// Assert stderr does not contain substring.
    pub fn stderr_lacks(self, unexpected: &str) -> Self {
        let stderr = self.stderr();
        assert!(
            !stderr.contains(unexpected),
            "stderr should not contain '{}'\nstderr: {}",
            unexpected,
            stderr
        );
        self
    }
}

// =============================================================================
// Polling
// =============================================================================

/// Poll a condition until it returns true or timeout is reached.
/// Uses aggressive polling for fast tests.
pub fn wait_for<F>(timeout_ms: u64, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(timeout_ms);
    let poll_interval = std::time::Duration::from_millis(SPEC_POLL_INTERVAL_MS);

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(poll_interval);
    }
    false
}

// =============================================================================
// Project
// =============================================================================

/// Isolated daemon state directory, seeded with a `config.toml` that
/// registers the `proj` project and its `ns` namespace.
pub struct Project {
    state_dir: tempfile::TempDir,
}

impl Project {
    /// Create a state directory with the default seeds
    pub fn empty() -> Self {
        let project = Self {
            state_dir: tempfile::tempdir().unwrap(),
        };
        project.file("config.toml", &default_config());
        project
    }

    /// Get the isolated state directory path
    pub fn state_path(&self) -> &Path {
        self.state_dir.path()
    }

    /// Write a file under the state directory (parent directories created automatically)
    pub fn file(&self, path: impl AsRef<Path>, content: &str) {
        let full_path = self.state_path().join(path.as_ref());
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full_path, content).unwrap();
    }

    /// Run skein against this project's daemon
    pub fn skein(&self) -> CliBuilder {
        cli()
            .pwd(self.state_path())
            .env("SKEIN_STATE_DIR", self.state_path())
    }

    /// Read the daemon log file contents (for debugging test failures)
    pub fn daemon_log(&self) -> String {
        let log_path = self.state_path().join("daemon.log");
        std::fs::read_to_string(&log_path).unwrap_or_else(|_| "(no daemon log)".to_string())
    }

    /// Kill the daemon process with SIGKILL (simulates crash).
    /// Returns true if the process was killed, false if PID not found or kill failed.
    pub fn daemon_kill(&self) -> bool {
        let pid_file = self.state_path().join("daemon.pid");
        let Some(pid) = std::fs::read_to_string(&pid_file)
            .ok()
            .and_then(|content| content.trim().parse::<u32>().ok())
        else {
            return false;
        };
        Command::new("kill")
            .args(["-9", &pid.to_string()])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

impl Drop for Project {
    fn drop(&mut self) {
        // Always try to stop daemon (no-op if not running)
        let mut cmd = self.skein().args(&["daemon", "stop"]).command();
        cmd.stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null());
        let _ = cmd.status();
    }
}

/// Settings with the app key and a `proj/ns` tenant
pub fn default_config() -> String {
    format!(
        r#"
[server]
app_key = "{APP_KEY}"

[[projects]]
name = "proj"
config = {{ STORAGE_PATH = "mem://proj", SCHEDULER_HOST = "http://127.0.0.1:9" }}

[[namespaces]]
project = "proj"
name = "ns"
"#
    )
}
