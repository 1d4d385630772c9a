// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;

use crate::config::ConfigError;

/// Resolve state directory: SKEIN_STATE_DIR > XDG_STATE_HOME/skein > ~/.local/state/skein
pub fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("SKEIN_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("skein"));
    }
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/skein"))
}

/// Application key override; wins over `[server] app_key`
pub fn app_key() -> Option<String> {
    std::env::var("SKEIN_APP_KEY").ok().filter(|s| !s.is_empty())
}

/// Replay timeout override in seconds
pub fn replay_timeout_secs() -> Option<u64> {
    std::env::var("SKEIN_REPLAY_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
}
