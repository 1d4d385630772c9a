// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot of the materialized state.
//!
//! Snapshots are zstd-compressed JSON written by the [`crate::Checkpointer`].
//! A snapshot that fails to decode is moved aside to a `.bak` file and the
//! daemon starts from empty state.

use crate::MaterializedState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Current on-disk snapshot schema version.
pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot version {found} is newer than supported ({supported})")]
    TooNew { found: u32, supported: u32 },
}

/// The complete materialized state at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "v")]
    pub version: u32,
    pub state: MaterializedState,
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(state: MaterializedState, created_at: DateTime<Utc>) -> Self {
        Self {
            version: CURRENT_SNAPSHOT_VERSION,
            state,
            created_at,
        }
    }

    /// Load a snapshot if one exists.
    ///
    /// Returns `Ok(None)` when the file is missing or corrupt. Corrupt files
    /// are rotated into `.bak` backups so they can be inspected.
    pub fn load(path: &Path) -> Result<Option<Self>, SnapshotError> {
        if !path.exists() {
            return Ok(None);
        }
        match decode(path) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e @ SnapshotError::TooNew { .. }) => Err(e),
            Err(e) => {
                let bak_path = rotate_bak_path(path);
                warn!(
                    error = %e,
                    path = %path.display(),
                    bak = %bak_path.display(),
                    "corrupt snapshot, moving to .bak and starting fresh",
                );
                fs::rename(path, &bak_path)?;
                Ok(None)
            }
        }
    }
}

fn decode(path: &Path) -> Result<Snapshot, SnapshotError> {
    let file = File::open(path)?;
    let decoder = zstd::stream::read::Decoder::new(file)?;
    let value: Value = serde_json::from_reader(decoder)?;
    // Snapshots written before the version field existed are version 1
    let found = value.get("v").and_then(Value::as_u64).unwrap_or(1) as u32;
    if found > CURRENT_SNAPSHOT_VERSION {
        return Err(SnapshotError::TooNew {
            found,
            supported: CURRENT_SNAPSHOT_VERSION,
        });
    }
    Ok(serde_json::from_value(value)?)
}

const MAX_BAK_FILES: u32 = 3;

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
///
/// Keeps up to [`MAX_BAK_FILES`] backups: `.bak`, `.bak.2`, `.bak.3`.
pub(crate) fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }
    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }

    bak(1)
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
