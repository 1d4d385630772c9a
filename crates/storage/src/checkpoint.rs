// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background checkpointing with zstd compression and durable fsync.
//!
//! ```text
//! caller                         background thread
//! ───────────────────────────    ─────────────────────────────
//! clone state
//!   │
//!   └─────────────────────────→  serialize + compress
//!                                write to .tmp, fsync
//!                                rename → snapshot
//!                                fsync directory
//!                                  │
//!   ←────────────────────────────┘ (completion signal)
//! ```
//!
//! All file operations go through [`CheckpointWriter`] so tests can record
//! the I/O order and inject failures.

use crate::{MaterializedState, Snapshot};
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("compression error: {0}")]
    Compress(String),
    #[error("checkpoint failed: {0}")]
    Failed(String),
}

/// Result of a completed checkpoint
#[derive(Debug, Clone)]
pub struct CheckpointResult {
    pub created_at: DateTime<Utc>,
    /// Size of the compressed snapshot in bytes
    pub size_bytes: u64,
}

pub trait CheckpointWriter: Send + Sync + 'static {
    fn write_tmp(&self, path: &Path, data: &[u8]) -> Result<(), CheckpointError>;
    fn fsync_file(&self, path: &Path) -> Result<(), CheckpointError>;
    fn rename(&self, from: &Path, to: &Path) -> Result<(), CheckpointError>;
    fn fsync_dir(&self, path: &Path) -> Result<(), CheckpointError>;
    fn file_size(&self, path: &Path) -> Result<u64, CheckpointError>;
}

/// Checkpoint writer backed by the real filesystem
#[derive(Clone)]
pub struct FsCheckpointWriter;

impl CheckpointWriter for FsCheckpointWriter {
    fn write_tmp(&self, path: &Path, data: &[u8]) -> Result<(), CheckpointError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        file.write_all(data)?;
        Ok(())
    }

    fn fsync_file(&self, path: &Path) -> Result<(), CheckpointError> {
        File::open(path)?.sync_all()?;
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), CheckpointError> {
        std::fs::rename(from, to)?;
        Ok(())
    }

    fn fsync_dir(&self, path: &Path) -> Result<(), CheckpointError> {
        File::open(path)?.sync_all()?;
        Ok(())
    }

    fn file_size(&self, path: &Path) -> Result<u64, CheckpointError> {
        Ok(std::fs::metadata(path)?.len())
    }
}

/// Handle to a checkpoint running on a background thread.
pub struct CheckpointHandle {
    receiver: mpsc::Receiver<Result<CheckpointResult, CheckpointError>>,
    #[allow(dead_code)]
    handle: JoinHandle<()>,
}

impl CheckpointHandle {
    /// Block until the snapshot is durable, including the directory fsync.
    pub fn wait(self) -> Result<CheckpointResult, CheckpointError> {
        self.receiver
            .recv()
            .map_err(|_| CheckpointError::Failed("checkpoint thread panicked".into()))?
    }

    pub fn try_wait(&self) -> Option<Result<CheckpointResult, CheckpointError>> {
        self.receiver.try_recv().ok()
    }
}

/// Writes compressed snapshots of the materialized state
pub struct Checkpointer<W: CheckpointWriter = FsCheckpointWriter> {
    writer: W,
    snapshot_path: PathBuf,
    compression_level: i32,
}

impl Checkpointer<FsCheckpointWriter> {
    pub fn new(snapshot_path: PathBuf) -> Self {
        Self::with_writer(FsCheckpointWriter, snapshot_path)
    }
}

impl<W: CheckpointWriter + Clone> Checkpointer<W> {
    pub fn with_writer(writer: W, snapshot_path: PathBuf) -> Self {
        Self {
            writer,
            snapshot_path,
            compression_level: 3,
        }
    }

    /// Set the zstd compression level (1-22, default 3).
    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Clone the state and write it from a background thread.
    pub fn start(&self, state: &MaterializedState, now: DateTime<Utc>) -> CheckpointHandle {
        let snapshot = Snapshot::new(state.clone(), now);
        let writer = self.writer.clone();
        let snapshot_path = self.snapshot_path.clone();
        let compression_level = self.compression_level;

        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            let result = checkpoint_blocking(&writer, &snapshot, &snapshot_path, compression_level);
            let _ = tx.send(result);
        });

        CheckpointHandle {
            receiver: rx,
            handle,
        }
    }

    /// Checkpoint on the calling thread (used at shutdown).
    pub fn checkpoint_sync(
        &self,
        state: &MaterializedState,
        now: DateTime<Utc>,
    ) -> Result<CheckpointResult, CheckpointError> {
        let snapshot = Snapshot::new(state.clone(), now);
        checkpoint_blocking(
            &self.writer,
            &snapshot,
            &self.snapshot_path,
            self.compression_level,
        )
    }
}

fn checkpoint_blocking<W: CheckpointWriter>(
    writer: &W,
    snapshot: &Snapshot,
    snapshot_path: &Path,
    compression_level: i32,
) -> Result<CheckpointResult, CheckpointError> {
    let tmp_path = snapshot_path.with_extension("tmp");

    let json_bytes = serde_json::to_vec(snapshot)?;
    let compressed = zstd::encode_all(json_bytes.as_slice(), compression_level)
        .map_err(|e| CheckpointError::Compress(e.to_string()))?;

    writer.write_tmp(&tmp_path, &compressed)?;
    writer.fsync_file(&tmp_path)?;
    writer.rename(&tmp_path, snapshot_path)?;
    if let Some(parent) = snapshot_path.parent() {
        writer.fsync_dir(parent)?;
    }

    let size_bytes = writer
        .file_size(snapshot_path)
        .unwrap_or(compressed.len() as u64);

    Ok(CheckpointResult {
        created_at: snapshot.created_at,
        size_bytes,
    })
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
