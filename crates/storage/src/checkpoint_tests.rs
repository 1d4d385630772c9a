// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use skein_core::test_support::{at, job_with_details};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

/// Ordered record of the I/O calls made by a checkpoint
#[derive(Debug, Clone, PartialEq)]
enum Io {
    Write(PathBuf),
    FsyncFile(PathBuf),
    Rename(PathBuf, PathBuf),
    FsyncDir(PathBuf),
}

#[derive(Clone, Default)]
struct FakeCheckpointWriter {
    log: Arc<Mutex<Vec<Io>>>,
    data: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
    fail_write: Arc<AtomicBool>,
    fail_fsync_file: Arc<AtomicBool>,
    fail_fsync_dir: Arc<AtomicBool>,
}

impl FakeCheckpointWriter {
    fn log(&self) -> Vec<Io> {
        self.log.lock().unwrap().clone()
    }

    fn data(&self, path: &Path) -> Option<Vec<u8>> {
        self.data.lock().unwrap().get(path).cloned()
    }

    fn injected(flag: &AtomicBool, what: &str) -> Result<(), CheckpointError> {
        if flag.load(Ordering::SeqCst) {
            return Err(CheckpointError::Io(std::io::Error::other(format!(
                "injected {what} failure"
            ))));
        }
        Ok(())
    }
}

impl CheckpointWriter for FakeCheckpointWriter {
    fn write_tmp(&self, path: &Path, data: &[u8]) -> Result<(), CheckpointError> {
        Self::injected(&self.fail_write, "write")?;
        self.log.lock().unwrap().push(Io::Write(path.to_owned()));
        self.data.lock().unwrap().insert(path.to_owned(), data.to_vec());
        Ok(())
    }

    fn fsync_file(&self, path: &Path) -> Result<(), CheckpointError> {
        Self::injected(&self.fail_fsync_file, "fsync")?;
        self.log.lock().unwrap().push(Io::FsyncFile(path.to_owned()));
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), CheckpointError> {
        let moved = self.data.lock().unwrap().remove(from);
        if let Some(d) = moved {
            self.data.lock().unwrap().insert(to.to_owned(), d);
        }
        self.log
            .lock()
            .unwrap()
            .push(Io::Rename(from.to_owned(), to.to_owned()));
        Ok(())
    }

    fn fsync_dir(&self, path: &Path) -> Result<(), CheckpointError> {
        Self::injected(&self.fail_fsync_dir, "fsync_dir")?;
        self.log.lock().unwrap().push(Io::FsyncDir(path.to_owned()));
        Ok(())
    }

    fn file_size(&self, path: &Path) -> Result<u64, CheckpointError> {
        Ok(self.data(path).map(|d| d.len() as u64).unwrap_or(0))
    }
}

fn create_test_state(num_jobs: usize) -> MaterializedState {
    let mut state = MaterializedState::default();
    for i in 0..num_jobs {
        state.upsert_job(job_with_details(&format!("job-{i}")), at("2023-01-01T00:00:00Z"));
    }
    state
}

fn snapshot_path() -> PathBuf {
    PathBuf::from("/state/snapshot.zst")
}

#[test]
fn checkpoint_io_is_ordered_for_durability() {
    let writer = FakeCheckpointWriter::default();
    let checkpointer = Checkpointer::with_writer(writer.clone(), snapshot_path());

    let result = checkpointer
        .start(&create_test_state(3), at("2023-03-01T00:00:00Z"))
        .wait()
        .unwrap();
    assert!(result.size_bytes > 0);
    assert_eq!(result.created_at, at("2023-03-01T00:00:00Z"));

    let tmp = PathBuf::from("/state/snapshot.tmp");
    assert_eq!(
        writer.log(),
        vec![
            Io::Write(tmp.clone()),
            Io::FsyncFile(tmp.clone()),
            Io::Rename(tmp, snapshot_path()),
            Io::FsyncDir(PathBuf::from("/state")),
        ]
    );
}

#[test]
fn checkpoint_output_is_zstd_json() {
    let writer = FakeCheckpointWriter::default();
    Checkpointer::with_writer(writer.clone(), snapshot_path())
        .checkpoint_sync(&create_test_state(2), at("2023-03-01T00:00:00Z"))
        .unwrap();

    let compressed = writer.data(&snapshot_path()).unwrap();
    assert_eq!(&compressed[..4], &[0x28, 0xb5, 0x2f, 0xfd]);
    let json: serde_json::Value =
        serde_json::from_slice(&zstd::decode_all(compressed.as_slice()).unwrap()).unwrap();
    assert_eq!(json["v"], 1);
    assert_eq!(json["state"]["jobs"].as_object().unwrap().len(), 2);
}

#[test]
fn write_failure_is_reported() {
    let writer = FakeCheckpointWriter::default();
    writer.fail_write.store(true, Ordering::SeqCst);
    let err = Checkpointer::with_writer(writer.clone(), snapshot_path())
        .checkpoint_sync(&create_test_state(1), at("2023-03-01T00:00:00Z"))
        .unwrap_err();
    assert!(matches!(err, CheckpointError::Io(_)));
    assert!(writer.log().is_empty());
}

#[test]
fn fsync_failure_stops_before_rename() {
    let writer = FakeCheckpointWriter::default();
    writer.fail_fsync_file.store(true, Ordering::SeqCst);
    let result = Checkpointer::with_writer(writer.clone(), snapshot_path())
        .start(&create_test_state(1), at("2023-03-01T00:00:00Z"))
        .wait();
    assert!(result.is_err());
    assert!(!writer
        .log()
        .iter()
        .any(|io| matches!(io, Io::Rename(..))));
}

#[test]
fn dir_fsync_failure_is_reported_after_rename() {
    let writer = FakeCheckpointWriter::default();
    writer.fail_fsync_dir.store(true, Ordering::SeqCst);
    let result = Checkpointer::with_writer(writer.clone(), snapshot_path())
        .checkpoint_sync(&create_test_state(1), at("2023-03-01T00:00:00Z"));
    assert!(result.is_err());
    assert!(writer.data(&snapshot_path()).is_some());
}

#[test]
fn try_wait_eventually_completes() {
    let writer = FakeCheckpointWriter::default();
    let handle = Checkpointer::with_writer(writer, snapshot_path())
        .start(&create_test_state(1), at("2023-03-01T00:00:00Z"));
    let mut done = None;
    for _ in 0..200 {
        if let Some(result) = handle.try_wait() {
            done = Some(result);
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    assert!(done.unwrap().is_ok());
}

#[test]
fn real_filesystem_round_trip_with_high_compression() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("snapshot.zst");
    let checkpointer = Checkpointer::new(path.clone()).with_compression_level(19);
    assert_eq!(checkpointer.snapshot_path(), path.as_path());

    let result = checkpointer
        .checkpoint_sync(&create_test_state(50), at("2023-03-01T00:00:00Z"))
        .unwrap();
    assert_eq!(result.size_bytes, std::fs::metadata(&path).unwrap().len());
    assert!(!path.with_extension("tmp").exists());

    let loaded = Snapshot::load(&path).unwrap().unwrap();
    assert_eq!(loaded.state.jobs.len(), 50);
}
