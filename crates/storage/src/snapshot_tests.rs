// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::Checkpointer;
use skein_core::test_support::{at, job_with_details, project};
use std::io::Write;
use tempfile::tempdir;

fn create_test_state() -> MaterializedState {
    let mut state = MaterializedState::default();
    state.upsert_project(project(), at("2023-01-01T00:00:00Z"));
    state.upsert_job(job_with_details("job-a"), at("2023-01-01T00:00:00Z"));
    state
}

fn write_raw(path: &Path, bytes: &[u8]) {
    let mut f = File::create(path).unwrap();
    f.write_all(bytes).unwrap();
}

#[test]
fn load_nonexistent_is_none() {
    let dir = tempdir().unwrap();
    assert!(Snapshot::load(&dir.path().join("missing.zst")).unwrap().is_none());
}

#[test]
fn checkpoint_then_load_preserves_state() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.zst");
    let created_at = at("2023-03-01T00:00:00Z");

    Checkpointer::new(path.clone())
        .checkpoint_sync(&create_test_state(), created_at)
        .unwrap();

    let loaded = Snapshot::load(&path).unwrap().unwrap();
    assert_eq!(loaded.version, CURRENT_SNAPSHOT_VERSION);
    assert_eq!(loaded.created_at, created_at);
    assert_eq!(loaded.state.get_job("proj", "job-a").unwrap().get_name(), "job-a");
    assert!(loaded.state.get_project("proj").is_ok());
}

#[test]
fn corrupt_snapshot_moves_to_bak() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.zst");
    write_raw(&path, b"\xe5\x03\x01binary-garbage");

    assert!(Snapshot::load(&path).unwrap().is_none());
    assert!(!path.exists());
    assert!(path.with_extension("bak").exists());
}

#[test]
fn corrupt_snapshots_rotate_bak_files() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.zst");

    for i in 1..=4u8 {
        write_raw(&path, &[i; 4]);
        assert!(Snapshot::load(&path).unwrap().is_none());
    }

    assert_eq!(fs::read(path.with_extension("bak")).unwrap(), vec![4u8; 4]);
    assert_eq!(fs::read(path.with_extension("bak.2")).unwrap(), vec![3u8; 4]);
    assert_eq!(fs::read(path.with_extension("bak.3")).unwrap(), vec![2u8; 4]);
    assert!(!path.with_extension("bak.4").exists());
}

#[test]
fn uncompressed_json_is_treated_as_corrupt() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.zst");
    let snapshot = Snapshot::new(create_test_state(), at("2023-03-01T00:00:00Z"));
    write_raw(&path, &serde_json::to_vec(&snapshot).unwrap());

    assert!(Snapshot::load(&path).unwrap().is_none());
    assert!(path.with_extension("bak").exists());
}

#[test]
fn too_new_snapshot_is_an_error_and_kept() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.zst");
    let json = serde_json::json!({
        "v": CURRENT_SNAPSHOT_VERSION + 1,
        "state": {},
        "created_at": "2023-03-01T00:00:00Z",
    });
    let compressed = zstd::encode_all(serde_json::to_vec(&json).unwrap().as_slice(), 3).unwrap();
    write_raw(&path, &compressed);

    let err = Snapshot::load(&path).unwrap_err();
    assert!(matches!(err, SnapshotError::TooNew { found: 2, supported: 1 }));
    assert!(path.exists());
}
