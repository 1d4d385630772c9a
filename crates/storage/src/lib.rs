// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Storage layer for skein: materialized tables, snapshots and secret encryption

mod checkpoint;
mod crypto;
mod snapshot;
mod state;

pub use checkpoint::{
    CheckpointError, CheckpointHandle, CheckpointResult, CheckpointWriter, Checkpointer,
    FsCheckpointWriter,
};
pub use crypto::{AppKey, CryptoError, SecretCipher, APP_KEY_LEN};
pub use snapshot::{Snapshot, SnapshotError, CURRENT_SNAPSHOT_VERSION};
pub use state::{MaterializedState, Record};
