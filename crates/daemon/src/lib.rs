// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! skein daemon library
//!
//! Exposes the IPC protocol for CLI clients and the lifecycle and listener
//! that the `skeind` binary drives.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod env;
pub mod lifecycle;
pub mod listener;
pub mod protocol;

pub use config::{Config, ConfigError, Settings};
pub use lifecycle::{DaemonEngine, DaemonState, LifecycleError, StartupResult};
pub use listener::{ListenCtx, Listener};
pub use protocol::{Request, Response, DEFAULT_TIMEOUT, MAX_MESSAGE_SIZE, PROTOCOL_VERSION};
