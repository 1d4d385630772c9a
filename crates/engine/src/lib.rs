// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! skein control-plane engine: deployment, job-run ingest, alert fan-out
//! and the replay validator, worker and manager

mod error;
mod manager;
mod runtime;
mod telemetry;
mod tenants;
mod validator;

#[cfg(any(test, feature = "test-support"))]
pub mod test_helpers;

pub use error::{EngineError, EngineResult};
pub use manager::{ManagerConfig, ReplayManager};
pub use runtime::{expected_runs, Engine, EngineConfig, EngineDeps};
pub use telemetry::{NotifierCounts, Telemetry, TelemetrySnapshot};
pub use tenants::StateTenants;
pub use validator::ReplayValidator;
