// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide event counters

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use skein_adapters::NotifierStatsSnapshot;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every service of one engine
#[derive(Debug, Default)]
pub struct Telemetry {
    job_event_failure: AtomicU64,
    job_event_slamiss: AtomicU64,
    jobrun_events: Mutex<BTreeMap<String, u64>>,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub job_event_failure: u64,
    pub job_event_slamiss: u64,
    /// `jobrun_events_total` by status
    pub jobrun_events_total: BTreeMap<String, u64>,
    /// Pushes and errors per notifier scheme
    pub notifiers: BTreeMap<String, NotifierCounts>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifierCounts {
    pub pushed: u64,
    pub errors: u64,
}

impl From<NotifierStatsSnapshot> for NotifierCounts {
    fn from(stats: NotifierStatsSnapshot) -> Self {
        Self {
            pushed: stats.pushed,
            errors: stats.errors,
        }
    }
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_job_failure(&self) {
        self.job_event_failure.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sla_miss(&self) {
        self.job_event_slamiss.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one `jobrun_events_total{status}` sample.
    pub fn record_run_event(&self, status: &str) {
        *self.jobrun_events.lock().entry(status.to_string()).or_default() += 1;
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            job_event_failure: self.job_event_failure.load(Ordering::Relaxed),
            job_event_slamiss: self.job_event_slamiss.load(Ordering::Relaxed),
            jobrun_events_total: self.jobrun_events.lock().clone(),
            notifiers: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
#[path = "telemetry_tests.rs"]
mod tests;
