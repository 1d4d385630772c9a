// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Alert notifiers: batched delivery of job events to chat and pager services

mod batch;
mod pagerduty;
mod slack;

pub use batch::{BatchKey, BatchSender, BatchingNotifier, DEFAULT_BATCH_INTERVAL};
pub use pagerduty::{PagerDutySender, PAGERDUTY_API};
pub use slack::{build_message_blocks, SlackSender, MAX_SLA_EVENTS, SLACK_API};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeNotifier;

use async_trait::async_trait;
use skein_core::NotifyAttrs;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Errors from notify operations
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("{0}")]
    Route(String),
    #[error("failed to call {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("status code received {status} on calling {url}: {body}")]
    Status { status: u16, url: String, body: String },
    #[error("api error: {0}")]
    Api(String),
    #[error("notifier is closed")]
    Closed,
}

/// Delivers alerts for one channel scheme
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Queue one alert; delivery happens on the notifier's own schedule.
    async fn notify(&self, attrs: NotifyAttrs) -> Result<(), NotifyError>;

    /// Flush anything queued and stop accepting alerts.
    async fn close(&self) -> Result<(), NotifyError>;

    /// Alerts accepted and delivery errors so far.
    fn stats(&self) -> NotifierStatsSnapshot {
        NotifierStatsSnapshot::default()
    }
}

/// Push and error counters shared between a notifier and its worker
#[derive(Debug, Default)]
pub struct NotifierStats {
    pushed: AtomicU64,
    errors: AtomicU64,
}

impl NotifierStats {
    pub fn record_push(&self) {
        self.pushed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> NotifierStatsSnapshot {
        NotifierStatsSnapshot {
            pushed: self.pushed.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifierStatsSnapshot {
    pub pushed: u64,
    pub errors: u64,
}
