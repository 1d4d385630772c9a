// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake notifier for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{Notifier, NotifierStatsSnapshot, NotifyError};
use async_trait::async_trait;
use parking_lot::Mutex;
use skein_core::NotifyAttrs;
use std::sync::Arc;

#[derive(Default)]
struct FakeNotifierState {
    calls: Vec<NotifyAttrs>,
    fail_with: Option<String>,
    errors: u64,
    closed: bool,
}

/// Records every alert it is handed
#[derive(Clone, Default)]
pub struct FakeNotifier {
    inner: Arc<Mutex<FakeNotifierState>>,
}

impl FakeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded alerts
    pub fn calls(&self) -> Vec<NotifyAttrs> {
        self.inner.lock().calls.clone()
    }

    /// Make every subsequent `notify` fail with `message`
    pub fn fail_with(&self, message: &str) {
        self.inner.lock().fail_with = Some(message.to_string());
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn notify(&self, attrs: NotifyAttrs) -> Result<(), NotifyError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(NotifyError::Closed);
        }
        if let Some(message) = inner.fail_with.clone() {
            inner.errors += 1;
            return Err(NotifyError::Api(message));
        }
        inner.calls.push(attrs);
        Ok(())
    }

    async fn close(&self) -> Result<(), NotifyError> {
        self.inner.lock().closed = true;
        Ok(())
    }

    fn stats(&self) -> NotifierStatsSnapshot {
        let inner = self.inner.lock();
        NotifierStatsSnapshot {
            pushed: inner.calls.len() as u64,
            errors: inner.errors,
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
