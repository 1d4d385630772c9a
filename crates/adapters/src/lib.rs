// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O: object buckets, the batch scheduler and
//! alert notifiers

pub mod bucket;
pub mod notify;
pub mod scheduler;
pub mod traced;

pub use bucket::{Bucket, BucketError, BucketOpener, FileBucket, GcsBucket, MemBucket};
pub use notify::{
    BatchingNotifier, Notifier, NotifierStatsSnapshot, NotifyError, PagerDutySender, SlackSender,
};
pub use scheduler::{
    AirflowScheduler, DeployThrottle, Scheduler, SchedulerError, TenantDetailsSource,
};
pub use traced::{TracedNotifier, TracedScheduler};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use notify::FakeNotifier;
#[cfg(any(test, feature = "test-support"))]
pub use scheduler::{FakeScheduler, SchedulerCall};
