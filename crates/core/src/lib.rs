// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! skein-core: Domain model of the skein job-run orchestration service

pub mod clock;
pub mod cron;
pub mod dag;
pub mod duration;
pub mod error;
pub mod event;
pub mod filter;
pub mod id;
pub mod job;
pub mod notify;
pub mod priority;
pub mod replay;
pub mod run;
pub mod tenant;
pub mod window;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use cron::{parse_cron_schedule, ScheduleSpec};
pub use dag::{DagError, MultiRootDag};
pub use error::{Entity, Error, ErrorKind, MultiError, Result};
pub use event::{Event, EventCategory, EventType, SlaObject};
pub use filter::{Filter, FilterOpt, Operand};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use job::{Job, JobName, JobUpstream, JobWithDetails, Upstreams};
pub use notify::{ChannelUrl, NotifyAttrs};
pub use priority::{PriorityResolver, SimplePriorityResolver, TreePriorityResolver};
pub use replay::{Replay, ReplayConfig, ReplayId, ReplayState, ReplayWithRun};
pub use run::{
    Executor, ExecutorInput, ExecutorType, JobRun, JobRunId, JobRunStatus, JobRunStatusList,
    JobRunsCriteria, OperatorRun, OperatorRunId, OperatorType, RunConfig, State,
};
pub use tenant::{
    Namespace, NamespaceName, PlainTextSecret, Project, ProjectName, Tenant, TenantDetails,
};
pub use window::Window;
