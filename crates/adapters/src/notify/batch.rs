// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background batcher shared by the chat and pager notifiers.
//!
//! `notify` resolves the route to receivers and enqueues; a worker task
//! groups queued alerts by `(receiver, secret)` and hands each group to the
//! [`BatchSender`] every batch interval. `close` flushes and joins the worker.

use super::{Notifier, NotifierStats, NotifierStatsSnapshot, NotifyError};
use async_trait::async_trait;
use parking_lot::Mutex;
use skein_core::NotifyAttrs;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_BATCH_INTERVAL: Duration = Duration::from_secs(5);

/// Where a batch goes and the credential it is sent with
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BatchKey {
    pub receiver: String,
    pub secret: String,
}

impl fmt::Debug for BatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchKey")
            .field("receiver", &self.receiver)
            .field("secret", &"*redacted*")
            .finish()
    }
}

/// Service-specific half of a batching notifier
#[async_trait]
pub trait BatchSender: Send + Sync + 'static {
    /// Service name used in logs
    fn name(&self) -> &'static str;

    /// Receivers an alert's route expands to.
    async fn resolve(&self, attrs: &NotifyAttrs) -> Result<Vec<String>, NotifyError> {
        Ok(vec![attrs.route.clone()])
    }

    /// Deliver one batch of alerts to one receiver.
    async fn send(&self, key: &BatchKey, events: &[NotifyAttrs]) -> Result<(), NotifyError>;
}

enum Command {
    Push(BatchKey, NotifyAttrs),
    Close(oneshot::Sender<()>),
}

/// A [`Notifier`] that batches alerts per receiver and sends on a timer
pub struct BatchingNotifier<S> {
    sender: Arc<S>,
    tx: mpsc::UnboundedSender<Command>,
    worker: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<NotifierStats>,
}

impl<S: BatchSender> BatchingNotifier<S> {
    /// Start the worker. Must be called inside a tokio runtime.
    pub fn new(sender: S, interval: Duration) -> Self {
        let sender = Arc::new(sender);
        let stats = Arc::new(NotifierStats::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(
            Arc::clone(&sender),
            Arc::clone(&stats),
            rx,
            interval,
        ));
        Self {
            sender,
            tx,
            worker: Mutex::new(Some(worker)),
            stats,
        }
    }
}

#[async_trait]
impl<S: BatchSender> Notifier for BatchingNotifier<S> {
    async fn notify(&self, attrs: NotifyAttrs) -> Result<(), NotifyError> {
        let receivers = match self.sender.resolve(&attrs).await {
            Ok(receivers) if receivers.is_empty() => {
                self.stats.record_error();
                return Err(NotifyError::Route(format!(
                    "failed to find notification route {}",
                    attrs.route
                )));
            }
            Ok(receivers) => receivers,
            Err(e) => {
                self.stats.record_error();
                return Err(e);
            }
        };

        for receiver in receivers {
            let key = BatchKey {
                receiver,
                secret: attrs.secret.clone(),
            };
            self.tx
                .send(Command::Push(key, attrs.clone()))
                .map_err(|_| NotifyError::Closed)?;
        }
        self.stats.record_push();
        Ok(())
    }

    async fn close(&self) -> Result<(), NotifyError> {
        let Some(worker) = self.worker.lock().take() else {
            return Ok(());
        };
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Command::Close(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
        if let Err(e) = worker.await {
            tracing::warn!(notifier = self.sender.name(), error = %e, "notify worker panicked");
        }
        Ok(())
    }

    fn stats(&self) -> NotifierStatsSnapshot {
        self.stats.snapshot()
    }
}

impl<S> Drop for BatchingNotifier<S> {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.lock().take() {
            worker.abort();
        }
    }
}

async fn run_worker<S: BatchSender>(
    sender: Arc<S>,
    stats: Arc<NotifierStats>,
    mut rx: mpsc::UnboundedReceiver<Command>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut batches: BTreeMap<BatchKey, Vec<NotifyAttrs>> = BTreeMap::new();

    loop {
        tokio::select! {
            cmd = rx.recv() => match cmd {
                Some(Command::Push(key, attrs)) => {
                    batches.entry(key).or_default().push(attrs);
                }
                Some(Command::Close(done)) => {
                    flush(sender.as_ref(), &stats, &mut batches).await;
                    let _ = done.send(());
                    return;
                }
                None => {
                    flush(sender.as_ref(), &stats, &mut batches).await;
                    return;
                }
            },
            _ = ticker.tick() => {
                flush(sender.as_ref(), &stats, &mut batches).await;
            }
        }
    }
}

async fn flush<S: BatchSender>(
    sender: &S,
    stats: &NotifierStats,
    batches: &mut BTreeMap<BatchKey, Vec<NotifyAttrs>>,
) {
    for (key, events) in std::mem::take(batches) {
        if let Err(e) = sender.send(&key, &events).await {
            stats.record_error();
            let jobs: Vec<&str> = events.iter().map(|a| a.job_event.job_name.as_str()).collect();
            tracing::error!(
                notifier = sender.name(),
                receiver = %key.receiver,
                ?jobs,
                error = %e,
                "failed to send notification batch"
            );
        }
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
