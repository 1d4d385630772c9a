// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Alert fan-out for scheduler events

use super::Engine;
use crate::error::{EngineError, EngineResult};
use skein_core::{ChannelUrl, Clock, Event, EventCategory, IdGen, MultiError, NotifyAttrs};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

impl<C: Clock, G: IdGen> Engine<C, G> {
    /// Send the event to every channel of every job alert it matches.
    ///
    /// Tenant secrets are read at most once, on the first matching channel.
    pub async fn push(&self, cancel: &CancellationToken, event: &Event) -> EngineResult<()> {
        let job = self.job_details(event.tenant.project_name().as_str(), event.job_name.as_str())?;

        let mut secrets: Option<BTreeMap<String, String>> = None;
        let mut errors = MultiError::new("ErrorsInNotifypush");

        for alert in &job.alerts {
            if !event.event_type.is_of_type(alert.on) {
                continue;
            }

            for channel in &alert.channels {
                if cancel.is_cancelled() {
                    return Err(EngineError::Cancelled);
                }
                let url = match ChannelUrl::parse(channel) {
                    Ok(url) => url,
                    Err(e) => {
                        errors.append(format!("notifyChannel.Notify: {channel}: {e}"));
                        continue;
                    }
                };
                let Some(notifier) = self.notifiers.get(&url.scheme) else {
                    errors.append(format!(
                        "notifyChannel.Notify: {channel}: no notifier registered for scheme {}",
                        url.scheme
                    ));
                    continue;
                };

                if secrets.is_none() {
                    match self.secrets_map(event) {
                        Ok(map) => secrets = Some(map),
                        Err(e) => {
                            errors.append(format!("notifyChannel.Notify: {channel}: {e}"));
                            continue;
                        }
                    }
                }
                let secret = secrets
                    .as_ref()
                    .and_then(|map| map.get(&url.secret_name()))
                    .cloned()
                    .unwrap_or_default();

                let attrs = NotifyAttrs {
                    owner: job.metadata.owner.clone(),
                    job_event: event.clone(),
                    secret,
                    route: url.route.clone(),
                };
                if let Err(e) = notifier.notify(attrs).await {
                    tracing::warn!(job = %event.job_name, %channel, error = %e, "notify failed");
                    errors.append(format!("notifyChannel.Notify: {channel}: {e}"));
                }
            }

            match alert.on {
                EventCategory::Failure => self.telemetry.record_job_failure(),
                EventCategory::SlaMiss => self.telemetry.record_sla_miss(),
            }
        }

        Ok(errors.into_result()?)
    }

    fn secrets_map(&self, event: &Event) -> EngineResult<BTreeMap<String, String>> {
        let secrets = self.state.lock().get_secrets(&self.cipher, &event.tenant)?;
        Ok(secrets
            .into_iter()
            .map(|s| (s.name().as_str().to_string(), s.value().to_string()))
            .collect())
    }
}

#[cfg(test)]
#[path = "../runtime_tests/notify_tests.rs"]
mod tests;
