// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PagerDuty Events API v2 sender; the channel secret is the routing key.

use super::{BatchKey, BatchSender, NotifyError};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use skein_core::{EventType, NotifyAttrs};

pub const PAGERDUTY_API: &str = "https://events.pagerduty.com";

#[derive(Clone)]
pub struct PagerDutySender {
    client: reqwest::Client,
    api_url: String,
}

impl PagerDutySender {
    pub fn new(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct EnqueueRequest<'a> {
    routing_key: &'a str,
    event_action: &'static str,
    payload: Payload,
}

#[derive(Debug, Serialize)]
struct Payload {
    summary: String,
    source: String,
    severity: &'static str,
    custom_details: Map<String, Value>,
}

pub(crate) fn enqueue_request<'a>(routing_key: &'a str, attrs: &NotifyAttrs) -> EnqueueRequest<'a> {
    let event = &attrs.job_event;
    let kind = match event.event_type {
        EventType::SlaMiss => "SLA Breached",
        _ => "Failure",
    };
    let mut details = event.values.clone();
    details.insert("owner".to_string(), Value::String(attrs.owner.clone()));
    details.insert(
        "tenant".to_string(),
        Value::String(event.tenant.to_string()),
    );
    EnqueueRequest {
        routing_key,
        event_action: "trigger",
        payload: Payload {
            summary: format!("[Job] {kind} | {} | {}", event.tenant, event.job_name),
            source: event.job_name.to_string(),
            severity: "critical",
            custom_details: details,
        },
    }
}

#[async_trait]
impl BatchSender for PagerDutySender {
    fn name(&self) -> &'static str {
        "pagerduty"
    }

    async fn send(&self, key: &BatchKey, events: &[NotifyAttrs]) -> Result<(), NotifyError> {
        let url = format!("{}/v2/enqueue", self.api_url);
        for attrs in events {
            let resp = self
                .client
                .post(&url)
                .json(&enqueue_request(&key.secret, attrs))
                .send()
                .await
                .map_err(|source| NotifyError::Http {
                    url: url.clone(),
                    source,
                })?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(NotifyError::Status {
                    status: status.as_u16(),
                    url,
                    body,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "pagerduty_tests.rs"]
mod tests;
