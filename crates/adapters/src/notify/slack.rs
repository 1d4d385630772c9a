// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Slack Web API sender.
//!
//! Routes: `#channel` posts to the channel, `user@example.com` looks up the
//! user by email and `@handle` expands a user group to its members.

use super::{BatchKey, BatchSender, NotifyError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use skein_core::notify::SLACK_SECRET;
use skein_core::{EventType, NotifyAttrs};

pub const SLACK_API: &str = "https://slack.com/api";

/// SLA entries rendered per event before the list is truncated
pub const MAX_SLA_EVENTS: usize = 6;

#[derive(Clone)]
pub struct SlackSender {
    client: reqwest::Client,
    api_url: String,
}

impl SlackSender {
    pub fn new(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        token: &str,
        method: &str,
        query: &[(&str, &str)],
    ) -> Result<T, NotifyError> {
        let url = format!("{}/{method}", self.api_url);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|source| NotifyError::Http {
                url: url.clone(),
                source,
            })?;
        read_slack_response(url, resp).await
    }
}

#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    rest: Value,
}

async fn read_slack_response<T: DeserializeOwned>(
    url: String,
    resp: reqwest::Response,
) -> Result<T, NotifyError> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|source| NotifyError::Http {
            url: url.clone(),
            source,
        })?;
    if !status.is_success() {
        return Err(NotifyError::Status {
            status: status.as_u16(),
            url,
            body,
        });
    }
    let parsed: SlackResponse = serde_json::from_str(&body)
        .map_err(|e| NotifyError::Api(format!("invalid response from {url}: {e}")))?;
    if !parsed.ok {
        return Err(NotifyError::Api(
            parsed.error.unwrap_or_else(|| "unknown error".to_string()),
        ));
    }
    serde_json::from_value(parsed.rest)
        .map_err(|e| NotifyError::Api(format!("invalid response from {url}: {e}")))
}

#[derive(Deserialize)]
struct UserByEmail {
    user: SlackUser,
}

#[derive(Deserialize)]
struct SlackUser {
    id: String,
}

#[derive(Deserialize)]
struct UserGroups {
    #[serde(default)]
    usergroups: Vec<UserGroup>,
}

#[derive(Deserialize)]
struct UserGroup {
    id: String,
    handle: String,
}

#[derive(Deserialize)]
struct UserGroupMembers {
    #[serde(default)]
    users: Vec<String>,
}

#[async_trait]
impl BatchSender for SlackSender {
    fn name(&self) -> &'static str {
        "slack"
    }

    async fn resolve(&self, attrs: &NotifyAttrs) -> Result<Vec<String>, NotifyError> {
        if attrs.secret.is_empty() {
            return Err(NotifyError::Route(format!(
                "failed to find authentication token of bot required for sending notifications, please register {SLACK_SECRET} secret"
            )));
        }
        let route = attrs.route.as_str();
        if route.starts_with('#') {
            return Ok(vec![route.to_string()]);
        }
        if let Some(handle) = route.strip_prefix('@') {
            let groups: UserGroups = self.get(&attrs.secret, "usergroups.list", &[]).await?;
            let Some(group) = groups.usergroups.into_iter().find(|g| g.handle == handle) else {
                return Ok(Vec::new());
            };
            let members: UserGroupMembers = self
                .get(
                    &attrs.secret,
                    "usergroups.users.list",
                    &[("usergroup", group.id.as_str())],
                )
                .await?;
            return Ok(members.users);
        }
        if route.contains('@') {
            let found: UserByEmail = self
                .get(&attrs.secret, "users.lookupByEmail", &[("email", route)])
                .await?;
            return Ok(vec![found.user.id]);
        }
        Ok(Vec::new())
    }

    async fn send(&self, key: &BatchKey, events: &[NotifyAttrs]) -> Result<(), NotifyError> {
        let url = format!("{}/chat.postMessage", self.api_url);
        let body = json!({
            "channel": key.receiver,
            "blocks": build_message_blocks(events),
            "as_user": true,
        });
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&key.secret)
            .json(&body)
            .send()
            .await
            .map_err(|source| NotifyError::Http {
                url: url.clone(),
                source,
            })?;
        read_slack_response::<Value>(url, resp).await.map(|_| ())
    }
}

fn text_field(values: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    values
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn mrkdwn(text: String) -> Value {
    json!({ "type": "mrkdwn", "text": text })
}

fn plain(text: String) -> Value {
    json!({ "type": "plain_text", "text": text, "emoji": true })
}

fn button(action_id: &str, label: &str, url: String) -> Value {
    json!({
        "type": "actions",
        "elements": [{
            "type": "button",
            "action_id": action_id,
            "text": plain(label.to_string()),
            "style": "danger",
            "url": url,
        }],
    })
}

/// Block Kit message for a batch of alerts sent to one receiver.
pub fn build_message_blocks(events: &[NotifyAttrs]) -> Vec<Value> {
    let mut blocks = Vec::new();
    for (idx, attrs) in events.iter().enumerate() {
        let event = &attrs.job_event;
        let values = &event.values;
        let tenant = match event.tenant.namespace_name() {
            Ok(ns) => format!("{}/{}", event.tenant.project_name(), ns),
            Err(_) => event.tenant.project_name().to_string(),
        };
        let mut fields = vec![
            mrkdwn(format!("*Job:*\n{}", event.job_name)),
            mrkdwn(format!("*Owner:*\n{}", attrs.owner)),
        ];

        match event.event_type {
            EventType::SlaMiss => {
                blocks.push(json!({
                    "type": "header",
                    "text": plain(format!("[Job] SLA Breached | {tenant}")),
                }));
                let slas = values
                    .get("slas")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                for (sla_idx, sla) in slas.iter().enumerate() {
                    let Some(sla) = sla.as_object() else {
                        continue;
                    };
                    let mut item = String::new();
                    if let Some(task) = text_field(sla, "task_id") {
                        item.push_str(&format!("\nTask: {task}"));
                    }
                    if let Some(scheduled_at) = text_field(sla, "scheduled_at") {
                        item.push_str(&format!("\nScheduled at: {scheduled_at}"));
                    }
                    if sla_idx >= MAX_SLA_EVENTS {
                        item.push_str("\nToo many breaches. Truncating...");
                    }
                    if !item.is_empty() {
                        fields.push(mrkdwn(format!("*Breached item:*{item}")));
                    }
                    if sla_idx >= MAX_SLA_EVENTS {
                        break;
                    }
                }
            }
            EventType::JobFailure => {
                blocks.push(json!({
                    "type": "header",
                    "text": plain(format!("[Job] Failure | {tenant}")),
                }));
                for (key, label) in [
                    ("scheduled_at", "Scheduled At"),
                    ("duration", "Duration"),
                    ("task_id", "Task ID"),
                ] {
                    if let Some(value) = text_field(values, key) {
                        fields.push(mrkdwn(format!("*{label}:*\n{value}")));
                    }
                }
            }
            _ => continue,
        }

        blocks.push(json!({ "type": "section", "fields": fields }));

        if let Some(url) = text_field(values, "log_url") {
            blocks.push(button("view_log", "View log :memo:", url));
        }
        if let Some(url) = text_field(values, "job_url") {
            blocks.push(button("view_job", "View job :memo:", url));
        }

        let mut context = Vec::new();
        if let Some(exception) = text_field(values, "exception") {
            context.push(plain(format!("Exception:\n{exception}")));
        }
        if let Some(message) = text_field(values, "message") {
            context.push(plain(format!("Message:\n{message}")));
        }
        if !context.is_empty() {
            blocks.push(json!({ "type": "context", "elements": context }));
        }

        if idx + 1 != events.len() {
            blocks.push(json!({ "type": "divider" }));
        }
    }
    blocks
}

#[cfg(test)]
#[path = "slack_tests.rs"]
mod tests;
