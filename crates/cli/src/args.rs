// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Argument parsers shared by the subcommands.

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::Args;
use serde_json::{Map, Value};

/// Project and namespace, falling back to `SKEIN_PROJECT` / `SKEIN_NAMESPACE`.
#[derive(Args, Debug, Clone, Default)]
pub struct TenantArgs {
    /// Project name [env: SKEIN_PROJECT]
    #[arg(short = 'p', long)]
    pub project: Option<String>,

    /// Namespace name [env: SKEIN_NAMESPACE]
    #[arg(short = 'n', long)]
    pub namespace: Option<String>,
}

impl TenantArgs {
    pub fn project(&self) -> Result<String> {
        self.project
            .clone()
            .or_else(crate::env::project)
            .ok_or_else(|| anyhow!("no project given; pass --project or set SKEIN_PROJECT"))
    }

    pub fn namespace(&self) -> Result<String> {
        self.namespace
            .clone()
            .or_else(crate::env::namespace)
            .ok_or_else(|| anyhow!("no namespace given; pass --namespace or set SKEIN_NAMESPACE"))
    }
}

/// Parse an RFC 3339 timestamp; a bare date or a zone-less time is UTC.
pub fn parse_time(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(t.and_utc());
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(t) = d.and_hms_opt(0, 0, 0) {
            return Ok(t.and_utc());
        }
    }
    Err(format!(
        "invalid time '{s}': expected RFC 3339 (2023-01-01T00:00:00Z) or a date (2023-01-01)"
    ))
}

/// Parse `KEY=VALUE`.
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("invalid '{s}': expected KEY=VALUE")),
    }
}

/// Parse event values: a JSON object.
pub fn parse_values(s: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(s)? {
        Value::Object(map) => Ok(map),
        other => Err(anyhow!("event values must be a JSON object, got {other}")),
    }
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
