// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `skein status` - daemon counters at a glance.

use anyhow::Result;
use skein_engine::TelemetrySnapshot;

use crate::client::DaemonClient;
use crate::color;
use crate::output::{format_uptime, print_json, OutputFormat};
use crate::table::{Column, Table};

pub async fn handle(format: OutputFormat) -> Result<()> {
    let status = match DaemonClient::for_query() {
        Ok(client) => match client.status().await {
            Ok(status) => Some(status),
            Err(e) if e.is_not_running() => None,
            Err(e) => return Err(e.into()),
        },
        Err(e) if e.is_not_running() => None,
        Err(e) => return Err(e.into()),
    };

    let Some((uptime_secs, telemetry)) = status else {
        return match format {
            OutputFormat::Text => {
                println!("skein daemon not running");
                Ok(())
            }
            OutputFormat::Json => print_json(&serde_json::json!({ "status": "not_running" })),
        };
    };

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "status": "running",
            "uptime_secs": uptime_secs,
            "telemetry": telemetry,
        })),
        OutputFormat::Text => {
            print!("{}", format_text(uptime_secs, &telemetry));
            Ok(())
        }
    }
}

fn format_text(uptime_secs: u64, telemetry: &TelemetrySnapshot) -> String {
    let mut out = format!(
        "{} running, up {}\n",
        color::header("skeind:"),
        format_uptime(uptime_secs)
    );
    out.push_str(&format!(
        "Job events: {} failure(s), {} SLA miss(es)\n",
        telemetry.job_event_failure, telemetry.job_event_slamiss
    ));

    let mut events = Table::new(vec![Column::state("RUN STATUS"), Column::right("EVENTS")]);
    for (status, count) in &telemetry.jobrun_events_total {
        events.row(vec![status.clone(), count.to_string()]);
    }
    let mut notifiers = Table::new(vec![
        Column::left("NOTIFIER"),
        Column::right("PUSHED"),
        Column::right("ERRORS"),
    ]);
    for (scheme, counts) in &telemetry.notifiers {
        notifiers.row(vec![
            scheme.clone(),
            counts.pushed.to_string(),
            counts.errors.to_string(),
        ]);
    }

    for table in [events, notifiers] {
        if table.is_empty() {
            continue;
        }
        let mut buf = Vec::new();
        table.render(&mut buf);
        out.push('\n');
        out.push_str(&String::from_utf8_lossy(&buf));
    }
    out
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
