// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Alert routing: channel URLs and the payload handed to a notifier.

use crate::event::Event;
use crate::{Entity, Error, Result};
use std::fmt;

pub const SLACK_SCHEME: &str = "slack";
pub const PAGERDUTY_SCHEME: &str = "pagerduty";

/// Secret holding the Slack bot token for a whole tenant
pub const SLACK_SECRET: &str = "NOTIFY_SLACK";

/// What a notifier needs to deliver one alert
#[derive(Debug, Clone, PartialEq)]
pub struct NotifyAttrs {
    pub owner: String,
    pub job_event: Event,
    pub secret: String,
    pub route: String,
}

/// A parsed `scheme://route` alert channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelUrl {
    pub scheme: String,
    pub route: String,
}

impl ChannelUrl {
    pub fn parse(url: &str) -> Result<Self> {
        match url.split_once("://") {
            Some((scheme, route)) if !scheme.is_empty() && !route.is_empty() => Ok(Self {
                scheme: scheme.to_string(),
                route: route.to_string(),
            }),
            _ => Err(Error::invalid_argument(
                Entity::Notifier,
                format!("invalid channel url {url}"),
            )),
        }
    }

    /// Name of the tenant secret used to authenticate this channel.
    ///
    /// Slack shares one token per tenant; every other scheme keys the
    /// secret by route, e.g. `pagerduty://#payments` reads `NOTIFY_PAYMENTS`.
    pub fn secret_name(&self) -> String {
        if self.scheme == SLACK_SCHEME {
            SLACK_SECRET.to_string()
        } else {
            format!("NOTIFY_{}", self.route.trim_start_matches('#')).to_ascii_uppercase()
        }
    }
}

impl fmt::Display for ChannelUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.route)
    }
}

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
