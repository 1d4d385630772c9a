// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    slack = { "slack://#chanel-name", "slack", "#chanel-name", "NOTIFY_SLACK" },
    slack_user = { "slack://@someone", "slack", "@someone", "NOTIFY_SLACK" },
    pagerduty = { "pagerduty://#chanel-name", "pagerduty", "#chanel-name", "NOTIFY_CHANEL-NAME" },
)]
fn parses_channel(url: &str, scheme: &str, route: &str, secret: &str) {
    let channel = ChannelUrl::parse(url).unwrap();
    assert_eq!(channel.scheme, scheme);
    assert_eq!(channel.route, route);
    assert_eq!(channel.secret_name(), secret);
    assert_eq!(channel.to_string(), url);
}

#[parameterized(
    no_scheme = { "#chanel" },
    empty_route = { "slack://" },
    empty_scheme = { "://x" },
)]
fn rejects_malformed_channel(url: &str) {
    let err = ChannelUrl::parse(url).unwrap_err();
    assert_eq!(err.message(), format!("invalid channel url {url}"));
}
