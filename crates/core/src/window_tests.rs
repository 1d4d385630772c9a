// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

fn scheduled() -> DateTime<Utc> {
    at(2022, 7, 5, 2, 10, 10)
}

#[parameterized(
    hours = { "24h" },
    compound = { "2h45m" },
    seconds = { "60s" },
    unordered = { "45m24h" },
    empty = { "" },
    zero = { "0" },
    months = { "2M" },
    months_hours = { "45M24h" },
    months_hours_minutes = { "45M24h30m" },
)]
fn valid_sizes(size: &str) {
    assert!(Window::new(2, "", "", size).validate().is_ok());
}

#[parameterized(
    upper_unit = { "60S" },
    no_unit = { "60" },
    days = { "2d" },
    negative = { "-24h" },
    negative_months = { "-45M24h30m" },
)]
fn invalid_sizes(size: &str) {
    assert!(Window::new(2, "", "", size).validate().is_err());
}

#[parameterized(
    hours = { "24h" },
    zero = { "0" },
    months = { "2M" },
    negative_months = { "-45M24h30m" },
)]
fn valid_offsets(offset: &str) {
    assert!(Window::new(2, "", offset, "").validate().is_ok());
}

#[parameterized(
    upper_unit = { "60S" },
    no_unit = { "60" },
)]
fn invalid_offsets(offset: &str) {
    let err = Window::new(2, "", offset, "").validate().unwrap_err();
    assert!(err.message().starts_with("failed to parse non month duration"));
}

#[parameterized(
    seconds = { "s" },
    minutes = { "min" },
    upper_hour = { "H" },
    upper_day = { "D" },
)]
fn invalid_truncate(truncate_to: &str) {
    let err = Window::new(2, truncate_to, "", "").validate().unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid argument for entity window: invalid truncate_to provided, provide one of h, d, w, m, M"
    );
}

#[parameterized(
    truncate_hour = { "h", "0", "24h", at(2022, 7, 4, 2, 0, 0), at(2022, 7, 5, 2, 0, 0) },
    truncate_day = { "d", "0", "24h", at(2022, 7, 4, 0, 0, 0), at(2022, 7, 5, 0, 0, 0) },
    truncate_week = { "w", "0", "24h", at(2022, 7, 3, 0, 0, 0), at(2022, 7, 4, 0, 0, 0) },
    truncate_month = { "M", "0", "24h", at(2022, 6, 30, 0, 0, 0), at(2022, 7, 1, 0, 0, 0) },
    truncate_lower_month = { "m", "0", "24h", at(2022, 6, 30, 0, 0, 0), at(2022, 7, 1, 0, 0, 0) },
    size_hours_minutes = { "d", "0", "24h30m", at(2022, 7, 3, 23, 30, 0), at(2022, 7, 5, 0, 0, 0) },
    size_months = { "M", "0", "2M", at(2022, 5, 1, 0, 0, 0), at(2022, 7, 1, 0, 0, 0) },
    size_months_hours = { "M", "0", "1M24h", at(2022, 5, 30, 0, 0, 0), at(2022, 7, 1, 0, 0, 0) },
    no_size = { "d", "0", "", at(2022, 7, 5, 0, 0, 0), at(2022, 7, 5, 0, 0, 0) },
    positive_offset = { "d", "24h", "24h", at(2022, 7, 5, 0, 0, 0), at(2022, 7, 6, 0, 0, 0) },
    negative_month_offset = { "M", "-1M", "1M", at(2022, 5, 1, 0, 0, 0), at(2022, 6, 1, 0, 0, 0) },
    negative_month_offset_hours = { "M", "-1M24h", "1M", at(2022, 4, 30, 0, 0, 0), at(2022, 5, 30, 0, 0, 0) },
    negative_offset = { "d", "-24h", "24h", at(2022, 7, 3, 0, 0, 0), at(2022, 7, 4, 0, 0, 0) },
    no_offset = { "d", "", "24h", at(2022, 7, 4, 0, 0, 0), at(2022, 7, 5, 0, 0, 0) },
)]
fn computes_range(
    truncate_to: &str,
    offset: &str,
    size: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) {
    let window = Window::new(2, truncate_to, offset, size);
    assert_eq!(window.range(scheduled()).unwrap(), (start, end));
}

#[test]
fn no_truncation_keeps_precision() {
    let t = scheduled() + Duration::nanoseconds(10);
    let window = Window::new(2, "", "0", "24h");
    assert_eq!(window.end_time(t).unwrap(), t);
    assert_eq!(window.start_time(t).unwrap(), t - Duration::hours(24));
}

#[test]
fn already_truncated_time_is_unchanged() {
    let monday = at(2022, 7, 4, 0, 0, 0);
    let window = Window::new(2, "w", "0", "24h");
    assert_eq!(window.end_time(monday).unwrap(), monday);
}

#[test]
fn invalid_window_fails_range() {
    let window = Window::new(2, "x", "", "");
    assert!(window.range(scheduled()).is_err());
}

#[parameterized(
    no_truncation = { "", "0", "24h", at(2020, 7, 10, 6, 33, 22), at(2020, 7, 9, 6, 33, 22), at(2020, 7, 10, 6, 33, 22) },
    hour = { "h", "0", "24h", at(2020, 7, 10, 6, 33, 22), at(2020, 7, 9, 6, 0, 0), at(2020, 7, 10, 6, 0, 0) },
    day = { "d", "0", "24h", at(2020, 7, 10, 6, 33, 22), at(2020, 7, 9, 0, 0, 0), at(2020, 7, 10, 0, 0, 0) },
    day_offset = { "d", "24h", "48h", at(2020, 7, 10, 6, 33, 22), at(2020, 7, 9, 0, 0, 0), at(2020, 7, 11, 0, 0, 0) },
    week_ends_on_sunday = { "w", "0", "168h", at(2020, 7, 10, 6, 33, 22), at(2020, 7, 5, 0, 0, 0), at(2020, 7, 12, 0, 0, 0) },
    month = { "M", "0", "720h", at(2021, 2, 25, 6, 33, 22), at(2021, 2, 1, 0, 0, 0), at(2021, 2, 28, 0, 0, 0) },
    lower_month = { "m", "0", "720h", at(2021, 2, 25, 6, 33, 22), at(2021, 2, 1, 0, 0, 0), at(2021, 2, 28, 0, 0, 0) },
    month_offset = { "M", "720h", "720h", at(2021, 2, 25, 6, 33, 22), at(2021, 3, 1, 0, 0, 0), at(2021, 3, 31, 0, 0, 0) },
    month_negative_offset = { "M", "-720h", "720h", at(2021, 3, 31, 6, 33, 22), at(2021, 2, 1, 0, 0, 0), at(2021, 2, 28, 0, 0, 0) },
    partial_month_size = { "M", "0", "480h", at(2021, 2, 25, 6, 33, 22), at(2021, 2, 1, 0, 0, 0), at(2021, 2, 28, 0, 0, 0) },
    two_months = { "M", "0", "1440h", at(2021, 2, 25, 6, 33, 22), at(2021, 1, 1, 0, 0, 0), at(2021, 2, 28, 0, 0, 0) },
    month_units = { "M", "1M", "1M", at(2021, 2, 25, 6, 33, 22), at(2021, 3, 1, 0, 0, 0), at(2021, 3, 31, 0, 0, 0) },
)]
fn version_one_range(
    truncate_to: &str,
    offset: &str,
    size: &str,
    scheduled_at: DateTime<Utc>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) {
    let window = Window::new(1, truncate_to, offset, size);
    assert_eq!(window.range(scheduled_at).unwrap(), (start, end));
}

#[test]
fn version_one_defaults_to_a_day() {
    let window = Window::new(1, "d", "", "");
    assert_eq!(
        window.range(at(2020, 7, 10, 6, 33, 22)).unwrap(),
        (at(2020, 7, 9, 0, 0, 0), at(2020, 7, 10, 0, 0, 0))
    );
}
