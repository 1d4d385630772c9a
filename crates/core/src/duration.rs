// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compound duration strings such as `"1h30m"`, `"-24h"` or `"1.5s"`.

use chrono::Duration;

/// Parse a signed sequence of `<number><unit>` groups.
///
/// Units: `ns`, `us`/`µs`, `ms`, `s`, `m`, `h`. A bare `"0"` is accepted.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let orig = s;
    let (negative, mut rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    if rest == "0" {
        return Ok(Duration::zero());
    }
    if rest.is_empty() {
        return Err(format!("invalid duration \"{orig}\""));
    }

    let mut total_nanos: i128 = 0;
    while !rest.is_empty() {
        let num_end = rest
            .char_indices()
            .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let num_str = &rest[..num_end];
        if num_str.is_empty() || num_str == "." {
            return Err(format!("invalid duration \"{orig}\""));
        }
        let value: f64 = num_str
            .parse()
            .map_err(|_| format!("invalid duration \"{orig}\""))?;
        rest = &rest[num_end..];

        let unit_end = rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() || *c == '.')
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        let nanos_per_unit: f64 = match unit {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => return Err(format!("missing unit in duration \"{orig}\"")),
            other => return Err(format!("unknown unit \"{other}\" in duration \"{orig}\"")),
        };
        rest = &rest[unit_end..];
        total_nanos += (value * nanos_per_unit).round() as i128;
    }

    let nanos = i64::try_from(total_nanos).map_err(|_| format!("invalid duration \"{orig}\""))?;
    let d = Duration::nanoseconds(nanos);
    Ok(if negative { -d } else { d })
}

/// Render a duration in the same compact form `parse_duration` accepts.
pub fn format_duration(d: Duration) -> String {
    let secs = d.num_seconds();
    if secs == 0 {
        return "0s".to_string();
    }
    let sign = if secs < 0 { "-" } else { "" };
    let secs = secs.unsigned_abs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    let mut out = sign.to_string();
    if h > 0 {
        out.push_str(&format!("{h}h"));
    }
    if m > 0 {
        out.push_str(&format!("{m}m"));
    }
    if s > 0 {
        out.push_str(&format!("{s}s"));
    }
    out
}

#[cfg(test)]
#[path = "duration_tests.rs"]
mod tests;
