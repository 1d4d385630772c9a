// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::IsTerminal;

pub mod codes {
    /// Section headers: steel blue
    pub const HEADER: u8 = 74;
    /// Secondary text: darker grey
    pub const MUTED: u8 = 240;

    pub const GREEN: u8 = 32;
    pub const YELLOW: u8 = 33;
    pub const RED: u8 = 31;
}

const RESET: &str = "\x1b[0m";

/// Determine if color output should be enabled.
///
/// Priority: `NO_COLOR=1` disables → `COLOR=1` forces → TTY check.
pub fn should_colorize() -> bool {
    if crate::env::no_color() {
        return false;
    }
    if crate::env::force_color() {
        return true;
    }
    std::io::stdout().is_terminal()
}

fn fg256(code: u8) -> String {
    format!("\x1b[38;5;{code}m")
}

/// Format text with the header color, respecting color settings.
pub fn header(text: &str) -> String {
    if should_colorize() {
        apply_header(text)
    } else {
        text.to_string()
    }
}

pub(crate) fn apply_header(text: &str) -> String {
    format!("{}{}{}", fg256(codes::HEADER), text, RESET)
}

pub(crate) fn apply_muted(text: &str) -> String {
    format!("{}{}{}", fg256(codes::MUTED), text, RESET)
}

/// Color a run or replay state by what it means for the operator.
///
/// - Green: success, replayed, running, accepted
/// - Yellow: pending, queued, created, in progress, partial replayed,
///   wait upstream
/// - Red: failed, invalid
///
/// Matching is on the first word so `in progress` and `in_progress` color
/// the same. Unknown states are left plain.
pub fn state(text: &str) -> String {
    if !should_colorize() {
        return text.to_string();
    }
    apply_state(text)
}

pub(crate) fn apply_state(text: &str) -> String {
    let lower = text.trim_start().to_lowercase();
    let first_word = lower
        .split(|c: char| !c.is_alphabetic())
        .next()
        .unwrap_or("");
    let code = match first_word {
        "success" | "replayed" | "running" | "accepted" => codes::GREEN,
        "pending" | "queued" | "created" | "in" | "partial" | "wait" => codes::YELLOW,
        "failed" | "invalid" => codes::RED,
        _ => return text.to_string(),
    };
    format!("\x1b[{code}m{text}{RESET}")
}

#[cfg(test)]
#[path = "color_tests.rs"]
mod tests;
