// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Table renderer for the CLI's list views (job runs, replays, telemetry).
//!
//! Widths come from the data. Color is applied after padding so escape codes
//! never count toward a column's width.

use std::io::Write;

use crate::color;

const SEP: &str = "  ";

pub enum Align {
    Left,
    Right,
}

/// How a cell's text is styled after padding.
pub enum CellStyle {
    Plain,
    Muted,
    /// Colored by [`color::apply_state`]
    State,
}

pub struct Column {
    pub name: &'static str,
    pub align: Align,
    pub style: CellStyle,
    /// Longer values are cut to this many characters
    pub max_width: Option<usize>,
}

impl Column {
    fn new(name: &'static str, align: Align, style: CellStyle) -> Self {
        Self {
            name,
            align,
            style,
            max_width: None,
        }
    }

    pub fn left(name: &'static str) -> Self {
        Self::new(name, Align::Left, CellStyle::Plain)
    }

    pub fn right(name: &'static str) -> Self {
        Self::new(name, Align::Right, CellStyle::Plain)
    }

    pub fn muted(name: &'static str) -> Self {
        Self::new(name, Align::Left, CellStyle::Muted)
    }

    pub fn state(name: &'static str) -> Self {
        Self::new(name, Align::Left, CellStyle::State)
    }

    pub fn with_max(mut self, max: usize) -> Self {
        self.max_width = Some(max);
        self
    }
}

pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
    colorize: bool,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self::with_color(columns, color::should_colorize())
    }

    pub fn with_color(columns: Vec<Column>, colorize: bool) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            colorize,
        }
    }

    pub fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render header and rows. An empty table renders nothing; a
    /// left-aligned last column is never padded.
    pub fn render(&self, out: &mut impl Write) {
        if self.rows.is_empty() {
            return;
        }

        let widths = self.widths();
        let last = self.columns.len().saturating_sub(1);

        let header: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let padded = pad(col.name, widths[i], &col.align, i == last);
                if self.colorize {
                    color::apply_header(&padded)
                } else {
                    padded
                }
            })
            .collect();
        let _ = writeln!(out, "{}", header.join(SEP));

        for row in &self.rows {
            let cells: Vec<String> = self
                .columns
                .iter()
                .enumerate()
                .map(|(i, col)| {
                    let raw = row.get(i).map(String::as_str).unwrap_or("");
                    let cut = truncate(raw, col.max_width);
                    let padded = pad(cut, widths[i], &col.align, i == last);
                    self.stylize(padded, &col.style)
                })
                .collect();
            let _ = writeln!(out, "{}", cells.join(SEP));
        }
    }

    /// Render to stdout.
    pub fn print(&self) {
        self.render(&mut std::io::stdout().lock());
    }

    fn widths(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let data = self
                    .rows
                    .iter()
                    .map(|row| {
                        let len = row.get(i).map_or(0, |s| s.chars().count());
                        col.max_width.map_or(len, |max| len.min(max))
                    })
                    .max()
                    .unwrap_or(0);
                data.max(col.name.chars().count())
            })
            .collect()
    }

    fn stylize(&self, text: String, style: &CellStyle) -> String {
        if !self.colorize {
            return text;
        }
        match style {
            CellStyle::Plain => text,
            CellStyle::Muted => color::apply_muted(&text),
            CellStyle::State => color::apply_state(&text),
        }
    }
}

fn pad(text: &str, width: usize, align: &Align, is_last: bool) -> String {
    match align {
        Align::Left if is_last => text.to_string(),
        Align::Left => format!("{:<width$}", text),
        Align::Right => format!("{:>width$}", text),
    }
}

/// Cut to at most `max` characters, on a char boundary.
fn truncate(s: &str, max: Option<usize>) -> &str {
    match max.and_then(|m| s.char_indices().nth(m)) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
