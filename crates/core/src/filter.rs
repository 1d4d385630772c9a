// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Optional query predicates passed between layers.
//!
//! Each [`Operand`] is a single bit; a [`Filter`] records which operands are
//! set in one word so callers can test for a combination with a single mask.

use std::collections::HashMap;

/// A filterable field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Operand(u64);

impl Operand {
    pub const PROJECT_NAME: Operand = Operand(1 << 0);
    pub const NAMESPACE_NAME: Operand = Operand(1 << 1);
    pub const NAMESPACE_NAMES: Operand = Operand(1 << 2);
    pub const JOB_NAME: Operand = Operand(1 << 3);
    pub const JOB_NAMES: Operand = Operand(1 << 4);
    pub const RESOURCE_DESTINATION: Operand = Operand(1 << 5);
    pub const REPLAY_ID: Operand = Operand(1 << 6);
    pub const REPLAY_STATUS: Operand = Operand(1 << 7);
    pub const RUN_STATE: Operand = Operand(1 << 8);

    pub fn bit(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    String(String),
    Strings(Vec<String>),
}

/// A single filter option; empty values are dropped
#[derive(Debug, Clone)]
pub struct FilterOpt {
    operand: Operand,
    value: Option<Value>,
}

pub fn with_string(operand: Operand, value: impl Into<String>) -> FilterOpt {
    let value = value.into();
    FilterOpt {
        operand,
        value: (!value.is_empty()).then_some(Value::String(value)),
    }
}

pub fn with_string_array<I, S>(operand: Operand, values: I) -> FilterOpt
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let values: Vec<String> = values.into_iter().map(Into::into).collect();
    FilterOpt {
        operand,
        value: (!values.is_empty()).then_some(Value::Strings(values)),
    }
}

/// A bitset of set operands plus their values
#[derive(Debug, Clone, Default)]
pub struct Filter {
    bits: u64,
    values: HashMap<Operand, Value>,
}

impl Filter {
    pub fn new(opts: impl IntoIterator<Item = FilterOpt>) -> Self {
        let mut filter = Self::default();
        for opt in opts {
            if let Some(value) = opt.value {
                filter.bits |= opt.operand.bit();
                filter.values.insert(opt.operand, value);
            }
        }
        filter
    }

    /// True when every given operand is set.
    pub fn contains(&self, operands: &[Operand]) -> bool {
        let mask = operands.iter().fold(0u64, |acc, op| acc | op.bit());
        mask != 0 && self.bits & mask == mask
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// String value of an operand, or `""` when unset.
    pub fn get_string_value(&self, operand: Operand) -> &str {
        match self.values.get(&operand) {
            Some(Value::String(s)) => s,
            _ => "",
        }
    }

    /// Array value of an operand, or empty when unset.
    pub fn get_string_array_value(&self, operand: Operand) -> &[String] {
        match self.values.get(&operand) {
            Some(Value::Strings(v)) => v,
            _ => &[],
        }
    }
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
