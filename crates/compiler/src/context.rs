// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layered template contexts.
//!
//! Each layer is a string map published under its own name (`proj`,
//! `secret`, `inst`, `task`), optionally also flattened into the top level
//! with a key prefix or as-is. Later layers win on key collisions.

use crate::template::TemplateContext;
use serde_json::Value;
use std::collections::BTreeMap;

/// Prefix for task configs flattened into a hook's context
pub const TASK_CONFIG_PREFIX: &str = "TASK__";
/// Prefix for project (and namespace) configs flattened into the context
pub const PROJECT_CONFIG_PREFIX: &str = "GLOBAL__";

pub const CONTEXT_PROJECT: &str = "proj";
pub const CONTEXT_SECRET: &str = "secret";
pub const CONTEXT_SYSTEM_DEFINED: &str = "inst";
pub const CONTEXT_TASK: &str = "task";

/// One named layer of template variables
#[derive(Debug, Clone, Default)]
pub struct ContextLayer {
    name: Option<String>,
    values: BTreeMap<String, String>,
    key_prefix: Option<String>,
    add_to_context: bool,
}

impl ContextLayer {
    /// A layer from one or more maps; later maps override earlier ones.
    pub fn from_maps<'a>(maps: impl IntoIterator<Item = &'a BTreeMap<String, String>>) -> Self {
        let mut values = BTreeMap::new();
        for map in maps {
            values.extend(map.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Self {
            values,
            ..Self::default()
        }
    }

    pub fn from_map(map: &BTreeMap<String, String>) -> Self {
        Self::from_maps([map])
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Also publish every key at the top level under `prefix`.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Also publish every key at the top level unprefixed.
    pub fn add_to_context(mut self) -> Self {
        self.add_to_context = true;
        self
    }
}

/// Fold layers into one context, in order.
pub fn prepare_context(layers: impl IntoIterator<Item = ContextLayer>) -> TemplateContext {
    let mut ctx = TemplateContext::new();
    for layer in layers {
        if let Some(prefix) = &layer.key_prefix {
            for (k, v) in &layer.values {
                ctx.insert(format!("{prefix}{k}"), Value::String(v.clone()));
            }
        }
        if layer.add_to_context {
            for (k, v) in &layer.values {
                ctx.insert(k.clone(), Value::String(v.clone()));
            }
        }
        if let Some(name) = layer.name {
            let nested = layer
                .values
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect();
            ctx.insert(name, Value::Object(nested));
        }
    }
    ctx
}

/// `base` overlaid with `overlay`.
pub fn merge_contexts(base: &TemplateContext, overlay: TemplateContext) -> TemplateContext {
    let mut merged = base.clone();
    merged.extend(overlay);
    merged
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
