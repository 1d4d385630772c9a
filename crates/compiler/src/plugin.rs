// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task and hook plugins known to the compiler.
//!
//! A plugin describes the container an operator runs in. Definitions are
//! loaded from a TOML or JSON file; task plugins may also carry an
//! in-process asset compiler that rewrites a job's assets before rendering.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use skein_core::window::Window;
use skein_core::{Entity, Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error as ThisError;

/// Plugin definition file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Json,
}

/// Errors that can occur while loading plugin definitions
#[derive(Debug, ThisError)]
pub enum PluginError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate plugin {0}")]
    Duplicate(String),

    #[error("invalid plugin {name}: {message}")]
    Invalid { name: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginType {
    #[default]
    Task,
    Hook,
}

/// When a hook runs relative to the task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookType {
    Pre,
    Post,
    Fail,
}

impl fmt::Display for HookType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HookType::Pre => "pre",
            HookType::Post => "post",
            HookType::Fail => "fail",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entrypoint {
    #[serde(default = "default_shell")]
    pub shell: String,
    #[serde(default)]
    pub script: String,
}

impl Default for Entrypoint {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            script: String::new(),
        }
    }
}

fn default_shell() -> String {
    "/bin/sh".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub image: String,
    #[serde(default, rename = "type")]
    pub plugin_type: PluginType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_type: Option<HookType>,
    #[serde(default)]
    pub entrypoint: Entrypoint,
    /// Hooks this hook runs after
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub description: String,
}

/// Input to a plugin's asset compiler
#[derive(Debug, Clone)]
pub struct CompileAssetsRequest {
    pub window: Window,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub config: BTreeMap<String, String>,
    pub assets: BTreeMap<String, String>,
    pub scheduled_at: DateTime<Utc>,
}

/// Plugin hook that replaces raw assets before template expansion
pub trait AssetCompilerMod: Send + Sync {
    fn compile_assets(&self, req: &CompileAssetsRequest) -> Result<BTreeMap<String, String>>;
}

#[derive(Clone)]
pub struct Plugin {
    pub info: PluginInfo,
    pub asset_compiler: Option<Arc<dyn AssetCompilerMod>>,
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("info", &self.info)
            .field("asset_compiler", &self.asset_compiler.is_some())
            .finish()
    }
}

#[derive(Deserialize)]
struct PluginFile {
    #[serde(default, alias = "plugin")]
    plugins: Vec<PluginInfo>,
}

/// Plugins by name
#[derive(Debug, Clone, Default)]
pub struct PluginRepo {
    plugins: IndexMap<String, Plugin>,
}

impl PluginRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(content: &str, format: Format) -> std::result::Result<Self, PluginError> {
        let file: PluginFile = match format {
            Format::Toml => toml::from_str(content)?,
            Format::Json => serde_json::from_str(content)?,
        };
        let mut repo = Self::new();
        for info in file.plugins {
            if info.plugin_type == PluginType::Hook && info.hook_type.is_none() {
                return Err(PluginError::Invalid {
                    name: info.name,
                    message: "hook plugins need a hook_type".to_string(),
                });
            }
            if repo.plugins.contains_key(&info.name) {
                return Err(PluginError::Duplicate(info.name));
            }
            repo.add(info);
        }
        Ok(repo)
    }

    pub fn add(&mut self, info: PluginInfo) {
        self.plugins.insert(
            info.name.clone(),
            Plugin {
                info,
                asset_compiler: None,
            },
        );
    }

    /// Attach an asset compiler to an existing plugin; returns false when
    /// the plugin is unknown.
    pub fn set_asset_compiler(&mut self, name: &str, compiler: Arc<dyn AssetCompilerMod>) -> bool {
        match self.plugins.get_mut(name) {
            Some(plugin) => {
                plugin.asset_compiler = Some(compiler);
                true
            }
            None => false,
        }
    }

    pub fn get_by_name(&self, name: &str) -> Result<&Plugin> {
        self.plugins.get(name).ok_or_else(|| {
            Error::not_found(Entity::Compiler, format!("plugin not found for {name}"))
        })
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(String::as_str)
    }
}

#[cfg(test)]
#[path = "plugin_tests.rs"]
mod tests;
