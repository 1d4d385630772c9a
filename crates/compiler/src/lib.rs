// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Template, asset, executor-input and scheduler artifact compilation

pub mod artifact;
pub mod asset;
pub mod context;
pub mod input;
pub mod plugin;
pub mod template;

pub use artifact::{DagCompiler, DAG_LIB, DAG_LIB_FILE};
pub use asset::JobAssetsCompiler;
pub use context::{merge_contexts, prepare_context, ContextLayer};
pub use input::{split_config_with_secrets, system_defined_vars, ExecutorInputCompiler};
pub use plugin::{
    AssetCompilerMod, CompileAssetsRequest, Entrypoint, Format, HookType, Plugin, PluginError,
    PluginInfo, PluginRepo, PluginType,
};
pub use template::{context_from, display_name, replace_dash, TemplateContext, TemplateEngine};
