// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Template rendering for task configs and asset files.
//!
//! Job specs are written with Go-template style macros (`{{ .DSTART }}`,
//! `{{ .DSTART | Date }}`, `{{ if .X }}..{{ end }}`). [`translate`] rewrites
//! those into handlebars syntax before rendering, so both styles work:
//!
//! - a leading `.` on a path is dropped (`.secret.TOKEN` becomes `secret.TOKEN`)
//! - pipelines become nested calls (`a | f "x"` becomes `f "x" (a)`)
//! - `if`/`range`/`with` and their `end` become `#if`/`#each`/`#with` blocks
//! - `{{-` and `-}}` become `{{~` and `~}}`
//!
//! Missing variables render empty.

use handlebars::{
    handlebars_helper, no_escape, Context, Handlebars, Helper, HelperResult, Output,
    RenderContext, RenderErrorReason, Template,
};
use regex::Regex;
use serde_json::{Map, Value};
use skein_core::{Entity, Error, Result};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Rendering context: nested JSON object of template variables
pub type TemplateContext = Map<String, Value>;

/// Asset files with these extensions are passed through unrendered
pub const IGNORE_TEMPLATE_RENDER_EXTENSIONS: &[&str] = &[".gtpl", ".j2", ".tmpl", ".tpl"];

// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static MUSTACHE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{\{(-\s)?(.*?)(\s-)?\}\}").expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static DOT_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[\s(])\.([A-Za-z_$])").expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static LONE_DOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[\s(])\.($|[\s)])").expect("constant regex pattern is valid"));

handlebars_helper!(replace_helper: |old: Json, new: Json, s: Json| text(s).replace(&text(old), &text(new)));
handlebars_helper!(quote_helper: |s: Json| format!("{:?}", text(s)));
handlebars_helper!(trunc_helper: |n: i64, s: Json| truncate(&text(s), n));
handlebars_helper!(replace_dash_helper: |s: Json| replace_dash(&text(s)));
handlebars_helper!(display_name_helper: |s: Json| display_name(&text(s)));

/// `-` replaced with `__dash__`.
pub fn replace_dash(s: &str) -> String {
    s.replace('-', "__dash__")
}

/// [`replace_dash`] then `.` replaced with `__dot__`; safe as a Python identifier.
pub fn display_name(s: &str) -> String {
    replace_dash(s).replace('.', "__dot__")
}

fn text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// First `n` characters, or the last `-n` when `n` is negative.
fn truncate(s: &str, n: i64) -> String {
    let len = s.chars().count();
    let n_abs = usize::try_from(n.unsigned_abs()).unwrap_or(usize::MAX);
    if n_abs >= len {
        return s.to_string();
    }
    if n >= 0 {
        s.chars().take(n_abs).collect()
    } else {
        s.chars().skip(len - n_abs).collect()
    }
}

/// RFC 3339 timestamp to `YYYY-MM-DD`; fails on anything else.
fn date_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let raw = h.param(0).map(|p| text(p.value())).unwrap_or_default();
    let parsed = chrono::DateTime::parse_from_rfc3339(&raw)
        .map_err(|e| RenderErrorReason::Other(format!("Date: cannot parse {raw:?}: {e}")))?;
    out.write(&parsed.format("%Y-%m-%d").to_string())?;
    Ok(())
}

/// Renders templates with the macro helpers registered
#[derive(Clone)]
pub struct TemplateEngine {
    registry: Handlebars<'static>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(no_escape);
        registry.set_strict_mode(false);
        registry.register_helper("replace", Box::new(replace_helper));
        registry.register_helper("quote", Box::new(quote_helper));
        registry.register_helper("trunc", Box::new(trunc_helper));
        registry.register_helper("ReplaceDash", Box::new(replace_dash_helper));
        registry.register_helper("DisplayName", Box::new(display_name_helper));
        registry.register_helper("Date", Box::new(date_helper));
        Self { registry }
    }

    /// Access to the underlying registry for callers that register
    /// their own named templates.
    pub fn registry_mut(&mut self) -> &mut Handlebars<'static> {
        &mut self.registry
    }

    pub fn registry(&self) -> &Handlebars<'static> {
        &self.registry
    }

    /// Render one template string.
    pub fn compile_string(&self, input: &str, ctx: &TemplateContext) -> Result<String> {
        self.render(input, ctx).map_err(|stage| {
            Error::invalid_argument(
                Entity::Compiler,
                format!("unable to {stage} string {input}"),
            )
        })
    }

    /// Render every value of a map; rendered values are trimmed.
    pub fn compile(
        &self,
        templates: &BTreeMap<String, String>,
        ctx: &TemplateContext,
    ) -> Result<BTreeMap<String, String>> {
        let mut rendered = BTreeMap::new();
        for (key, input) in templates {
            let value = self.render(input, ctx).map_err(|stage| {
                Error::internal(Entity::Compiler, format!("unable to {stage} content for {key}"))
            })?;
            rendered.insert(key.clone(), value.trim().to_string());
        }
        Ok(rendered)
    }

    /// Render asset files, skipping those with an ignored extension.
    pub fn compile_files(
        &self,
        files: &BTreeMap<String, String>,
        ctx: &TemplateContext,
    ) -> Result<BTreeMap<String, String>> {
        let mut rendered = BTreeMap::new();
        for (name, content) in files {
            if IGNORE_TEMPLATE_RENDER_EXTENSIONS
                .iter()
                .any(|ext| name.ends_with(ext))
            {
                rendered.insert(name.clone(), content.clone());
                continue;
            }
            let value = self.render(content, ctx).map_err(|stage| {
                Error::internal(Entity::Compiler, format!("unable to {stage} content for {name}"))
            })?;
            rendered.insert(name.clone(), value);
        }
        Ok(rendered)
    }

    /// Render, reporting which stage failed as `"parse"` or `"render"`.
    fn render(&self, input: &str, ctx: &TemplateContext) -> std::result::Result<String, &'static str> {
        let source = translate(input).ok_or("parse")?;
        Template::compile(&source).map_err(|e| {
            tracing::debug!(error = %e, "template parse failed");
            "parse"
        })?;
        self.registry.render_template(&source, ctx).map_err(|e| {
            tracing::debug!(error = %e, "template render failed");
            "render"
        })
    }
}

#[derive(Clone, Copy)]
enum Block {
    If,
    Each,
    With,
}

/// Rewrite Go-template macros into handlebars syntax.
///
/// Returns `None` when block keywords are unbalanced or a mustache is left
/// unterminated.
pub fn translate(input: &str) -> Option<String> {
    let mut out = String::with_capacity(input.len());
    let mut blocks: Vec<Block> = Vec::new();
    let mut last = 0;

    for caps in MUSTACHE.captures_iter(input) {
        let whole = caps.get(0)?;
        out.push_str(&input[last..whole.start()]);
        last = whole.end();

        let open = if caps.get(1).is_some() { "{{~" } else { "{{" };
        let close = if caps.get(3).is_some() { "~}}" } else { "}}" };
        let body = caps.get(2).map_or("", |m| m.as_str()).trim();

        // Already handlebars: blocks, partials, comments
        if body.starts_with(['#', '/', '>', '!']) {
            out.push_str(open);
            out.push_str(body);
            out.push_str(close);
            continue;
        }

        let (keyword, rest) = match body.split_once(char::is_whitespace) {
            Some((k, r)) => (k, r.trim()),
            None => (body, ""),
        };
        let rendered = match keyword {
            "if" => {
                blocks.push(Block::If);
                format!("#if {}", expression(rest))
            }
            "range" => {
                blocks.push(Block::Each);
                format!("#each {}", expression(rest))
            }
            "with" => {
                blocks.push(Block::With);
                format!("#with {}", expression(rest))
            }
            "else" => "else".to_string(),
            "end" => match blocks.pop()? {
                Block::If => "/if".to_string(),
                Block::Each => "/each".to_string(),
                Block::With => "/with".to_string(),
            },
            _ => expression(body),
        };
        out.push_str(open);
        out.push_str(&rendered);
        out.push_str(close);
    }
    out.push_str(&input[last..]);

    if !blocks.is_empty() || out[out.rfind("}}").map_or(0, |i| i + 2)..].contains("{{") {
        return None;
    }
    Some(out)
}

/// Translate one expression: paths, then pipelines into nested calls.
fn expression(body: &str) -> String {
    let mut acc: Option<(String, bool)> = None;
    for stage in split_pipeline(body) {
        let stage = strip_dots(stage.trim());
        acc = Some(match acc {
            None => {
                let is_call = top_level_tokens(&stage) > 1;
                (stage, is_call)
            }
            Some((prev, true)) => (format!("{stage} ({prev})"), true),
            Some((prev, false)) => (format!("{stage} {prev}"), true),
        });
    }
    acc.map(|(expr, _)| expr).unwrap_or_default()
}

/// Whitespace-separated tokens outside double quotes and parentheses.
fn top_level_tokens(s: &str) -> usize {
    let mut count = 0;
    let mut in_token = false;
    let mut in_quotes = false;
    let mut depth = 0usize;
    for c in s.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && !in_quotes && depth == 0 => {
                in_token = false;
                continue;
            }
            _ => {}
        }
        if !in_token {
            count += 1;
            in_token = true;
        }
    }
    count
}

fn strip_dots(s: &str) -> String {
    let s = LONE_DOT.replace_all(s, "${1}this${2}");
    DOT_PATH.replace_all(&s, "${1}${2}").into_owned()
}

/// Split on `|` outside double-quoted strings.
fn split_pipeline(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '|' if !in_quotes => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);
    parts
}

/// Build a context object from string pairs.
pub fn context_from<I, K, V>(pairs: I) -> TemplateContext
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), Value::String(v.into())))
        .collect()
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
