// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const PLUGINS_TOML: &str = r#"
[[plugin]]
name = "bq2bq"
image = "example.io/namespace/bq2bq-executor:latest"
type = "task"

[plugin.entrypoint]
shell = "/bin/bash"
script = "python3 /opt/bumblebee/main.py"

[[plugin]]
name = "predator"
image = "example.io/namespace/predator-image:latest"
type = "hook"
hook_type = "post"
depends_on = ["transporter"]
"#;

#[test]
fn parses_toml_definitions() {
    let repo = PluginRepo::parse(PLUGINS_TOML, Format::Toml).unwrap();
    assert_eq!(repo.len(), 2);
    assert_eq!(repo.names().collect::<Vec<_>>(), vec!["bq2bq", "predator"]);

    let task = &repo.get_by_name("bq2bq").unwrap().info;
    assert_eq!(task.plugin_type, PluginType::Task);
    assert_eq!(task.entrypoint.shell, "/bin/bash");
    assert_eq!(task.hook_type, None);

    let hook = &repo.get_by_name("predator").unwrap().info;
    assert_eq!(hook.hook_type, Some(HookType::Post));
    assert_eq!(hook.entrypoint.shell, "/bin/sh");
    assert_eq!(hook.depends_on, vec!["transporter"]);
}

#[test]
fn parses_json_definitions() {
    let json = r#"{"plugins": [{"name": "t", "image": "img"}]}"#;
    let repo = PluginRepo::parse(json, Format::Json).unwrap();
    assert_eq!(repo.get_by_name("t").unwrap().info.image, "img");
}

#[test]
fn hook_without_hook_type_is_rejected() {
    let toml = "[[plugin]]\nname = \"h\"\nimage = \"i\"\ntype = \"hook\"\n";
    let err = PluginRepo::parse(toml, Format::Toml).unwrap_err();
    assert!(matches!(err, PluginError::Invalid { ref name, .. } if name == "h"));
}

#[test]
fn duplicate_names_are_rejected() {
    let toml = "[[plugin]]\nname = \"t\"\nimage = \"i\"\n\n[[plugin]]\nname = \"t\"\nimage = \"j\"\n";
    let err = PluginRepo::parse(toml, Format::Toml).unwrap_err();
    assert_eq!(err.to_string(), "duplicate plugin t");
}

#[test]
fn unknown_plugin_is_not_found() {
    let err = PluginRepo::new().get_by_name("bq-bq").unwrap_err();
    assert_eq!(err.kind(), skein_core::ErrorKind::NotFound);
    assert_eq!(err.message(), "plugin not found for bq-bq");
}

struct Uppercase;

impl AssetCompilerMod for Uppercase {
    fn compile_assets(&self, req: &CompileAssetsRequest) -> Result<BTreeMap<String, String>> {
        Ok(req
            .assets
            .iter()
            .map(|(k, v)| (k.clone(), v.to_uppercase()))
            .collect())
    }
}

#[test]
fn asset_compiler_attaches_to_known_plugin() {
    let mut repo = PluginRepo::parse(PLUGINS_TOML, Format::Toml).unwrap();
    assert!(repo.set_asset_compiler("bq2bq", Arc::new(Uppercase)));
    assert!(!repo.set_asset_compiler("missing", Arc::new(Uppercase)));
    assert!(repo.get_by_name("bq2bq").unwrap().asset_compiler.is_some());
}
