// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use skein_core::test_support::{namespace, project, tenant};
use skein_core::ErrorKind;

fn seeded() -> MaterializedState {
    let mut state = MaterializedState::default();
    state.upsert_project(project(), now());
    state.upsert_namespace(namespace(), now()).unwrap();
    state
}

fn secret(name: &str, value: &str) -> PlainTextSecret {
    PlainTextSecret::new(name, value).unwrap()
}

#[test]
fn project_round_trip() {
    let state = seeded();
    assert_eq!(state.get_project("proj").unwrap(), project());
    assert_eq!(
        state.get_project("nope").unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn upsert_project_updates_timestamp_only() {
    let mut state = seeded();
    state.upsert_project(project(), at("2023-02-01T00:00:00Z"));
    let record = &state.projects["proj"];
    assert_eq!(record.created_at, now());
    assert_eq!(record.updated_at, at("2023-02-01T00:00:00Z"));
}

#[test]
fn namespace_requires_project() {
    let mut state = MaterializedState::default();
    let err = state.upsert_namespace(namespace(), now()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.entity(), Entity::Project);
}

#[test]
fn secret_is_stored_encrypted_and_decrypts() {
    let mut state = seeded();
    state
        .save_secret(&cipher(), &tenant(), &secret("NOTIFY_SLACK", "xoxb-token"), now())
        .unwrap();

    let stored = &state.secrets["proj/ns/NOTIFY_SLACK"].value;
    assert_ne!(stored.encoded_value, "xoxb-token");
    assert_eq!(stored.secret_type, SecretType::User);

    let loaded = state.get_secret(&cipher(), &tenant(), "NOTIFY_SLACK").unwrap();
    assert_eq!(loaded.value(), "xoxb-token");
}

#[test]
fn namespace_secret_overrides_project_secret() {
    let mut state = seeded();
    let project_scope = Tenant::project_scope("proj").unwrap();
    state
        .save_secret(&cipher(), &project_scope, &secret("TOKEN", "project"), now())
        .unwrap();
    state
        .save_secret(&cipher(), &project_scope, &secret("SHARED", "from-project"), now())
        .unwrap();
    state
        .save_secret(&cipher(), &tenant(), &secret("TOKEN", "namespace"), now())
        .unwrap();
    let other_ns = Tenant::new("proj", "other").unwrap();
    state
        .save_secret(&cipher(), &other_ns, &secret("TOKEN", "other"), now())
        .unwrap();

    let secrets = state.get_secrets(&cipher(), &tenant()).unwrap();
    let values: Vec<(&str, &str)> = secrets
        .iter()
        .map(|s| (s.name().as_str(), s.value()))
        .collect();
    assert_eq!(values, vec![("SHARED", "from-project"), ("TOKEN", "namespace")]);

    let project_only = state.get_secrets(&cipher(), &project_scope).unwrap();
    assert_eq!(project_only.len(), 2);
    assert_eq!(project_only[1].value(), "project");
}

#[test]
fn system_secret_type_from_prefix() {
    let mut state = seeded();
    state
        .save_secret(&cipher(), &tenant(), &secret("_SKEIN_AUTH", "v"), now())
        .unwrap();
    assert_eq!(
        state.secrets["proj/ns/_SKEIN_AUTH"].value.secret_type,
        SecretType::System
    );
}

#[test]
fn wrong_key_is_internal_error() {
    let mut state = seeded();
    state
        .save_secret(&cipher(), &tenant(), &secret("TOKEN", "v"), now())
        .unwrap();
    let other = SecretCipher::new(&AppKey::from_bytes(&[9u8; 32]).unwrap());
    let err = state.get_secrets(&other, &tenant()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(err.message().contains("unable to decrypt secret TOKEN"));
}

#[test]
fn delete_secret() {
    let mut state = seeded();
    state
        .save_secret(&cipher(), &tenant(), &secret("TOKEN", "v"), now())
        .unwrap();
    state.delete_secret(&tenant(), "TOKEN").unwrap();
    assert_eq!(
        state.delete_secret(&tenant(), "TOKEN").unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn tenant_details_merges_configs_and_secrets() {
    let mut state = seeded();
    state
        .save_secret(&cipher(), &tenant(), &secret("TOKEN", "v"), now())
        .unwrap();
    let details = state.tenant_details(&cipher(), &tenant()).unwrap();
    assert_eq!(details.get_config("EXECUTION_PROJECT").unwrap(), "ns-exec");
    assert_eq!(details.get_secret("TOKEN").unwrap().value(), "v");
}

#[test]
fn tenant_details_unknown_namespace() {
    let state = seeded();
    let err = state
        .tenant_details(&cipher(), &Tenant::new("proj", "ghost").unwrap())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.entity(), Entity::Namespace);
}
