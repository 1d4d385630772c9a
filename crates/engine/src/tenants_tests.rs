// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use skein_core::test_support::{at, namespace, project, tenant};
use skein_core::{ErrorKind, PlainTextSecret};
use skein_storage::AppKey;

fn cipher() -> SecretCipher {
    SecretCipher::new(&AppKey::parse("Yjo4a0jn1NvYdq79SADC/KaVv9Wu0Ffc").unwrap())
}

#[test]
fn serves_decrypted_details_for_a_namespace_tenant() {
    let now = at("2023-01-01T00:00:00Z");
    let mut state = MaterializedState::default();
    state.upsert_project(project(), now);
    state.upsert_namespace(namespace(), now).unwrap();
    state
        .save_secret(
            &cipher(),
            &tenant(),
            &PlainTextSecret::new("SCHEDULER_AUTH", "admin:secret").unwrap(),
            now,
        )
        .unwrap();
    let source = StateTenants::new(Arc::new(Mutex::new(state)), cipher());

    let details = source.tenant_details(&tenant()).unwrap();

    assert_eq!(details.to_tenant(), tenant());
    assert_eq!(
        details.get_secret("SCHEDULER_AUTH").unwrap().value(),
        "admin:secret"
    );
}

#[test]
fn unknown_project_is_not_found() {
    let source = StateTenants::new(Arc::new(Mutex::new(MaterializedState::default())), cipher());

    let err = source.tenant_details(&tenant()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
}
