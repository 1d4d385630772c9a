// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tenant details served from the materialized store

use parking_lot::Mutex;
use skein_adapters::TenantDetailsSource;
use skein_core::{Result, Tenant, TenantDetails};
use skein_storage::{MaterializedState, SecretCipher};
use std::sync::Arc;

/// Reads project, namespace and decrypted secrets for the scheduler adapter
#[derive(Clone)]
pub struct StateTenants {
    state: Arc<Mutex<MaterializedState>>,
    cipher: SecretCipher,
}

impl StateTenants {
    pub fn new(state: Arc<Mutex<MaterializedState>>, cipher: SecretCipher) -> Self {
        Self { state, cipher }
    }
}

impl TenantDetailsSource for StateTenants {
    fn tenant_details(&self, tenant: &Tenant) -> Result<TenantDetails> {
        self.state.lock().tenant_details(&self.cipher, tenant)
    }
}

#[cfg(test)]
#[path = "tenants_tests.rs"]
mod tests;
