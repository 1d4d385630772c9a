// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tenancy: projects, namespaces and their secrets.
//!
//! A [`Tenant`] is the `(project, namespace)` ownership unit. The namespace is
//! optional so project-wide operations can use a project-scoped tenant.

use crate::{define_name, Entity, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Bucket URL the scheduler reads compiled artifacts from
pub const STORAGE_PATH: &str = "STORAGE_PATH";
/// Base URL of the external scheduler's API
pub const SCHEDULER_HOST: &str = "SCHEDULER_HOST";
/// Secret holding `user:password` for the scheduler API
pub const SCHEDULER_AUTH: &str = "SCHEDULER_AUTH";

const MANDATORY_PROJECT_CONFIGS: [&str; 2] = [STORAGE_PATH, SCHEDULER_HOST];

define_name! {
    pub struct ProjectName(Entity::Project, "project name");
}

define_name! {
    pub struct NamespaceName(Entity::Namespace, "namespace name");
}

define_name! {
    pub struct SecretName(Entity::Secret, "secret name");
}

/// `(project, namespace)`; the namespace is absent for project-scoped work
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tenant {
    project: ProjectName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    namespace: Option<NamespaceName>,
}

impl Tenant {
    pub fn new(project: &str, namespace: &str) -> Result<Self> {
        Ok(Self {
            project: ProjectName::try_new(project)?,
            namespace: Some(NamespaceName::try_new(namespace)?),
        })
    }

    /// A tenant covering the whole project.
    pub fn project_scope(project: &str) -> Result<Self> {
        Ok(Self {
            project: ProjectName::try_new(project)?,
            namespace: None,
        })
    }

    pub fn project_name(&self) -> &ProjectName {
        &self.project
    }

    pub fn namespace_name(&self) -> Result<&NamespaceName> {
        self.namespace.as_ref().ok_or_else(|| {
            Error::not_found(Entity::Tenant, "namespace name is not present")
        })
    }

    pub fn has_namespace(&self) -> bool {
        self.namespace.is_some()
    }

    /// A tenant is invalid iff its project is empty.
    pub fn is_invalid(&self) -> bool {
        self.project.as_str().is_empty()
    }
}

impl fmt::Display for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}", self.project, ns),
            None => write!(f, "{}", self.project),
        }
    }
}

/// A project with its key/value configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    name: ProjectName,
    config: BTreeMap<String, String>,
}

impl Project {
    /// Create a project; `STORAGE_PATH` and `SCHEDULER_HOST` must be present.
    pub fn new(name: &str, config: BTreeMap<String, String>) -> Result<Self> {
        let name = ProjectName::try_new(name)?;
        for key in MANDATORY_PROJECT_CONFIGS {
            if config.get(key).map_or(true, |v| v.is_empty()) {
                return Err(Error::invalid_argument(
                    Entity::Project,
                    format!("missing mandatory configuration: {key}"),
                ));
            }
        }
        Ok(Self { name, config })
    }

    pub fn name(&self) -> &ProjectName {
        &self.name
    }

    pub fn get_config(&self, key: &str) -> Result<String> {
        self.config.get(key).cloned().ok_or_else(|| {
            Error::not_found(Entity::Project, format!("config not found {key}"))
        })
    }

    /// A copy of the configuration; mutating it does not affect the project.
    pub fn get_configs(&self) -> BTreeMap<String, String> {
        self.config.clone()
    }
}

/// A namespace inside a project; its config overrides the project's
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    name: NamespaceName,
    project_name: ProjectName,
    config: BTreeMap<String, String>,
}

impl Namespace {
    pub fn new(
        name: &str,
        project_name: ProjectName,
        config: BTreeMap<String, String>,
    ) -> Result<Self> {
        Ok(Self {
            name: NamespaceName::try_new(name)?,
            project_name,
            config,
        })
    }

    pub fn name(&self) -> &NamespaceName {
        &self.name
    }

    pub fn project_name(&self) -> &ProjectName {
        &self.project_name
    }

    pub fn get_config(&self, key: &str) -> Result<String> {
        self.config.get(key).cloned().ok_or_else(|| {
            Error::not_found(Entity::Namespace, format!("config not found {key}"))
        })
    }

    pub fn get_configs(&self) -> BTreeMap<String, String> {
        self.config.clone()
    }
}

/// Whether a secret is managed by the system or a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretType {
    System,
    User,
}

/// Prefix reserved for system-managed secrets
pub const SYSTEM_SECRET_PREFIX: &str = "_SKEIN_";

impl SecretType {
    /// Classify a secret by its name.
    pub fn for_name(name: &str) -> Self {
        if name.starts_with(SYSTEM_SECRET_PREFIX) {
            SecretType::System
        } else {
            SecretType::User
        }
    }
}

/// A secret as persisted: the value is encrypted and base64 encoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    pub name: SecretName,
    pub secret_type: SecretType,
    pub encoded_value: String,
    pub tenant: Tenant,
}

/// A decrypted secret handed to compilers
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlainTextSecret {
    name: SecretName,
    value: String,
}

impl PlainTextSecret {
    pub fn new(name: &str, value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(Error::invalid_argument(
                Entity::Secret,
                format!("empty value for secret {name}"),
            ));
        }
        Ok(Self {
            name: SecretName::try_new(name)?,
            value,
        })
    }

    pub fn name(&self) -> &SecretName {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

// Keep secret values out of logs
impl fmt::Debug for PlainTextSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlainTextSecret")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// Project, optional namespace and the secrets visible to the tenant
#[derive(Debug, Clone)]
pub struct TenantDetails {
    project: Project,
    namespace: Option<Namespace>,
    secrets: Vec<PlainTextSecret>,
}

impl TenantDetails {
    pub fn new(project: Project, namespace: Option<Namespace>) -> Self {
        Self {
            project,
            namespace,
            secrets: Vec::new(),
        }
    }

    pub fn with_secrets(mut self, secrets: Vec<PlainTextSecret>) -> Self {
        self.secrets = secrets;
        self
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn namespace(&self) -> Result<&Namespace> {
        self.namespace
            .as_ref()
            .ok_or_else(|| Error::not_found(Entity::Tenant, "namespace is not present"))
    }

    /// Look up a config key, namespace first.
    pub fn get_config(&self, key: &str) -> Result<String> {
        if let Some(v) = self.namespace.as_ref().and_then(|ns| ns.config.get(key)) {
            return Ok(v.clone());
        }
        self.project.config.get(key).cloned().ok_or_else(|| {
            Error::not_found(
                Entity::Tenant,
                format!("config not present in tenant {key}"),
            )
        })
    }

    /// Project config overlaid with namespace config.
    pub fn get_configs(&self) -> BTreeMap<String, String> {
        let mut merged = self.project.get_configs();
        if let Some(ns) = &self.namespace {
            merged.extend(ns.get_configs());
        }
        merged
    }

    pub fn secrets(&self) -> &[PlainTextSecret] {
        &self.secrets
    }

    /// Secret name to plaintext value.
    pub fn secrets_map(&self) -> BTreeMap<String, String> {
        self.secrets
            .iter()
            .map(|s| (s.name.to_string(), s.value.clone()))
            .collect()
    }

    pub fn get_secret(&self, name: &str) -> Result<&PlainTextSecret> {
        self.secrets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::not_found(Entity::Secret, format!("secret not found: {name}")))
    }

    pub fn to_tenant(&self) -> Tenant {
        Tenant {
            project: self.project.name.clone(),
            namespace: self.namespace.as_ref().map(|ns| ns.name.clone()),
        }
    }
}

#[cfg(test)]
#[path = "tenant_tests.rs"]
mod tests;
