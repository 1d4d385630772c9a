// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Domain errors shared by every layer.
//!
//! An [`Error`] carries a coarse [`ErrorKind`], the [`Entity`] it concerns and a
//! human readable message. Infrastructure errors are folded into this type at
//! service boundaries so callers only ever match on the kind.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse classification of a domain error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    FailedPrecondition,
    AlreadyExists,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::NotFound => "not found",
            ErrorKind::FailedPrecondition => "failed precondition",
            ErrorKind::AlreadyExists => "resource already exists",
            ErrorKind::Internal => "internal error",
        };
        f.write_str(s)
    }
}

/// The entity an error is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Entity {
    #[serde(rename = "project")]
    Project,
    #[serde(rename = "namespace")]
    Namespace,
    #[serde(rename = "tenant")]
    Tenant,
    #[serde(rename = "secret")]
    Secret,
    #[serde(rename = "job")]
    Job,
    #[serde(rename = "jobRun")]
    JobRun,
    #[serde(rename = "operatorRun")]
    OperatorRun,
    #[serde(rename = "event")]
    Event,
    #[serde(rename = "schedulerAirflow")]
    SchedulerAirflow,
    #[serde(rename = "replay")]
    Replay,
    #[serde(rename = "compiler")]
    Compiler,
    #[serde(rename = "bucket")]
    Bucket,
    #[serde(rename = "cron")]
    Cron,
    #[serde(rename = "window")]
    Window,
    #[serde(rename = "priorityResolver")]
    PriorityResolver,
    #[serde(rename = "notifier")]
    Notifier,
}

impl Entity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Project => "project",
            Entity::Namespace => "namespace",
            Entity::Tenant => "tenant",
            Entity::Secret => "secret",
            Entity::Job => "job",
            Entity::JobRun => "jobRun",
            Entity::OperatorRun => "operatorRun",
            Entity::Event => "event",
            Entity::SchedulerAirflow => "schedulerAirflow",
            Entity::Replay => "replay",
            Entity::Compiler => "compiler",
            Entity::Bucket => "bucket",
            Entity::Cron => "cron",
            Entity::Window => "window",
            Entity::PriorityResolver => "priorityResolver",
            Entity::Notifier => "notifier",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A domain error: kind + entity + message, optionally wrapping a cause.
#[derive(Debug, thiserror::Error)]
#[error("{kind} for entity {entity}: {message}")]
pub struct Error {
    kind: ErrorKind,
    entity: Entity,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn new(kind: ErrorKind, entity: Entity, message: impl Into<String>) -> Self {
        Self {
            kind,
            entity,
            message: message.into(),
            source: None,
        }
    }

    pub fn invalid_argument(entity: Entity, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, entity, message)
    }

    pub fn not_found(entity: Entity, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, entity, message)
    }

    pub fn failed_precondition(entity: Entity, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FailedPrecondition, entity, message)
    }

    pub fn already_exists(entity: Entity, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyExists, entity, message)
    }

    pub fn internal(entity: Entity, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, entity, message)
    }

    /// Internal error that keeps the underlying cause as its source.
    pub fn internal_from<E>(entity: Entity, message: impl Into<String>, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            source: Some(Box::new(cause)),
            ..Self::internal(entity, message)
        }
    }

    /// Re-describe an error from a lower layer, keeping its kind.
    pub fn with_context(self, entity: Entity, message: impl Into<String>) -> Self {
        Self {
            kind: self.kind,
            entity,
            message: message.into(),
            source: Some(Box::new(self)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    /// Display string followed by the chain of causes in parentheses.
    pub fn debug_string(&self) -> String {
        match &self.source {
            None => format!("{self} ()"),
            Some(src) => match src.downcast_ref::<Error>() {
                Some(inner) => format!("{self} ({})", inner.debug_string()),
                None => format!("{self} ({src})"),
            },
        }
    }
}

/// Aggregates independent failures under a single title.
///
/// Renders as `"<title>:\n <err1>\n <err2>"`.
#[derive(Debug)]
pub struct MultiError {
    title: String,
    errors: Vec<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl MultiError {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            errors: Vec::new(),
        }
    }

    pub fn append<E>(&mut self, err: E)
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        self.errors.push(err.into());
    }

    /// Record the error of a result, if any.
    pub fn collect<T, E>(&mut self, result: std::result::Result<T, E>) -> Option<T>
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                self.append(e);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> impl Iterator<Item = &(dyn std::error::Error + Send + Sync + 'static)> {
        self.errors.iter().map(|e| e.as_ref())
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> std::result::Result<(), MultiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.title)?;
        for err in &self.errors {
            write!(f, "\n {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for MultiError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
