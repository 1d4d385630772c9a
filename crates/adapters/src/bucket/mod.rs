// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Object buckets the external scheduler reads compiled DAGs from.
//!
//! A project's `STORAGE_PATH` selects the backend by URL scheme:
//! `gs://bucket/prefix`, `file:///abs/path` or `mem://name`.

mod file;
mod gcs;
mod mem;
mod opener;

pub use file::FileBucket;
pub use gcs::{GcsBucket, GCS_ENDPOINT};
pub use mem::MemBucket;
pub use opener::{BucketOpener, STORAGE_SECRET};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from bucket operations
#[derive(Debug, Error)]
pub enum BucketError {
    #[error("object {0} not found")]
    NotFound(String),
    #[error("invalid bucket url {0}")]
    InvalidUrl(String),
    #[error("invalid object key {0}")]
    InvalidKey(String),
    #[error("I/O error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("status code {status} on {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },
}

impl BucketError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BucketError::NotFound(_))
    }
}

/// Flat key/value object store
#[async_trait]
pub trait Bucket: Send + Sync + 'static {
    /// Create or overwrite `key`.
    async fn write_all(&self, key: &str, data: &[u8]) -> Result<(), BucketError>;

    async fn read_all(&self, key: &str) -> Result<Vec<u8>, BucketError>;

    /// Keys starting with `prefix`, sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, BucketError>;

    /// Remove `key`; a missing key is [`BucketError::NotFound`].
    async fn delete(&self, key: &str) -> Result<(), BucketError>;

    async fn close(&self) -> Result<(), BucketError> {
        Ok(())
    }
}
