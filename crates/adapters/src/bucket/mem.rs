// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process bucket (`mem://`)
//!
//! Clones share the same objects, so a bucket opened by name from a
//! [`super::BucketOpener`] can be inspected by whoever else holds it.

use super::{Bucket, BucketError};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct MemBucket {
    objects: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemBucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.objects.read().keys().cloned().collect()
    }

    /// Object contents as UTF-8, if present.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .get(key)
            .map(|v| String::from_utf8_lossy(v).into_owned())
    }
}

#[async_trait]
impl Bucket for MemBucket {
    async fn write_all(&self, key: &str, data: &[u8]) -> Result<(), BucketError> {
        self.objects.write().insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn read_all(&self, key: &str) -> Result<Vec<u8>, BucketError> {
        self.objects
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| BucketError::NotFound(key.to_string()))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, BucketError> {
        Ok(self
            .objects
            .read()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<(), BucketError> {
        self.objects
            .write()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| BucketError::NotFound(key.to_string()))
    }
}
