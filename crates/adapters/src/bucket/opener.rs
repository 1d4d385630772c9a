// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opens the bucket named by a project's `STORAGE_PATH`

use super::{Bucket, BucketError, FileBucket, GcsBucket, MemBucket, GCS_ENDPOINT};
use parking_lot::Mutex;
use skein_core::tenant::STORAGE_PATH;
use skein_core::TenantDetails;
use std::collections::HashMap;
use std::sync::Arc;

/// Secret holding the bearer token for `gs://` buckets
pub const STORAGE_SECRET: &str = "STORAGE";

/// Resolves bucket URLs to bucket handles.
///
/// `mem://` buckets live as long as the opener, so every open of the
/// same name sees the same objects.
#[derive(Clone)]
pub struct BucketOpener {
    client: reqwest::Client,
    gcs_endpoint: String,
    mem: Arc<Mutex<HashMap<String, MemBucket>>>,
}

impl Default for BucketOpener {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl BucketOpener {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            gcs_endpoint: GCS_ENDPOINT.to_string(),
            mem: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_gcs_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.gcs_endpoint = endpoint.into();
        self
    }

    /// The `mem://` bucket with this name, created on first use.
    pub fn mem_bucket(&self, name: &str) -> MemBucket {
        self.mem.lock().entry(name.to_string()).or_default().clone()
    }

    /// Open the tenant's bucket from its `STORAGE_PATH` config.
    pub fn open(&self, details: &TenantDetails) -> Result<Arc<dyn Bucket>, BucketError> {
        let url = details
            .get_config(STORAGE_PATH)
            .map_err(|_| BucketError::InvalidUrl(format!("{STORAGE_PATH} is not configured")))?;
        let token = details
            .get_secret(STORAGE_SECRET)
            .ok()
            .map(|s| s.value().to_string());
        self.open_url(&url, token)
    }

    pub fn open_url(&self, url: &str, token: Option<String>) -> Result<Arc<dyn Bucket>, BucketError> {
        let invalid = || BucketError::InvalidUrl(url.to_string());
        let (scheme, rest) = url.split_once("://").ok_or_else(invalid)?;
        match scheme {
            "file" => {
                if rest.is_empty() {
                    return Err(invalid());
                }
                Ok(Arc::new(FileBucket::new(rest)))
            }
            "mem" => {
                if rest.is_empty() {
                    return Err(invalid());
                }
                Ok(Arc::new(self.mem_bucket(rest)))
            }
            "gs" => {
                let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
                if bucket.is_empty() {
                    return Err(invalid());
                }
                Ok(Arc::new(GcsBucket::new(
                    self.client.clone(),
                    self.gcs_endpoint.clone(),
                    bucket,
                    prefix,
                    token,
                )))
            }
            _ => Err(invalid()),
        }
    }
}

#[cfg(test)]
#[path = "opener_tests.rs"]
mod tests;
