// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bucket backed by a local directory (`file://`)

use super::{Bucket, BucketError};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FileBucket {
    root: PathBuf,
}

impl FileBucket {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, BucketError> {
        let rel = Path::new(key);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(BucketError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

fn io_error(key: &str, source: std::io::Error) -> BucketError {
    if source.kind() == ErrorKind::NotFound {
        BucketError::NotFound(key.to_string())
    } else {
        BucketError::Io {
            key: key.to_string(),
            source,
        }
    }
}

/// Every file under `dir` as a `/`-separated key relative to `root`.
fn walk(root: &Path, dir: &Path, keys: &mut Vec<String>) -> std::io::Result<()> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            walk(root, &path, keys)?;
        } else if let Ok(rel) = path.strip_prefix(root) {
            let key = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            keys.push(key);
        }
    }
    Ok(())
}

#[async_trait]
impl Bucket for FileBucket {
    async fn write_all(&self, key: &str, data: &[u8]) -> Result<(), BucketError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(key, e))?;
        }
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| io_error(key, e))
    }

    async fn read_all(&self, key: &str) -> Result<Vec<u8>, BucketError> {
        let path = self.path_for(key)?;
        tokio::fs::read(&path).await.map_err(|e| io_error(key, e))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, BucketError> {
        let root = self.root.clone();
        let prefix = prefix.to_string();
        let walked = tokio::task::spawn_blocking(move || {
            let mut keys = Vec::new();
            walk(&root, &root, &mut keys).map(|()| keys)
        })
        .await
        .map_err(|e| BucketError::Io {
            key: prefix.clone(),
            source: std::io::Error::other(e.to_string()),
        })?;
        let mut keys = walked.map_err(|e| io_error(&prefix, e))?;
        keys.retain(|k| k.starts_with(&prefix));
        keys.sort();
        Ok(keys)
    }

    async fn delete(&self, key: &str) -> Result<(), BucketError> {
        let path = self.path_for(key)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| io_error(key, e))
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
