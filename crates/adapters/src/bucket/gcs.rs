// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Google Cloud Storage bucket (`gs://`) over the JSON API

use super::{Bucket, BucketError};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;

/// Public GCS endpoint
pub const GCS_ENDPOINT: &str = "https://storage.googleapis.com";

#[derive(Debug, Clone)]
pub struct GcsBucket {
    client: Client,
    endpoint: String,
    bucket: String,
    /// Object name prefix taken from the URL path, without slashes at the ends
    prefix: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    items: Vec<ObjectItem>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectItem {
    name: String,
}

impl GcsBucket {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        prefix: &str,
        token: Option<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            prefix: prefix.trim_matches('/').to_string(),
            token,
        }
    }

    fn object_name(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.prefix, key)
        }
    }

    fn strip_prefix<'a>(&self, name: &'a str) -> &'a str {
        if self.prefix.is_empty() {
            return name;
        }
        name.strip_prefix(&self.prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(name)
    }

    /// `{endpoint}/{segments...}` with each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, BucketError> {
        let mut url =
            Url::parse(&self.endpoint).map_err(|_| BucketError::InvalidUrl(self.endpoint.clone()))?;
        url.path_segments_mut()
            .map_err(|_| BucketError::InvalidUrl(self.endpoint.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(
        &self,
        req: reqwest::RequestBuilder,
        url: &Url,
        key: &str,
    ) -> Result<Response, BucketError> {
        let resp = self
            .authorize(req)
            .send()
            .await
            .map_err(|source| BucketError::Http {
                url: url.to_string(),
                source,
            })?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(BucketError::NotFound(key.to_string()));
        }
        let body = resp.text().await.unwrap_or_default();
        Err(BucketError::Status {
            status: status.as_u16(),
            url: url.to_string(),
            body,
        })
    }
}

#[async_trait]
impl Bucket for GcsBucket {
    async fn write_all(&self, key: &str, data: &[u8]) -> Result<(), BucketError> {
        let url = self.url(&["upload", "storage", "v1", "b", &self.bucket, "o"])?;
        let name = self.object_name(key);
        let req = self
            .client
            .post(url.clone())
            .query(&[("uploadType", "media"), ("name", name.as_str())])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(data.to_vec());
        self.send(req, &url, key).await.map(|_| ())
    }

    async fn read_all(&self, key: &str) -> Result<Vec<u8>, BucketError> {
        let name = self.object_name(key);
        let url = self.url(&["storage", "v1", "b", &self.bucket, "o", &name])?;
        let req = self.client.get(url.clone()).query(&[("alt", "media")]);
        let resp = self.send(req, &url, key).await?;
        resp.bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|source| BucketError::Http {
                url: url.to_string(),
                source,
            })
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, BucketError> {
        let url = self.url(&["storage", "v1", "b", &self.bucket, "o"])?;
        let full_prefix = self.object_name(prefix);
        let mut keys = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut query = vec![("prefix", full_prefix.clone())];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }
            let req = self.client.get(url.clone()).query(&query);
            let resp = self.send(req, &url, prefix).await?;
            let page: ListResponse = resp.json().await.map_err(|source| BucketError::Http {
                url: url.to_string(),
                source,
            })?;
            keys.extend(
                page.items
                    .iter()
                    .map(|item| self.strip_prefix(&item.name).to_string()),
            );
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn delete(&self, key: &str) -> Result<(), BucketError> {
        let name = self.object_name(key);
        let url = self.url(&["storage", "v1", "b", &self.bucket, "o", &name])?;
        let req = self.client.delete(url.clone());
        self.send(req, &url, key).await.map(|_| ())
    }
}

#[cfg(test)]
#[path = "gcs_tests.rs"]
mod tests;
