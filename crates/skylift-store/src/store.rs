//! The object storage port and its implementations.
//!
//! `ObjectStore` is the seam between the upload pipeline and whatever
//! bucket actually holds the bytes. The daemon wires in
//! `HttpObjectStore`; tests substitute `MemoryObjectStore`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// A durable key/value store for published artifacts.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key` with the given content type,
    /// overwriting any existing object (last-write-wins).
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> StoreResult<()>;
}

/// S3-compatible store speaking plain HTTP PUT.
///
/// Objects land at `{endpoint}/{key}`; the bucket and any auth are
/// baked into the endpoint URL or fronted by a signing proxy —
/// deployment configuration, not protocol.
pub struct HttpObjectStore {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpObjectStore {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.endpoint, key)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> StoreResult<()> {
        let url = self.url_for(key);
        let resp = self
            .client
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(|source| StoreError::Http {
                key: key.to_string(),
                source,
            })?;

        if !resp.status().is_success() {
            return Err(StoreError::Status {
                key: key.to_string(),
                status: resp.status().as_u16(),
            });
        }

        debug!(key, content_type, "object stored");
        Ok(())
    }
}

/// A stored object, as recorded by [`MemoryObjectStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
}

/// In-memory store for tests and local development.
#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
    /// Keys whose PUT should fail, to exercise error paths.
    poisoned: Arc<RwLock<Vec<String>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every PUT for `key` fail with a status error.
    pub fn poison(&self, key: &str) {
        self.poisoned.write().expect("poisoned lock").push(key.to_string());
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().expect("objects lock").get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .read()
            .expect("objects lock")
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.objects.read().expect("objects lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> StoreResult<()> {
        if self.poisoned.read().expect("poisoned lock").iter().any(|k| k == key) {
            return Err(StoreError::Status {
                key: key.to_string(),
                status: 500,
            });
        }
        self.objects.write().expect("objects lock").insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}
