//! Artifact upload — walks a build output tree and publishes every
//! regular file to object storage.
//!
//! Uploads run with bounded concurrency. The aggregate operation is
//! fail-fast with a deterministic settle: after the first failure no
//! new uploads start, every in-flight upload is awaited, and the first
//! error (carrying the failing key) is returned. Success means every
//! file under the root was uploaded.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tokio::task::JoinSet;
use tracing::{debug, info};
use walkdir::WalkDir;

use skylift_core::ProjectId;
use skylift_logs::LogBroker;

use crate::error::{StoreError, StoreResult};
use crate::mime::content_type_for;
use crate::store::ObjectStore;

/// Publishes build output to object storage under a project prefix.
pub struct Uploader {
    store: Arc<dyn ObjectStore>,
    broker: LogBroker,
    base_path: String,
    concurrency: usize,
}

/// One file scheduled for upload.
struct PendingArtifact {
    abs_path: PathBuf,
    /// Relative path with `/` separators, regardless of host OS.
    rel_path: String,
}

impl Uploader {
    pub fn new(store: Arc<dyn ObjectStore>, broker: LogBroker) -> Self {
        Self {
            store,
            broker,
            base_path: "__outputs".to_string(),
            concurrency: 8,
        }
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Storage key for one artifact: `{base}/{project}/{relative_path}`.
    fn key_for(&self, project_id: &ProjectId, rel_path: &str) -> String {
        format!("{}/{}/{}", self.base_path, project_id, rel_path)
    }

    /// Upload every regular file under `output_root`.
    ///
    /// Directories are traversed but never uploaded; symlinks are not
    /// followed. Returns the number of files uploaded.
    pub async fn publish_artifacts(
        &self,
        project_id: &ProjectId,
        output_root: &Path,
    ) -> StoreResult<usize> {
        let artifacts = collect_artifacts(output_root)?;
        info!(
            project = %project_id,
            files = artifacts.len(),
            root = %output_root.display(),
            "publishing artifacts"
        );

        let mut pending = artifacts.into_iter();
        let mut in_flight: JoinSet<StoreResult<()>> = JoinSet::new();
        let mut uploaded = 0usize;
        let mut first_error: Option<StoreError> = None;

        loop {
            // Top up to the concurrency bound unless we are draining.
            while first_error.is_none() && in_flight.len() < self.concurrency {
                let Some(artifact) = pending.next() else { break };
                let key = self.key_for(project_id, &artifact.rel_path);
                in_flight.spawn(upload_one(
                    Arc::clone(&self.store),
                    self.broker.clone(),
                    project_id.clone(),
                    key,
                    artifact,
                ));
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };
            match joined {
                Ok(Ok(())) => uploaded += 1,
                Ok(Err(e)) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(StoreError::Join(e.to_string()));
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(uploaded),
        }
    }
}

/// Read, announce, and PUT a single artifact.
async fn upload_one(
    store: Arc<dyn ObjectStore>,
    broker: LogBroker,
    project_id: ProjectId,
    key: String,
    artifact: PendingArtifact,
) -> StoreResult<()> {
    broker.publish(&project_id, &format!("uploading {}", artifact.rel_path));

    let body = tokio::fs::read(&artifact.abs_path)
        .await
        .map_err(|source| StoreError::Io {
            path: artifact.rel_path.clone(),
            source,
        })?;
    let content_type = content_type_for(&artifact.abs_path);

    store.put(&key, Bytes::from(body), content_type).await?;

    broker.publish(&project_id, &format!("uploaded {}", artifact.rel_path));
    debug!(key, "artifact uploaded");
    Ok(())
}

/// Enumerate regular files under `root`, skipping directories.
fn collect_artifacts(root: &Path) -> StoreResult<Vec<PendingArtifact>> {
    let mut artifacts = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| StoreError::Walk(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| StoreError::Walk(e.to_string()))?;
        // Build the key from components so Windows separators never
        // leak into storage keys.
        let rel_path = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        artifacts.push(PendingArtifact {
            abs_path: entry.path().to_path_buf(),
            rel_path,
        });
    }
    Ok(artifacts)
}
