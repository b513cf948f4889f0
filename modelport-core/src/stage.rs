//! Artifact stager — move a model's file set from the hub into a bucket.
//!
//! Downloads the snapshot into a local root, then walks it and uploads
//! each file to `bucket/prefix/relative_path`, preserving the directory
//! structure in the key. There is no partial-failure recovery: the first
//! failed upload aborts and leaves whatever was already pushed.

use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::Result;
use crate::hub::ModelHub;
use crate::store::ObjectStore;
use crate::types::UploadPolicy;

/// What a staging run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageSummary {
    pub uploaded: usize,
    pub skipped: usize,
    pub bytes: u64,
}

/// Stages model artifacts through a hub and an object store.
pub struct ArtifactStager<H, S> {
    hub: H,
    store: S,
    policy: UploadPolicy,
}

impl<H: ModelHub, S: ObjectStore> ArtifactStager<H, S> {
    pub fn new(hub: H, store: S, policy: UploadPolicy) -> Self {
        Self { hub, store, policy }
    }

    /// Download `repo_id` at `revision` into `local_root`, then upload the
    /// whole tree under `bucket/prefix/`.
    pub async fn stage(
        &self,
        repo_id: &str,
        revision: &str,
        local_root: &Path,
        bucket: &str,
        prefix: &str,
    ) -> Result<StageSummary> {
        self.hub.snapshot(repo_id, revision, local_root).await?;
        self.upload_tree(local_root, bucket, prefix).await
    }

    /// Upload every file under `local_root` to `bucket/prefix/relative_path`.
    pub async fn upload_tree(
        &self,
        local_root: &Path,
        bucket: &str,
        prefix: &str,
    ) -> Result<StageSummary> {
        let mut summary = StageSummary::default();

        for entry in WalkDir::new(local_root).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let local = entry.path();
            let relative = local.strip_prefix(local_root).unwrap_or(local);
            let key = object_key(prefix, relative);
            let size = entry.metadata().map_err(std::io::Error::from)?.len();

            if self.policy == UploadPolicy::SkipIfSameSize {
                if let Some(remote_size) = self.store.object_size(bucket, &key).await? {
                    if remote_size == size {
                        debug!(key, size, "remote object matches size, skipping");
                        summary.skipped += 1;
                        continue;
                    }
                }
            }

            info!(key, bytes = size, "uploading");
            self.store.put_file(local, bucket, &key).await?;
            summary.uploaded += 1;
            summary.bytes += size;
        }

        info!(
            bucket,
            prefix,
            uploaded = summary.uploaded,
            skipped = summary.skipped,
            bytes = summary.bytes,
            "staging complete"
        );
        Ok(summary)
    }
}

/// Join a key prefix and a relative path with `/` separators, regardless
/// of the local platform's separator.
fn object_key(prefix: &str, relative: &Path) -> String {
    let rel: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    let rel = rel.join("/");
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        rel
    } else {
        format!("{prefix}/{rel}")
    }
}
