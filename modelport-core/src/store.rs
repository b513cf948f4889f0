//! Object store seam — file uploads and size probes.
//!
//! `S3Store` is the production implementation; `MemoryStore` is an
//! in-memory double used by the stager and packaging tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::error::StoreError;

/// The storage surface the stager and package builder consume.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a local file to `bucket` under `key`, replacing any existing
    /// object.
    async fn put_file(&self, local: &Path, bucket: &str, key: &str) -> Result<(), StoreError>;

    /// Byte size of the object at `key`, or `None` when the key is absent.
    async fn object_size(&self, bucket: &str, key: &str) -> Result<Option<u64>, StoreError>;
}

/// `ObjectStore` backed by S3.
#[derive(Clone)]
pub struct S3Store {
    client: aws_sdk_s3::Client,
}

impl S3Store {
    /// Build a store from the shared SDK config. Transfer acceleration is
    /// an explicit flag on the client config, not an ambient toggle.
    pub fn new(sdk_config: &aws_config::SdkConfig, transfer_acceleration: bool) -> Self {
        let config = aws_sdk_s3::config::Builder::from(sdk_config)
            .accelerate(transfer_acceleration)
            .build();
        Self {
            client: aws_sdk_s3::Client::from_conf(config),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_file(&self, local: &Path, bucket: &str, key: &str) -> Result<(), StoreError> {
        if !local.exists() {
            return Err(StoreError::FileNotFound {
                path: local.to_path_buf(),
            });
        }
        let body = aws_sdk_s3::primitives::ByteStream::from_path(local)
            .await
            .map_err(|e| StoreError::Upload {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: e.to_string(),
            })?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| StoreError::Upload {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: e.into_service_error().to_string(),
            })?;
        Ok(())
    }

    async fn object_size(&self, bucket: &str, key: &str) -> Result<Option<u64>, StoreError> {
        match self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
        {
            Ok(head) => Ok(head.content_length().and_then(|len| u64::try_from(len).ok())),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(None)
                } else {
                    Err(StoreError::Head {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                        message: service_err.to_string(),
                    })
                }
            }
        }
    }
}

/// In-memory `ObjectStore` for tests: records every put and serves size
/// probes from seeded or previously uploaded objects.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// (bucket, key) -> object size.
    objects: HashMap<(String, String), u64>,
    /// Chronological record of uploads: (local path, bucket, key).
    puts: Vec<(PathBuf, String, String)>,
    /// When set, the next put fails with this message.
    fail_next_put: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing remote object, as if a previous run uploaded it.
    pub fn seed_object(&self, bucket: &str, key: &str, size: u64) {
        self.inner
            .lock()
            .unwrap()
            .objects
            .insert((bucket.to_string(), key.to_string()), size);
    }

    /// Make the next `put_file` call fail.
    pub fn fail_next_put(&self, message: &str) {
        self.inner.lock().unwrap().fail_next_put = Some(message.to_string());
    }

    pub fn put_count(&self) -> usize {
        self.inner.lock().unwrap().puts.len()
    }

    /// Keys uploaded to `bucket`, in upload order.
    pub fn uploaded_keys(&self, bucket: &str) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .puts
            .iter()
            .filter(|(_, b, _)| b == bucket)
            .map(|(_, _, k)| k.clone())
            .collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_file(&self, local: &Path, bucket: &str, key: &str) -> Result<(), StoreError> {
        let size = std::fs::metadata(local)
            .map_err(|_| StoreError::FileNotFound {
                path: local.to_path_buf(),
            })?
            .len();
        let mut inner = self.inner.lock().unwrap();
        if let Some(message) = inner.fail_next_put.take() {
            return Err(StoreError::Upload {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message,
            });
        }
        debug!(bucket, key, size, "memory store put");
        inner
            .objects
            .insert((bucket.to_string(), key.to_string()), size);
        inner
            .puts
            .push((local.to_path_buf(), bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn object_size(&self, bucket: &str, key: &str) -> Result<Option<u64>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_memory_store_records_puts() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("weights.bin");
        std::fs::write(&file, vec![0u8; 128]).unwrap();

        let store = MemoryStore::new();
        store.put_file(&file, "bucket", "prefix/weights.bin").await.unwrap();

        assert_eq!(store.put_count(), 1);
        assert_eq!(store.uploaded_keys("bucket"), vec!["prefix/weights.bin"]);
        assert_eq!(
            store.object_size("bucket", "prefix/weights.bin").await.unwrap(),
            Some(128)
        );
        assert_eq!(store.object_size("bucket", "missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_store_missing_local_file() {
        let store = MemoryStore::new();
        let err = store
            .put_file(Path::new("/nonexistent/weights.bin"), "bucket", "k")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::FileNotFound { .. }));
    }
}
