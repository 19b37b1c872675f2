use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object '{object_id}' does not exist in bucket '{bucket_id}'")]
    ObjectNotFound {
        bucket_id: String,
        object_id: String,
    },
    #[error("storage backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Capability surface the registry needs from an object storage backend.
///
/// Objects are addressed by (bucket, object id) pairs; which bucket plays
/// the staging, permanent, or outbox role is decided by the caller.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn object_exists(&self, bucket_id: &str, object_id: &str) -> Result<bool, StorageError>;

    async fn copy_object(
        &self,
        source_bucket_id: &str,
        source_object_id: &str,
        dest_bucket_id: &str,
        dest_object_id: &str,
    ) -> Result<(), StorageError>;

    /// Deletes the object, reporting `ObjectNotFound` when there was
    /// nothing to delete so callers can choose to suppress that case.
    async fn delete_object(&self, bucket_id: &str, object_id: &str) -> Result<(), StorageError>;
}

pub struct S3ObjectStorage {
    client: Client,
}

impl S3ObjectStorage {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn object_exists(&self, bucket_id: &str, object_id: &str) -> Result<bool, StorageError> {
        let res = self
            .client
            .head_object()
            .bucket(bucket_id)
            .key(object_id)
            .send()
            .await;

        match res {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(StorageError::Backend(anyhow::anyhow!(service_error)))
                }
            }
        }
    }

    async fn copy_object(
        &self,
        source_bucket_id: &str,
        source_object_id: &str,
        dest_bucket_id: &str,
        dest_object_id: &str,
    ) -> Result<(), StorageError> {
        let res = self
            .client
            .copy_object()
            .bucket(dest_bucket_id)
            .copy_source(format!("{}/{}", source_bucket_id, source_object_id))
            .key(dest_object_id)
            .send()
            .await;

        if let Err(e) = res {
            tracing::error!(
                "S3 copy_object failed: source={}/{}, dest={}/{}, error={:?}",
                source_bucket_id,
                source_object_id,
                dest_bucket_id,
                dest_object_id,
                e
            );
            return Err(StorageError::Backend(e.into()));
        }
        Ok(())
    }

    async fn delete_object(&self, bucket_id: &str, object_id: &str) -> Result<(), StorageError> {
        // S3 deletes are silently idempotent, but this surface must report
        // absence distinctly, so probe before deleting.
        if !self.object_exists(bucket_id, object_id).await? {
            return Err(StorageError::ObjectNotFound {
                bucket_id: bucket_id.to_string(),
                object_id: object_id.to_string(),
            });
        }

        self.client
            .delete_object()
            .bucket(bucket_id)
            .key(object_id)
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.into()))?;
        Ok(())
    }
}

/// In-memory storage for tests and local development.
#[derive(Default)]
pub struct MemoryObjectStorage {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_object(&self, bucket_id: &str, object_id: &str, content: &[u8]) {
        let mut objects = self.objects.lock().await;
        objects.insert(
            (bucket_id.to_string(), object_id.to_string()),
            content.to_vec(),
        );
    }

    pub async fn get_object(&self, bucket_id: &str, object_id: &str) -> Option<Vec<u8>> {
        let objects = self.objects.lock().await;
        objects
            .get(&(bucket_id.to_string(), object_id.to_string()))
            .cloned()
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn object_exists(&self, bucket_id: &str, object_id: &str) -> Result<bool, StorageError> {
        let objects = self.objects.lock().await;
        Ok(objects.contains_key(&(bucket_id.to_string(), object_id.to_string())))
    }

    async fn copy_object(
        &self,
        source_bucket_id: &str,
        source_object_id: &str,
        dest_bucket_id: &str,
        dest_object_id: &str,
    ) -> Result<(), StorageError> {
        let mut objects = self.objects.lock().await;
        let content = objects
            .get(&(source_bucket_id.to_string(), source_object_id.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::ObjectNotFound {
                bucket_id: source_bucket_id.to_string(),
                object_id: source_object_id.to_string(),
            })?;
        objects.insert(
            (dest_bucket_id.to_string(), dest_object_id.to_string()),
            content,
        );
        Ok(())
    }

    async fn delete_object(&self, bucket_id: &str, object_id: &str) -> Result<(), StorageError> {
        let mut objects = self.objects.lock().await;
        objects
            .remove(&(bucket_id.to_string(), object_id.to_string()))
            .map(|_| ())
            .ok_or_else(|| StorageError::ObjectNotFound {
                bucket_id: bucket_id.to_string(),
                object_id: object_id.to_string(),
            })
    }
}

/// One entry per configured storage alias.
#[derive(Clone)]
pub struct StorageNode {
    pub permanent_bucket: String,
    pub storage: Arc<dyn ObjectStorage>,
}

/// Resolves a storage alias to the node holding that alias's permanent
/// bucket. Multi-node deployments configure several aliases; single-node
/// deployments configure one.
#[derive(Clone)]
pub struct ObjectStorages {
    nodes: Arc<HashMap<String, StorageNode>>,
}

impl ObjectStorages {
    pub fn new(nodes: HashMap<String, StorageNode>) -> Self {
        Self {
            nodes: Arc::new(nodes),
        }
    }

    pub fn for_alias(&self, alias: &str) -> Option<&StorageNode> {
        self.nodes.get(alias)
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage_roundtrip() {
        let storage = MemoryObjectStorage::new();
        storage.put_object("staging", "obj1", b"payload").await;

        assert!(storage.object_exists("staging", "obj1").await.unwrap());
        assert!(!storage.object_exists("staging", "other").await.unwrap());
        assert!(!storage.object_exists("permanent", "obj1").await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_storage_copy() {
        let storage = MemoryObjectStorage::new();
        storage.put_object("staging", "obj1", b"payload").await;

        storage
            .copy_object("staging", "obj1", "permanent", "obj2")
            .await
            .unwrap();

        assert_eq!(
            storage.get_object("permanent", "obj2").await,
            Some(b"payload".to_vec())
        );
        // source stays in place
        assert!(storage.object_exists("staging", "obj1").await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_storage_copy_missing_source() {
        let storage = MemoryObjectStorage::new();
        let err = storage
            .copy_object("staging", "missing", "permanent", "obj")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::ObjectNotFound { .. }));
    }

    #[tokio::test]
    async fn test_memory_storage_delete() {
        let storage = MemoryObjectStorage::new();
        storage.put_object("permanent", "obj1", b"payload").await;

        storage.delete_object("permanent", "obj1").await.unwrap();
        assert!(!storage.object_exists("permanent", "obj1").await.unwrap());

        let err = storage.delete_object("permanent", "obj1").await.unwrap_err();
        assert!(matches!(err, StorageError::ObjectNotFound { .. }));
    }

    #[tokio::test]
    async fn test_object_storages_alias_resolution() {
        let storage: Arc<dyn ObjectStorage> = Arc::new(MemoryObjectStorage::new());
        let mut nodes = HashMap::new();
        nodes.insert(
            "hd01".to_string(),
            StorageNode {
                permanent_bucket: "permanent-hd01".to_string(),
                storage,
            },
        );
        let storages = ObjectStorages::new(nodes);

        let node = storages.for_alias("hd01").unwrap();
        assert_eq!(node.permanent_bucket, "permanent-hd01");
        assert!(storages.for_alias("hd02").is_none());
    }
}
