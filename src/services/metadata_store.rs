use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set, SqlErr};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::entities::file_metadata;
use crate::models::FileMetadata;

#[derive(Debug, Error)]
pub enum MetadataStoreError {
    #[error("no metadata record exists for file '{file_id}'")]
    NotFound { file_id: String },
    #[error("a metadata record for file '{file_id}' already exists")]
    AlreadyExists { file_id: String },
    #[error("stored metadata for file '{file_id}' could not be decoded: {source}")]
    Decode {
        file_id: String,
        source: serde_json::Error,
    },
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

/// Keyed store of canonical file metadata records: get, insert, delete
/// by file id. Records are never updated in place.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get(&self, file_id: &str) -> Result<FileMetadata, MetadataStoreError>;

    /// Inserts a new record, reporting `AlreadyExists` when the file id is
    /// already taken (backed by a unique key, so concurrent inserts cannot
    /// both succeed).
    async fn insert(&self, metadata: &FileMetadata) -> Result<(), MetadataStoreError>;

    async fn delete(&self, file_id: &str) -> Result<(), MetadataStoreError>;

    async fn ping(&self) -> Result<(), MetadataStoreError>;
}

pub struct DbMetadataStore {
    db: DatabaseConnection,
}

impl DbMetadataStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_active_model(metadata: &FileMetadata) -> file_metadata::ActiveModel {
    file_metadata::ActiveModel {
        file_id: Set(metadata.file_id.clone()),
        object_id: Set(metadata.object_id.clone()),
        decrypted_sha256: Set(metadata.decrypted_sha256.clone()),
        decrypted_size: Set(metadata.decrypted_size),
        upload_date: Set(metadata.upload_date),
        decryption_secret_id: Set(metadata.decryption_secret_id.clone()),
        encrypted_part_size: Set(metadata.encrypted_part_size),
        encrypted_parts_md5: Set(serde_json::json!(metadata.encrypted_parts_md5)),
        encrypted_parts_sha256: Set(serde_json::json!(metadata.encrypted_parts_sha256)),
        content_offset: Set(metadata.content_offset),
        storage_alias: Set(metadata.storage_alias.clone()),
    }
}

fn from_model(model: file_metadata::Model) -> Result<FileMetadata, MetadataStoreError> {
    let decode = |e: serde_json::Error| MetadataStoreError::Decode {
        file_id: model.file_id.clone(),
        source: e,
    };
    let encrypted_parts_md5 =
        serde_json::from_value(model.encrypted_parts_md5.clone()).map_err(decode)?;
    let encrypted_parts_sha256 =
        serde_json::from_value(model.encrypted_parts_sha256.clone()).map_err(decode)?;

    Ok(FileMetadata {
        file_id: model.file_id,
        object_id: model.object_id,
        decrypted_sha256: model.decrypted_sha256,
        decrypted_size: model.decrypted_size,
        upload_date: model.upload_date,
        decryption_secret_id: model.decryption_secret_id,
        encrypted_part_size: model.encrypted_part_size,
        encrypted_parts_md5,
        encrypted_parts_sha256,
        content_offset: model.content_offset,
        storage_alias: model.storage_alias,
    })
}

#[async_trait]
impl MetadataStore for DbMetadataStore {
    async fn get(&self, file_id: &str) -> Result<FileMetadata, MetadataStoreError> {
        let model = file_metadata::Entity::find_by_id(file_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| MetadataStoreError::NotFound {
                file_id: file_id.to_string(),
            })?;
        from_model(model)
    }

    async fn insert(&self, metadata: &FileMetadata) -> Result<(), MetadataStoreError> {
        match to_active_model(metadata).insert(&self.db).await {
            Ok(_) => Ok(()),
            Err(e) => match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    Err(MetadataStoreError::AlreadyExists {
                        file_id: metadata.file_id.clone(),
                    })
                }
                _ => Err(MetadataStoreError::Database(e)),
            },
        }
    }

    async fn delete(&self, file_id: &str) -> Result<(), MetadataStoreError> {
        let res = file_metadata::Entity::delete_by_id(file_id)
            .exec(&self.db)
            .await?;
        if res.rows_affected == 0 {
            return Err(MetadataStoreError::NotFound {
                file_id: file_id.to_string(),
            });
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), MetadataStoreError> {
        self.db.ping().await?;
        Ok(())
    }
}

/// In-memory store for tests and local development.
#[derive(Default)]
pub struct MemoryMetadataStore {
    records: Mutex<HashMap<String, FileMetadata>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn get(&self, file_id: &str) -> Result<FileMetadata, MetadataStoreError> {
        let records = self.records.lock().await;
        records
            .get(file_id)
            .cloned()
            .ok_or_else(|| MetadataStoreError::NotFound {
                file_id: file_id.to_string(),
            })
    }

    async fn insert(&self, metadata: &FileMetadata) -> Result<(), MetadataStoreError> {
        let mut records = self.records.lock().await;
        if records.contains_key(&metadata.file_id) {
            return Err(MetadataStoreError::AlreadyExists {
                file_id: metadata.file_id.clone(),
            });
        }
        records.insert(metadata.file_id.clone(), metadata.clone());
        Ok(())
    }

    async fn delete(&self, file_id: &str) -> Result<(), MetadataStoreError> {
        let mut records = self.records.lock().await;
        records
            .remove(file_id)
            .map(|_| ())
            .ok_or_else(|| MetadataStoreError::NotFound {
                file_id: file_id.to_string(),
            })
    }

    async fn ping(&self) -> Result<(), MetadataStoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sea_orm::{ConnectionTrait, Database, Schema};

    fn sample_metadata(file_id: &str) -> FileMetadata {
        FileMetadata {
            file_id: file_id.to_string(),
            object_id: "object-1".to_string(),
            decrypted_sha256: "0".repeat(64),
            decrypted_size: 4096,
            upload_date: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            decryption_secret_id: "secret-1".to_string(),
            encrypted_part_size: 1024,
            encrypted_parts_md5: vec!["a".repeat(32), "b".repeat(32)],
            encrypted_parts_sha256: vec!["c".repeat(64), "d".repeat(64)],
            content_offset: 128,
            storage_alias: "hd01".to_string(),
        }
    }

    async fn setup_db_store() -> DbMetadataStore {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let backend = db.get_database_backend();
        let schema = Schema::new(backend);
        db.execute(backend.build(&schema.create_table_from_entity(file_metadata::Entity)))
            .await
            .unwrap();
        DbMetadataStore::new(db)
    }

    #[tokio::test]
    async fn test_db_store_roundtrip() {
        let store = setup_db_store().await;
        let metadata = sample_metadata("file-1");

        store.insert(&metadata).await.unwrap();
        let fetched = store.get("file-1").await.unwrap();
        assert_eq!(fetched, metadata);
    }

    #[tokio::test]
    async fn test_db_store_duplicate_insert() {
        let store = setup_db_store().await;
        let metadata = sample_metadata("file-1");

        store.insert(&metadata).await.unwrap();
        let err = store.insert(&metadata).await.unwrap_err();
        assert!(matches!(err, MetadataStoreError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_db_store_get_missing() {
        let store = setup_db_store().await;
        let err = store.get("absent").await.unwrap_err();
        assert!(matches!(err, MetadataStoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_db_store_delete() {
        let store = setup_db_store().await;
        store.insert(&sample_metadata("file-1")).await.unwrap();

        store.delete("file-1").await.unwrap();
        let err = store.delete("file-1").await.unwrap_err();
        assert!(matches!(err, MetadataStoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_memory_store_matches_db_semantics() {
        let store = MemoryMetadataStore::new();
        let metadata = sample_metadata("file-1");

        store.insert(&metadata).await.unwrap();
        assert_eq!(store.get("file-1").await.unwrap(), metadata);

        let err = store.insert(&metadata).await.unwrap_err();
        assert!(matches!(err, MetadataStoreError::AlreadyExists { .. }));

        store.delete("file-1").await.unwrap();
        let err = store.delete("file-1").await.unwrap_err();
        assert!(matches!(err, MetadataStoreError::NotFound { .. }));
    }
}
