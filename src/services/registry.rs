use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::models::FileMetadataDraft;
use crate::services::content_copy::{self, CopyError, CopyOutcome};
use crate::services::events::{
    EventPublishError, EventPublisher, FileDeletedEvent, FileRegisteredEvent, FileStagedEvent,
};
use crate::services::metadata_store::{MetadataStore, MetadataStoreError};
use crate::services::storage::{ObjectStorages, StorageError, StorageNode};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("file '{file_id}' is already registered with different metadata")]
    FileUpdate { file_id: String },

    #[error("content for file '{file_id}' not found in staging at {bucket_id}/{object_id}")]
    FileContentNotInStaging {
        file_id: String,
        bucket_id: String,
        object_id: String,
    },

    #[error("file '{file_id}' is not registered")]
    FileNotInRegistry { file_id: String },

    #[error("checksum mismatch for file '{file_id}': expected {expected}, provided {provided}")]
    ChecksumMismatch {
        file_id: String,
        expected: String,
        provided: String,
    },

    #[error("file '{file_id}' is registered but its content is missing from permanent storage")]
    FileInRegistryButNotInStorage { file_id: String },

    #[error("storage alias '{alias}' is not configured")]
    StorageAliasNotConfigured { alias: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    MetadataStore(#[from] MetadataStoreError),

    #[error(transparent)]
    EventPublish(#[from] EventPublishError),
}

impl RegistryError {
    /// Client-caused errors can be corrected and resubmitted by the caller.
    /// Everything else signals an internal inconsistency or infrastructure
    /// failure and should reach an operator instead of being retried.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RegistryError::FileUpdate { .. }
                | RegistryError::FileContentNotInStaging { .. }
                | RegistryError::FileNotInRegistry { .. }
                | RegistryError::ChecksumMismatch { .. }
        )
    }
}

/// Manages the registry of files held in permanent object storage.
///
/// Registration, staging, and deletion are multi-step workflows over the
/// metadata store and the object storage nodes. Every workflow is safe to
/// re-run after a partial failure; consistency between the two backends is
/// checked, never assumed.
pub struct FileRegistry {
    metadata_store: Arc<dyn MetadataStore>,
    object_storages: ObjectStorages,
    event_publisher: Arc<dyn EventPublisher>,
}

impl FileRegistry {
    pub fn new(
        metadata_store: Arc<dyn MetadataStore>,
        object_storages: ObjectStorages,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            metadata_store,
            object_storages,
            event_publisher,
        }
    }

    fn node_for_alias(&self, alias: &str) -> Result<&StorageNode, RegistryError> {
        match self.object_storages.for_alias(alias) {
            Some(node) => Ok(node),
            None => {
                tracing::error!("Storage alias '{}' is not configured", alias);
                Err(RegistryError::StorageAliasNotConfigured {
                    alias: alias.to_string(),
                })
            }
        }
    }

    /// Checks whether the file is already registered. Three outcomes:
    /// an identical record exists (`Ok(true)`), no record exists
    /// (`Ok(false)`), or a record with differing metadata exists
    /// (`FileUpdate` error). The object id is generated at registration
    /// time and excluded from the comparison.
    async fn is_file_registered(
        &self,
        draft: &FileMetadataDraft,
    ) -> Result<bool, RegistryError> {
        let registered = match self.metadata_store.get(&draft.file_id).await {
            Ok(metadata) => metadata,
            Err(MetadataStoreError::NotFound { .. }) => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        if registered.to_draft() == *draft {
            return Ok(true);
        }

        Err(RegistryError::FileUpdate {
            file_id: draft.file_id.clone(),
        })
    }

    fn staging_copy_error(&self, file_id: &str, error: CopyError) -> RegistryError {
        match error {
            CopyError::SourceMissing {
                bucket_id,
                object_id,
            } => {
                tracing::error!(
                    "Content for file '{}' not found in staging at {}/{}",
                    file_id,
                    bucket_id,
                    object_id
                );
                RegistryError::FileContentNotInStaging {
                    file_id: file_id.to_string(),
                    bucket_id,
                    object_id,
                }
            }
            CopyError::Storage(e) => RegistryError::Storage(e),
        }
    }

    /// Registers a file and copies its content from staging into permanent
    /// storage.
    ///
    /// Registration is idempotent: a file already registered with identical
    /// metadata is a no-op (no copy, no insert, no notification).
    /// Re-registering with differing metadata fails with `FileUpdate` since
    /// records are immutable. The content copy completes strictly before
    /// the metadata insert, so an interrupted run can leave an orphaned
    /// storage object but never a record pointing at absent content.
    pub async fn register_file(
        &self,
        draft: FileMetadataDraft,
        staging_object_id: &str,
        staging_bucket_id: &str,
    ) -> Result<(), RegistryError> {
        if self.is_file_registered(&draft).await? {
            tracing::info!("File '{}' is already registered", draft.file_id);
            return Ok(());
        }

        tracing::info!(
            "File '{}' is not yet registered, generating object ID",
            draft.file_id
        );
        let object_id = Uuid::new_v4().to_string();
        let metadata = draft.with_object_id(object_id);

        let node = self.node_for_alias(&metadata.storage_alias)?;

        content_copy::copy_if_needed(
            node.storage.as_ref(),
            staging_bucket_id,
            staging_object_id,
            &node.permanent_bucket,
            &metadata.object_id,
        )
        .await
        .map_err(|e| self.staging_copy_error(&metadata.file_id, e))?;

        tracing::info!("Inserting metadata record for file '{}'", metadata.file_id);
        self.metadata_store.insert(&metadata).await?;

        self.event_publisher
            .file_registered(FileRegisteredEvent::new(&metadata, &node.permanent_bucket))
            .await?;
        Ok(())
    }

    /// Copies a registered file's content from permanent storage to the
    /// given outbox location and announces it as staged.
    ///
    /// The provided checksum must match the stored one; it guards against a
    /// caller talking about the wrong file. A metadata record whose
    /// permanent object is missing is reported as
    /// `FileInRegistryButNotInStorage`: the two backends disagree and no
    /// retry will fix that. The staged notification is emitted on every
    /// successful call, including calls where the outbox already held the
    /// content and no bytes moved.
    pub async fn stage_registered_file(
        &self,
        file_id: &str,
        decrypted_sha256: &str,
        target_object_id: &str,
        target_bucket_id: &str,
    ) -> Result<(), RegistryError> {
        let metadata = match self.metadata_store.get(file_id).await {
            Ok(metadata) => metadata,
            Err(MetadataStoreError::NotFound { .. }) => {
                let err = RegistryError::FileNotInRegistry {
                    file_id: file_id.to_string(),
                };
                tracing::error!("{}", err);
                return Err(err);
            }
            Err(e) => return Err(e.into()),
        };

        if decrypted_sha256 != metadata.decrypted_sha256 {
            let err = RegistryError::ChecksumMismatch {
                file_id: file_id.to_string(),
                expected: metadata.decrypted_sha256.clone(),
                provided: decrypted_sha256.to_string(),
            };
            tracing::error!("{}", err);
            return Err(err);
        }

        let node = self.node_for_alias(&metadata.storage_alias)?;

        let outcome = content_copy::copy_if_needed(
            node.storage.as_ref(),
            &node.permanent_bucket,
            &metadata.object_id,
            target_bucket_id,
            target_object_id,
        )
        .await
        .map_err(|e| match e {
            CopyError::SourceMissing { .. } => {
                let err = RegistryError::FileInRegistryButNotInStorage {
                    file_id: file_id.to_string(),
                };
                tracing::error!("{}", err);
                err
            }
            CopyError::Storage(e) => RegistryError::Storage(e),
        })?;

        match outcome {
            CopyOutcome::Copied => {
                tracing::info!(
                    "Content for file '{}' staged to {}/{}",
                    file_id,
                    target_bucket_id,
                    target_object_id
                );
            }
            CopyOutcome::AlreadyPresent => {
                tracing::info!(
                    "Content for file '{}' already present at {}/{}",
                    file_id,
                    target_bucket_id,
                    target_object_id
                );
            }
        }

        self.event_publisher
            .file_staged(FileStagedEvent {
                file_id: file_id.to_string(),
                decrypted_sha256: decrypted_sha256.to_string(),
                target_object_id: target_object_id.to_string(),
                target_bucket_id: target_bucket_id.to_string(),
                storage_alias: metadata.storage_alias.clone(),
            })
            .await?;
        Ok(())
    }

    /// Deletes a file's permanent content and metadata record.
    ///
    /// Deletion is repeatable: an unknown file id, an already deleted
    /// object, and an already deleted record are all tolerated, and the
    /// deleted notification goes out unconditionally once cleanup is done.
    pub async fn delete_file(&self, file_id: &str) -> Result<(), RegistryError> {
        let metadata = match self.metadata_store.get(file_id).await {
            Ok(metadata) => Some(metadata),
            Err(MetadataStoreError::NotFound { .. }) => {
                tracing::info!(
                    "File '{}' has no metadata record, nothing to clean up",
                    file_id
                );
                None
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(metadata) = metadata {
            let node = self.node_for_alias(&metadata.storage_alias)?;

            match node
                .storage
                .delete_object(&node.permanent_bucket, &metadata.object_id)
                .await
            {
                Ok(()) => {}
                Err(StorageError::ObjectNotFound { .. }) => {
                    tracing::info!("Permanent object for file '{}' was already gone", file_id);
                }
                Err(e) => return Err(e.into()),
            }

            match self.metadata_store.delete(file_id).await {
                Ok(()) => {}
                Err(MetadataStoreError::NotFound { .. }) => {}
                Err(e) => return Err(e.into()),
            }

            tracing::info!(
                "Finished storage and metadata deletion for file '{}'",
                file_id
            );
        }

        self.event_publisher
            .file_deleted(FileDeletedEvent {
                file_id: file_id.to_string(),
            })
            .await?;
        Ok(())
    }
}
