use thiserror::Error;

use crate::services::storage::{ObjectStorage, StorageError};

/// How a requested copy was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    /// The destination already held the object; nothing was copied.
    AlreadyPresent,
    /// The object was copied to the destination.
    Copied,
}

#[derive(Debug, Error)]
pub enum CopyError {
    #[error("source object '{object_id}' does not exist in bucket '{bucket_id}'")]
    SourceMissing {
        bucket_id: String,
        object_id: String,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Copies an object between buckets unless the destination already holds it.
///
/// The destination check runs first: a populated destination short-circuits
/// with `AlreadyPresent` before the source is even examined. A missing
/// source is reported as `SourceMissing` for the caller to map to its own
/// error kind. The operation is not transactional; errors raised by the
/// copy itself (e.g. a concurrent deletion between check and copy)
/// propagate uninterpreted.
pub async fn copy_if_needed(
    storage: &dyn ObjectStorage,
    source_bucket_id: &str,
    source_object_id: &str,
    dest_bucket_id: &str,
    dest_object_id: &str,
) -> Result<CopyOutcome, CopyError> {
    if storage.object_exists(dest_bucket_id, dest_object_id).await? {
        return Ok(CopyOutcome::AlreadyPresent);
    }

    if !storage
        .object_exists(source_bucket_id, source_object_id)
        .await?
    {
        return Err(CopyError::SourceMissing {
            bucket_id: source_bucket_id.to_string(),
            object_id: source_object_id.to_string(),
        });
    }

    storage
        .copy_object(
            source_bucket_id,
            source_object_id,
            dest_bucket_id,
            dest_object_id,
        )
        .await?;
    Ok(CopyOutcome::Copied)
}
