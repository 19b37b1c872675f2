use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// File metadata as delivered by the interrogation/validation pipeline,
/// before an internal object id has been assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadataDraft {
    pub file_id: String,
    pub decrypted_sha256: String,
    pub decrypted_size: i64,
    pub upload_date: DateTime<Utc>,
    pub decryption_secret_id: String,
    pub encrypted_part_size: i64,
    pub encrypted_parts_md5: Vec<String>,
    pub encrypted_parts_sha256: Vec<String>,
    pub content_offset: i64,
    pub storage_alias: String,
}

/// The canonical registry record. Identical to the draft plus the
/// generated `object_id` under which the content lives in permanent
/// storage. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub file_id: String,
    pub object_id: String,
    pub decrypted_sha256: String,
    pub decrypted_size: i64,
    pub upload_date: DateTime<Utc>,
    pub decryption_secret_id: String,
    pub encrypted_part_size: i64,
    pub encrypted_parts_md5: Vec<String>,
    pub encrypted_parts_sha256: Vec<String>,
    pub content_offset: i64,
    pub storage_alias: String,
}

impl FileMetadataDraft {
    pub fn with_object_id(self, object_id: String) -> FileMetadata {
        FileMetadata {
            file_id: self.file_id,
            object_id,
            decrypted_sha256: self.decrypted_sha256,
            decrypted_size: self.decrypted_size,
            upload_date: self.upload_date,
            decryption_secret_id: self.decryption_secret_id,
            encrypted_part_size: self.encrypted_part_size,
            encrypted_parts_md5: self.encrypted_parts_md5,
            encrypted_parts_sha256: self.encrypted_parts_sha256,
            content_offset: self.content_offset,
            storage_alias: self.storage_alias,
        }
    }
}

impl FileMetadata {
    /// Strips the object id, which is generated rather than supplied and
    /// therefore excluded when comparing a record against a re-registration
    /// request.
    pub fn to_draft(&self) -> FileMetadataDraft {
        FileMetadataDraft {
            file_id: self.file_id.clone(),
            decrypted_sha256: self.decrypted_sha256.clone(),
            decrypted_size: self.decrypted_size,
            upload_date: self.upload_date,
            decryption_secret_id: self.decryption_secret_id.clone(),
            encrypted_part_size: self.encrypted_part_size,
            encrypted_parts_md5: self.encrypted_parts_md5.clone(),
            encrypted_parts_sha256: self.encrypted_parts_sha256.clone(),
            content_offset: self.content_offset,
            storage_alias: self.storage_alias.clone(),
        }
    }
}
