use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "file_metadata")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub file_id: String,
    #[sea_orm(unique)]
    pub object_id: String,
    pub decrypted_sha256: String,
    pub decrypted_size: i64,
    pub upload_date: DateTimeUtc,
    pub decryption_secret_id: String,
    pub encrypted_part_size: i64,
    pub encrypted_parts_md5: Json,   // ordered list of per-part checksums
    pub encrypted_parts_sha256: Json,
    pub content_offset: i64,
    pub storage_alias: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
