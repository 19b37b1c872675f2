use axum::{Extension, Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::AppState;
use crate::api::error::ApiError;
use crate::api::middleware::request_id::RequestId;
use crate::models::FileMetadataDraft;

/// Envelope for all inbound events. The type name selects the workflow,
/// the payload is decoded according to it.
#[derive(Debug, Deserialize)]
pub struct EventEnvelope {
    pub event_type: String,
    pub payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct RegisterFileTrigger {
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
    pub staging_object_id: String,
    pub staging_bucket_id: String,
}

#[derive(Debug, Deserialize)]
pub struct StageFileTrigger {
    pub file_id: String,
    pub decrypted_sha256: String,
    pub target_object_id: String,
    pub target_bucket_id: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteFileTrigger {
    pub file_id: String,
}

fn decode<T: serde::de::DeserializeOwned>(
    event_type: &str,
    payload: serde_json::Value,
) -> Result<T, ApiError> {
    serde_json::from_value(payload).map_err(|e| ApiError::InvalidPayload {
        event_type: event_type.to_string(),
        reason: e.to_string(),
    })
}

pub async fn consume_event(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Json(envelope): Json<EventEnvelope>,
) -> Result<StatusCode, ApiError> {
    let event_type = envelope.event_type;
    tracing::info!("Processing '{}' event [request_id: {}]", event_type, request_id);

    if event_type == state.config.files_to_register_type {
        let RegisterFileTrigger {
            file_id,
            decrypted_sha256,
            decrypted_size,
            upload_date,
            decryption_secret_id,
            encrypted_part_size,
            encrypted_parts_md5,
            encrypted_parts_sha256,
            content_offset,
            storage_alias,
            staging_object_id,
            staging_bucket_id,
        } = decode(&event_type, envelope.payload)?;

        let draft = FileMetadataDraft {
            file_id,
            decrypted_sha256,
            decrypted_size,
            upload_date,
            decryption_secret_id,
            encrypted_part_size,
            encrypted_parts_md5,
            encrypted_parts_sha256,
            content_offset,
            storage_alias,
        };

        state
            .registry
            .register_file(draft, &staging_object_id, &staging_bucket_id)
            .await?;
    } else if event_type == state.config.files_to_stage_type {
        let trigger: StageFileTrigger = decode(&event_type, envelope.payload)?;

        state
            .registry
            .stage_registered_file(
                &trigger.file_id,
                &trigger.decrypted_sha256,
                &trigger.target_object_id,
                &trigger.target_bucket_id,
            )
            .await?;
    } else if event_type == state.config.files_to_delete_type {
        let trigger: DeleteFileTrigger = decode(&event_type, envelope.payload)?;

        state.registry.delete_file(&trigger.file_id).await?;
    } else {
        return Err(ApiError::UnknownEventType(event_type));
    }

    Ok(StatusCode::NO_CONTENT)
}
