use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::RegistryConfig;
use crate::models::FileMetadata;

/// Payload of the "file internally registered" notification: the full
/// metadata record plus the permanent bucket the content landed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRegisteredEvent {
    pub file_id: String,
    pub object_id: String,
    pub bucket_id: String,
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

impl FileRegisteredEvent {
    pub fn new(metadata: &FileMetadata, bucket_id: &str) -> Self {
        Self {
            file_id: metadata.file_id.clone(),
            object_id: metadata.object_id.clone(),
            bucket_id: bucket_id.to_string(),
            decrypted_sha256: metadata.decrypted_sha256.clone(),
            decrypted_size: metadata.decrypted_size,
            upload_date: metadata.upload_date,
            decryption_secret_id: metadata.decryption_secret_id.clone(),
            encrypted_part_size: metadata.encrypted_part_size,
            encrypted_parts_md5: metadata.encrypted_parts_md5.clone(),
            encrypted_parts_sha256: metadata.encrypted_parts_sha256.clone(),
            content_offset: metadata.content_offset,
            storage_alias: metadata.storage_alias.clone(),
        }
    }
}

/// Payload of the "file staged for download" notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStagedEvent {
    pub file_id: String,
    pub decrypted_sha256: String,
    pub target_object_id: String,
    pub target_bucket_id: String,
    pub storage_alias: String,
}

/// Payload of the "file deleted" notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDeletedEvent {
    pub file_id: String,
}

#[derive(Debug, Error)]
pub enum EventPublishError {
    #[error("failed to deliver '{event_type}' event: {reason}")]
    Delivery { event_type: String, reason: String },
}

/// Outbound notifications produced by the registry workflows.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn file_registered(&self, event: FileRegisteredEvent) -> Result<(), EventPublishError>;

    async fn file_staged(&self, event: FileStagedEvent) -> Result<(), EventPublishError>;

    async fn file_deleted(&self, event: FileDeletedEvent) -> Result<(), EventPublishError>;
}

/// Delivers notifications as HTTP POSTs of `{topic, event_type, key,
/// payload}` envelopes to the configured endpoint, keyed by file id.
pub struct WebhookEventPublisher {
    client: reqwest::Client,
    endpoint: String,
    config: RegistryConfig,
}

impl WebhookEventPublisher {
    pub fn new(endpoint: String, config: RegistryConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            config,
        }
    }

    async fn post(
        &self,
        topic: &str,
        event_type: &str,
        key: &str,
        payload: serde_json::Value,
    ) -> Result<(), EventPublishError> {
        let envelope = serde_json::json!({
            "topic": topic,
            "event_type": event_type,
            "key": key,
            "payload": payload,
        });

        let res = self
            .client
            .post(&self.endpoint)
            .json(&envelope)
            .send()
            .await
            .map_err(|e| EventPublishError::Delivery {
                event_type: event_type.to_string(),
                reason: e.to_string(),
            })?;

        if !res.status().is_success() {
            return Err(EventPublishError::Delivery {
                event_type: event_type.to_string(),
                reason: format!("endpoint returned status {}", res.status()),
            });
        }
        Ok(())
    }
}

fn encode<T: Serialize>(event_type: &str, event: &T) -> Result<serde_json::Value, EventPublishError> {
    serde_json::to_value(event).map_err(|e| EventPublishError::Delivery {
        event_type: event_type.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl EventPublisher for WebhookEventPublisher {
    async fn file_registered(&self, event: FileRegisteredEvent) -> Result<(), EventPublishError> {
        let event_type = self.config.file_registered_type.clone();
        let key = event.file_id.clone();
        let payload = encode(&event_type, &event)?;
        self.post(&self.config.file_registered_topic, &event_type, &key, payload)
            .await
    }

    async fn file_staged(&self, event: FileStagedEvent) -> Result<(), EventPublishError> {
        let event_type = self.config.file_staged_type.clone();
        let key = event.file_id.clone();
        let payload = encode(&event_type, &event)?;
        self.post(&self.config.file_staged_topic, &event_type, &key, payload)
            .await
    }

    async fn file_deleted(&self, event: FileDeletedEvent) -> Result<(), EventPublishError> {
        let event_type = self.config.file_deleted_type.clone();
        let key = event.file_id.clone();
        let payload = encode(&event_type, &event)?;
        self.post(&self.config.file_deleted_topic, &event_type, &key, payload)
            .await
    }
}

/// Logs notifications instead of delivering them (development mode).
pub struct LogEventPublisher;

#[async_trait]
impl EventPublisher for LogEventPublisher {
    async fn file_registered(&self, event: FileRegisteredEvent) -> Result<(), EventPublishError> {
        tracing::info!(
            "event file_registered: file_id={}, object_id={}, bucket_id={}",
            event.file_id,
            event.object_id,
            event.bucket_id
        );
        Ok(())
    }

    async fn file_staged(&self, event: FileStagedEvent) -> Result<(), EventPublishError> {
        tracing::info!(
            "event file_staged: file_id={}, target={}/{}",
            event.file_id,
            event.target_bucket_id,
            event.target_object_id
        );
        Ok(())
    }

    async fn file_deleted(&self, event: FileDeletedEvent) -> Result<(), EventPublishError> {
        tracing::info!("event file_deleted: file_id={}", event.file_id);
        Ok(())
    }
}

/// Records notifications in memory so tests can assert on them.
#[derive(Default)]
pub struct MemoryEventPublisher {
    events: Mutex<Vec<RecordedEvent>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedEvent {
    Registered(FileRegisteredEvent),
    Staged(FileStagedEvent),
    Deleted(FileDeletedEvent),
}

impl MemoryEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn recorded(&self) -> Vec<RecordedEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventPublisher for MemoryEventPublisher {
    async fn file_registered(&self, event: FileRegisteredEvent) -> Result<(), EventPublishError> {
        self.events
            .lock()
            .await
            .push(RecordedEvent::Registered(event));
        Ok(())
    }

    async fn file_staged(&self, event: FileStagedEvent) -> Result<(), EventPublishError> {
        self.events.lock().await.push(RecordedEvent::Staged(event));
        Ok(())
    }

    async fn file_deleted(&self, event: FileDeletedEvent) -> Result<(), EventPublishError> {
        self.events.lock().await.push(RecordedEvent::Deleted(event));
        Ok(())
    }
}

/// Factory function to create the publisher matching the configuration.
pub fn create_event_publisher(config: &RegistryConfig) -> Box<dyn EventPublisher> {
    match &config.notify_endpoint {
        Some(endpoint) => Box::new(WebhookEventPublisher::new(endpoint.clone(), config.clone())),
        None => {
            tracing::warn!("No notify endpoint configured, events will only be logged");
            Box::new(LogEventPublisher)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_metadata() -> FileMetadata {
        FileMetadata {
            file_id: "file-1".to_string(),
            object_id: "object-1".to_string(),
            decrypted_sha256: "f".repeat(64),
            decrypted_size: 100,
            upload_date: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            decryption_secret_id: "secret-1".to_string(),
            encrypted_part_size: 16,
            encrypted_parts_md5: vec!["a".repeat(32)],
            encrypted_parts_sha256: vec!["b".repeat(64)],
            content_offset: 0,
            storage_alias: "hd01".to_string(),
        }
    }

    #[test]
    fn test_registered_event_carries_full_metadata() {
        let event = FileRegisteredEvent::new(&sample_metadata(), "permanent-hd01");

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["file_id"], "file-1");
        assert_eq!(value["object_id"], "object-1");
        assert_eq!(value["bucket_id"], "permanent-hd01");
        assert_eq!(value["storage_alias"], "hd01");
        assert_eq!(value["encrypted_parts_md5"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_memory_publisher_records_in_order() {
        let publisher = MemoryEventPublisher::new();

        publisher
            .file_registered(FileRegisteredEvent::new(&sample_metadata(), "bucket"))
            .await
            .unwrap();
        publisher
            .file_deleted(FileDeletedEvent {
                file_id: "file-1".to_string(),
            })
            .await
            .unwrap();

        let recorded = publisher.recorded().await;
        assert_eq!(recorded.len(), 2);
        assert!(matches!(recorded[0], RecordedEvent::Registered(_)));
        assert!(matches!(recorded[1], RecordedEvent::Deleted(_)));
    }

    #[tokio::test]
    async fn test_create_event_publisher_without_endpoint() {
        let config = RegistryConfig {
            notify_endpoint: None,
            ..RegistryConfig::default()
        };

        let publisher = create_event_publisher(&config);
        publisher
            .file_deleted(FileDeletedEvent {
                file_id: "file-1".to_string(),
            })
            .await
            .unwrap();
    }
}
