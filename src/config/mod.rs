use std::env;

/// Event routing configuration for the registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Inbound event type that triggers file registration
    pub files_to_register_type: String,

    /// Inbound event type that triggers staging to the outbox
    pub files_to_stage_type: String,

    /// Inbound event type that triggers file deletion
    pub files_to_delete_type: String,

    /// Topic for "file registered" notifications
    pub file_registered_topic: String,

    /// Type name for "file registered" notifications
    pub file_registered_type: String,

    /// Topic for "file staged for download" notifications
    pub file_staged_topic: String,

    /// Type name for "file staged for download" notifications
    pub file_staged_type: String,

    /// Topic for "file deleted" notifications
    pub file_deleted_topic: String,

    /// Type name for "file deleted" notifications
    pub file_deleted_type: String,

    /// Endpoint notifications are POSTed to; when unset they are only logged
    pub notify_endpoint: Option<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            files_to_register_type: "file_interrogation_success".to_string(),
            files_to_stage_type: "file_stage_requested".to_string(),
            files_to_delete_type: "file_deletion_requested".to_string(),
            file_registered_topic: "internal_file_registry".to_string(),
            file_registered_type: "file_registered".to_string(),
            file_staged_topic: "internal_file_registry".to_string(),
            file_staged_type: "file_staged_for_download".to_string(),
            file_deleted_topic: "internal_file_registry".to_string(),
            file_deleted_type: "file_deleted".to_string(),
            notify_endpoint: None,
        }
    }
}

impl RegistryConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            files_to_register_type: env::var("FILES_TO_REGISTER_TYPE")
                .unwrap_or(default.files_to_register_type),

            files_to_stage_type: env::var("FILES_TO_STAGE_TYPE")
                .unwrap_or(default.files_to_stage_type),

            files_to_delete_type: env::var("FILES_TO_DELETE_TYPE")
                .unwrap_or(default.files_to_delete_type),

            file_registered_topic: env::var("FILE_REGISTERED_TOPIC")
                .unwrap_or(default.file_registered_topic),

            file_registered_type: env::var("FILE_REGISTERED_TYPE")
                .unwrap_or(default.file_registered_type),

            file_staged_topic: env::var("FILE_STAGED_TOPIC").unwrap_or(default.file_staged_topic),

            file_staged_type: env::var("FILE_STAGED_TYPE").unwrap_or(default.file_staged_type),

            file_deleted_topic: env::var("FILE_DELETED_TOPIC")
                .unwrap_or(default.file_deleted_topic),

            file_deleted_type: env::var("FILE_DELETED_TYPE").unwrap_or(default.file_deleted_type),

            notify_endpoint: env::var("NOTIFY_ENDPOINT").ok(),
        }
    }

    /// Create config for development (notifications logged, not delivered)
    pub fn development() -> Self {
        Self {
            notify_endpoint: None,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();
        assert_eq!(config.files_to_register_type, "file_interrogation_success");
        assert_eq!(config.files_to_stage_type, "file_stage_requested");
        assert_eq!(config.files_to_delete_type, "file_deletion_requested");
        assert_eq!(config.file_registered_topic, "internal_file_registry");
        assert!(config.notify_endpoint.is_none());
    }

    #[test]
    fn test_development_config() {
        let config = RegistryConfig::development();
        assert!(config.notify_endpoint.is_none());
        assert_eq!(config.file_deleted_type, "file_deleted");
    }
}
