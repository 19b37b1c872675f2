use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::registry::RegistryError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    #[error("Invalid payload for event type '{event_type}': {reason}")]
    InvalidPayload { event_type: String, reason: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::UnknownEventType(event_type) => (
                StatusCode::BAD_REQUEST,
                format!("Unknown event type: {}", event_type),
            ),
            ApiError::InvalidPayload { event_type, reason } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Invalid payload for event type '{}': {}", event_type, reason),
            ),
            ApiError::Registry(e) => {
                if e.is_client_error() {
                    let status = match &e {
                        RegistryError::FileNotInRegistry { .. } => StatusCode::NOT_FOUND,
                        _ => StatusCode::CONFLICT,
                    };
                    (status, e.to_string())
                } else {
                    tracing::error!("Registry error: {:?}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal Server Error".to_string(),
                    )
                }
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
