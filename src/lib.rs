pub mod api;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod models;
pub mod services;

use crate::config::RegistryConfig;
use crate::services::metadata_store::MetadataStore;
use crate::services::registry::FileRegistry;
use crate::services::storage::ObjectStorages;
use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<FileRegistry>,
    pub metadata_store: Arc<dyn MetadataStore>,
    pub object_storages: ObjectStorages,
    pub config: RegistryConfig,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::handlers::health::health_check))
        .route("/events", post(api::handlers::events::consume_event))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .with_state(state)
}
