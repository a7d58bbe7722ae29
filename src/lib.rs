//! HTTP backend for collecting labeled images.
//!
//! Clients post base64 data URLs tagged with a class name; each image is
//! written to the storage directory as `{className}_{n}.png`. The directory
//! listing is the only catalog.

use axum::{
    Router,
    extract::{DefaultBodyLimit, Extension},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod errors;
pub mod image;
pub mod routes;
pub mod storage;

use config::{AppConfig, StorageType};
use errors::StartupError;
use storage::{InMemoryStorage, LocalFileStorage, SerializedStorage, Storage};

/// Builds the backend selected by `config`, creating the storage directory
/// for the local backend if needed.
pub fn build_storage(config: &AppConfig) -> Result<Arc<dyn Storage>, StartupError> {
    let storage: Arc<dyn Storage> = match config.storage_type {
        StorageType::Memory => Arc::new(InMemoryStorage::new()),
        StorageType::Local => Arc::new(
            LocalFileStorage::new(config.storage_path.clone()).map_err(StartupError::Storage)?,
        ),
    };

    if config.serialize_uploads {
        tracing::info!("per-class upload serialization enabled");
        return Ok(Arc::new(SerializedStorage::new(storage)));
    }
    Ok(storage)
}

pub fn build_router(storage: Arc<dyn Storage>, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health))
        .route("/save-image", post(routes::save_image))
        .route("/get-images", get(routes::get_images))
        .route("/saved_images/{*filename}", get(routes::serve_image))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(Extension(storage))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
