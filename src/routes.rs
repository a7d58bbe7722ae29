use axum::{
    Json,
    body::Bytes,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use headers::{ContentType, HeaderMapExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::errors::ApiError;
use crate::image::{ClassName, decode_data_url};
use crate::storage::{ImageUpload, Storage};

#[derive(Debug, Deserialize)]
pub struct SaveImageRequest {
    image: Option<String>,
    #[serde(rename = "className")]
    class_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SaveImageResponse {
    success: bool,
    file_name: String,
}

#[derive(Debug, Serialize)]
pub struct ImageList {
    images: Vec<String>,
}

pub async fn health() -> &'static str {
    concat!("OK\nimage-collector ", env!("CARGO_PKG_VERSION"))
}

pub async fn save_image(
    Extension(storage): Extension<Arc<dyn Storage>>,
    payload: Result<Json<SaveImageRequest>, JsonRejection>,
) -> Result<Json<SaveImageResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::BadRequest(rejection.body_text())
        }
    })?;

    let image = request
        .image
        .ok_or_else(|| ApiError::BadRequest("missing field `image`".into()))?;
    let class_name = request
        .class_name
        .ok_or_else(|| ApiError::BadRequest("missing field `className`".into()))?;

    let class_name = ClassName::parse(class_name)?;
    let bytes = decode_data_url(&image)?;

    let file_name = storage.save(ImageUpload { class_name, bytes }).await?;

    Ok(Json(SaveImageResponse {
        success: true,
        file_name,
    }))
}

pub async fn get_images(
    Extension(storage): Extension<Arc<dyn Storage>>,
) -> Result<Json<ImageList>, ApiError> {
    let images = storage.list().await?;
    tracing::debug!(count = images.len(), "listed images");
    Ok(Json(ImageList { images }))
}

pub async fn serve_image(
    Path(filename): Path<String>,
    Extension(storage): Extension<Arc<dyn Storage>>,
) -> Result<impl IntoResponse, ApiError> {
    let (bytes, content_type) = storage.get(&filename).await?;
    tracing::debug!(file = %filename, bytes = bytes.len(), "served image");

    let mut response = Bytes::from(bytes).into_response();
    response
        .headers_mut()
        .typed_insert(ContentType::from(content_type));

    Ok(response)
}
