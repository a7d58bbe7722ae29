mod in_memory;
mod local_fs;
mod serialized;

pub use in_memory::InMemoryStorage;
pub use local_fs::LocalFileStorage;
pub use serialized::SerializedStorage;

use crate::errors::ApiError;
use crate::image::ClassName;
use async_trait::async_trait;
use mime::Mime;
use std::path::{Component, Path, PathBuf};

#[derive(Debug)]
pub struct ImageUpload {
    pub class_name: ClassName,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Stores the image under the next sequence number for its class and
    /// returns the generated file name.
    ///
    /// The count-then-write is not atomic: concurrent saves for the same
    /// class can pick the same name, and the later write wins.
    async fn save(&self, upload: ImageUpload) -> Result<String, ApiError>;
    async fn get(&self, file_name: &str) -> Result<(Vec<u8>, Mime), ApiError>;
    async fn list(&self) -> Result<Vec<String>, ApiError>;
}

/// Normalizes a requested path into one relative to the storage root.
///
/// Any `..`, root or prefix component is rejected outright, so the result
/// can be joined onto the root without escaping it.
pub fn contained_path(requested: &str) -> Result<PathBuf, ApiError> {
    let mut relative = PathBuf::new();
    for component in Path::new(requested).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                tracing::warn!(path = %requested, "rejected path outside storage root");
                return Err(ApiError::Forbidden);
            }
        }
    }
    if relative.as_os_str().is_empty() {
        return Err(ApiError::NotFound);
    }
    Ok(relative)
}

pub fn content_type_for(file_name: &Path) -> Mime {
    mime_guess::from_path(file_name).first_or_octet_stream()
}
