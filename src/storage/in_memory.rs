use super::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Volatile backend with the same naming rules as [`LocalFileStorage`].
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn save(&self, upload: ImageUpload) -> Result<String, ApiError> {
        let existing = self
            .files
            .read()
            .await
            .keys()
            .filter(|name| upload.class_name.prefixes(name))
            .count();

        let file_name = upload.class_name.file_name(existing + 1);
        self.files
            .write()
            .await
            .insert(file_name.clone(), upload.bytes);

        tracing::debug!(file = %file_name, "saved image in memory");
        Ok(file_name)
    }

    async fn get(&self, file_name: &str) -> Result<(Vec<u8>, Mime), ApiError> {
        let relative = contained_path(file_name)?;
        let key = relative.to_string_lossy();

        self.files
            .read()
            .await
            .get(&*key)
            .map(|bytes| (bytes.clone(), content_type_for(&relative)))
            .ok_or(ApiError::NotFound)
    }

    async fn list(&self) -> Result<Vec<String>, ApiError> {
        Ok(self.files.read().await.keys().cloned().collect())
    }
}
