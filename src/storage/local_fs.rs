use super::*;
use std::io::ErrorKind;
use tokio::fs;

pub struct LocalFileStorage {
    storage_path: PathBuf,
}

impl LocalFileStorage {
    /// Creates the storage directory if it is missing. Existing contents are
    /// left as they are; an existing non-directory at the path is an error.
    pub fn new(storage_path: PathBuf) -> std::io::Result<Self> {
        if !storage_path.exists() {
            std::fs::create_dir_all(&storage_path)?;
            tracing::info!(path = %storage_path.display(), "created storage directory");
        } else if !storage_path.is_dir() {
            return Err(std::io::Error::new(
                ErrorKind::AlreadyExists,
                format!("{} exists and is not a directory", storage_path.display()),
            ));
        }
        Ok(Self { storage_path })
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    async fn entry_names(&self) -> Result<Vec<String>, ApiError> {
        let mut entries = fs::read_dir(&self.storage_path).await?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }

        Ok(names)
    }
}

fn not_found_or_io(err: std::io::Error) -> ApiError {
    match err.kind() {
        ErrorKind::NotFound => ApiError::NotFound,
        _ => ApiError::Io(err),
    }
}

#[async_trait]
impl Storage for LocalFileStorage {
    async fn save(&self, upload: ImageUpload) -> Result<String, ApiError> {
        let existing = self
            .entry_names()
            .await?
            .iter()
            .filter(|name| upload.class_name.prefixes(name))
            .count();

        let file_name = upload.class_name.file_name(existing + 1);
        let file_path = self.storage_path.join(&file_name);

        fs::write(&file_path, &upload.bytes).await?;

        tracing::info!(
            class = %upload.class_name,
            file = %file_name,
            bytes = upload.bytes.len(),
            "saved image"
        );
        Ok(file_name)
    }

    async fn get(&self, file_name: &str) -> Result<(Vec<u8>, Mime), ApiError> {
        let relative = contained_path(file_name)?;
        let file_path = self.storage_path.join(&relative);

        let metadata = fs::metadata(&file_path).await.map_err(not_found_or_io)?;
        if !metadata.is_file() {
            return Err(ApiError::NotFound);
        }

        let bytes = fs::read(&file_path).await.map_err(not_found_or_io)?;
        Ok((bytes, content_type_for(&relative)))
    }

    async fn list(&self) -> Result<Vec<String>, ApiError> {
        self.entry_names().await
    }
}
