use super::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Wraps another backend so that saves for the same class run one at a
/// time, closing the count-then-write race. Different classes proceed in
/// parallel.
///
/// A class's lock is dropped from the map once no save holds or awaits it.
pub struct SerializedStorage {
    inner: Arc<dyn Storage>,
    class_locks: Mutex<HashMap<ClassName, Arc<Mutex<()>>>>,
}

impl SerializedStorage {
    pub fn new(inner: Arc<dyn Storage>) -> Self {
        Self {
            inner,
            class_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn lock_for(&self, class_name: &ClassName) -> Arc<Mutex<()>> {
        self.class_locks
            .lock()
            .await
            .entry(class_name.clone())
            .or_default()
            .clone()
    }
}

#[async_trait]
impl Storage for SerializedStorage {
    async fn save(&self, upload: ImageUpload) -> Result<String, ApiError> {
        let class_name = upload.class_name.clone();
        let lock = self.lock_for(&class_name).await;
        let result = {
            let _guard = lock.lock().await;
            self.inner.save(upload).await
        };

        // Clones are only handed out and released under the map lock, so a
        // count of 1 leaves the map as the sole holder.
        let mut locks = self.class_locks.lock().await;
        drop(lock);
        if locks
            .get(&class_name)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(&class_name);
        }
        result
    }

    async fn get(&self, file_name: &str) -> Result<(Vec<u8>, Mime), ApiError> {
        self.inner.get(file_name).await
    }

    async fn list(&self) -> Result<Vec<String>, ApiError> {
        self.inner.list().await
    }
}
