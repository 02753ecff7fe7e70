use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::{ObjectStore, SourceFetcher};
use crate::error::{AppError, AppResult};

/// In-process object storage used when no MinIO endpoint is configured.
///
/// URLs point at this service's own `/storage/{key}` route so that links
/// handed to clients stay downloadable.
pub struct MemoryObjects {
    base_url: String,
    objects: RwLock<HashMap<String, (Bytes, String)>>,
}

impl MemoryObjects {
    pub fn new(app_url: &str) -> Self {
        Self {
            base_url: format!("{}/storage/", app_url.trim_end_matches('/')),
            objects: RwLock::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjects {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> AppResult<String> {
        let mut objects = self.objects.write().await;
        objects.insert(key.to_string(), (data, content_type.to_string()));
        Ok(format!("{}{}", self.base_url, key))
    }

    async fn get(&self, key: &str) -> AppResult<Option<(Bytes, String)>> {
        let objects = self.objects.read().await;
        Ok(objects.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut objects = self.objects.write().await;
        objects.remove(key);
        Ok(())
    }

    fn key_for_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(&self.base_url).map(str::to_string)
    }
}

#[async_trait]
impl SourceFetcher for MemoryObjects {
    async fn fetch(&self, url: &str) -> AppResult<Bytes> {
        let key = self
            .key_for_url(url)
            .ok_or_else(|| AppError::Upstream(format!("Failed to fetch {}: unknown origin", url)))?;

        self.get(&key)
            .await?
            .map(|(data, _)| data)
            .ok_or_else(|| AppError::Upstream(format!("Failed to fetch {}: HTTP 404 Not Found", url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_returns_url_that_fetches_back() {
        let store = MemoryObjects::new("http://localhost:8080/");
        let url = store
            .put("album/user/a.webp", Bytes::from_static(b"abc"), "image/webp")
            .await
            .unwrap();

        assert_eq!(url, "http://localhost:8080/storage/album/user/a.webp");
        assert_eq!(store.key_for_url(&url).as_deref(), Some("album/user/a.webp"));
        assert_eq!(store.fetch(&url).await.unwrap(), Bytes::from_static(b"abc"));
    }

    #[tokio::test]
    async fn fetch_missing_or_foreign_url_fails() {
        let store = MemoryObjects::new("http://localhost:8080");

        assert!(store
            .fetch("http://localhost:8080/storage/missing.webp")
            .await
            .is_err());
        assert!(store.fetch("https://elsewhere.example/a.webp").await.is_err());
    }

    #[tokio::test]
    async fn delete_removes_object() {
        let store = MemoryObjects::new("http://localhost:8080");
        store
            .put("k", Bytes::from_static(b"x"), "application/zip")
            .await
            .unwrap();
        store.delete("k").await.unwrap();

        assert_eq!(store.len().await, 0);
        assert!(store.get("k").await.unwrap().is_none());
    }
}
