//! In-memory object store for dev mode and tests

use async_trait::async_trait;
use dashmap::DashMap;

use super::ObjectStore;
use crate::types::{BursarError, Result};

/// Memory-backed object store; URLs are synthetic and never fetched
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: DashMap<(String, String), Vec<u8>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the store holds no objects
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<()> {
        self.objects
            .insert((bucket.to_string(), path.to_string()), bytes);
        Ok(())
    }

    async fn signed_url(&self, bucket: &str, path: &str, ttl_secs: u64) -> Result<String> {
        if !self.objects.contains_key(&(bucket.to_string(), path.to_string())) {
            return Err(BursarError::Storage(format!(
                "Object not found: {}/{}",
                bucket, path
            )));
        }
        Ok(format!("memory://{}/{}?expires_in={}", bucket, path, ttl_secs))
    }

    async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>> {
        self.objects
            .get(&(bucket.to_string(), path.to_string()))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BursarError::Storage(format!("Object not found: {}/{}", bucket, path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_sign_download() {
        let store = MemoryObjectStore::new();
        store
            .upload("notes", "u1/a.md", b"# Notes".to_vec(), "text/markdown")
            .await
            .unwrap();

        let url = store.signed_url("notes", "u1/a.md", 7200).await.unwrap();
        assert!(url.starts_with("memory://notes/u1/a.md"));
        assert!(url.contains("expires_in=7200"));

        let bytes = store.download("notes", "u1/a.md").await.unwrap();
        assert_eq!(bytes, b"# Notes");
    }

    #[tokio::test]
    async fn test_missing_object() {
        let store = MemoryObjectStore::new();
        assert!(store.signed_url("notes", "nope", 60).await.is_err());
        assert!(store.download("notes", "nope").await.is_err());
    }
}
