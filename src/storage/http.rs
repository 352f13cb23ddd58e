//! HTTP object storage client
//!
//! Talks to a Supabase-style storage REST API: objects are uploaded to
//! `/storage/v1/object/{bucket}/{path}` and signed with
//! `/storage/v1/object/sign/{bucket}/{path}`.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ObjectStore;
use crate::types::{BursarError, Result};

/// Object storage client over the service's REST API
pub struct HttpObjectStore {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct SignRequest {
    #[serde(rename = "expiresIn")]
    expires_in: u64,
}

#[derive(Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

#[derive(Deserialize)]
struct StorageErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl HttpObjectStore {
    /// Create a client for the storage service at `base_url`, authenticating
    /// with the service key
    pub fn new(base_url: impl Into<String>, service_key: &str) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        let mut auth = header::HeaderValue::from_str(&format!("Bearer {}", service_key))
            .map_err(|e| BursarError::Config(format!("Invalid storage service key: {}", e)))?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| BursarError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path)
    }

    fn sign_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/sign/{}/{}", self.base_url, bucket, path)
    }

    async fn error_message(response: reqwest::Response) -> String {
        let status = response.status();
        let body = response
            .json::<StorageErrorBody>()
            .await
            .ok()
            .and_then(|b| b.message.or(b.error));
        match body {
            Some(msg) => format!("{}: {}", status, msg),
            None => status.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        debug!(bucket = %bucket, path = %path, size = bytes.len(), "Uploading object");

        let response = self
            .client
            .post(self.object_url(bucket, path))
            .header(header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| BursarError::Storage(format!("Upload request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(BursarError::Storage(format!(
                "Upload rejected: {}",
                Self::error_message(response).await
            )));
        }

        Ok(())
    }

    async fn signed_url(&self, bucket: &str, path: &str, ttl_secs: u64) -> Result<String> {
        let response = self
            .client
            .post(self.sign_url(bucket, path))
            .json(&SignRequest {
                expires_in: ttl_secs,
            })
            .send()
            .await
            .map_err(|e| BursarError::Storage(format!("Sign request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(BursarError::Storage(format!(
                "Sign rejected: {}",
                Self::error_message(response).await
            )));
        }

        let body: SignResponse = response
            .json()
            .await
            .map_err(|e| BursarError::Storage(format!("Sign response parse failed: {}", e)))?;

        // The API returns a path relative to the storage root
        Ok(format!(
            "{}/storage/v1{}",
            self.base_url,
            body.signed_url
        ))
    }

    async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(self.object_url(bucket, path))
            .send()
            .await
            .map_err(|e| BursarError::Storage(format!("Download request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(BursarError::Storage(format!(
                "Download rejected: {}",
                Self::error_message(response).await
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BursarError::Storage(format!("Download read failed: {}", e)))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_shapes() {
        let store = HttpObjectStore::new("https://storage.example/", "key").unwrap();
        assert_eq!(
            store.object_url("videos", "u1/a.mp4"),
            "https://storage.example/storage/v1/object/videos/u1/a.mp4"
        );
        assert_eq!(
            store.sign_url("notes", "u1/a.pdf"),
            "https://storage.example/storage/v1/object/sign/notes/u1/a.pdf"
        );
    }
}
