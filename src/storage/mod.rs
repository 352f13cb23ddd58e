//! Object storage collaborator
//!
//! Narrow interface over the external object-storage service: uploads and
//! time-limited signed access URLs. Bucket selection by content type is a
//! thin routing rule; everything behind `ObjectStore` is out of scope for
//! the ledger.

mod http;
mod memory;

pub use http::HttpObjectStore;
pub use memory::MemoryObjectStore;

use async_trait::async_trait;

use crate::db::schemas::ContentKind;
use crate::types::Result;

/// Bucket for video uploads
pub const VIDEOS_BUCKET: &str = "videos";

/// Bucket for PDF and notes uploads
pub const NOTES_BUCKET: &str = "notes";

/// Bucket for exam-mode syllabus / past-paper uploads
pub const EXAM_FILES_BUCKET: &str = "exam-files";

/// Select the bucket for a kind of content
pub fn bucket_for(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Video => VIDEOS_BUCKET,
        ContentKind::Pdf | ContentKind::Notes => NOTES_BUCKET,
    }
}

/// Interface to the external object-storage service
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store bytes at a path within a bucket
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<()>;

    /// Issue a time-limited retrieval URL for a stored object
    async fn signed_url(&self, bucket: &str, path: &str, ttl_secs: u64) -> Result<String>;

    /// Fetch stored bytes (exam-mode text extraction)
    async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_routing() {
        assert_eq!(bucket_for(ContentKind::Video), "videos");
        assert_eq!(bucket_for(ContentKind::Pdf), "notes");
        assert_eq!(bucket_for(ContentKind::Notes), "notes");
    }
}
