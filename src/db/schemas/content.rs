//! Content document schema
//!
//! Catalog entries for creator uploads. Price and storage path are immutable
//! after creation; edits are not part of this service.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for content
pub const CONTENT_COLLECTION: &str = "contents";

/// Kind of study material
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Video,
    Pdf,
    #[default]
    Notes,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Video => write!(f, "video"),
            ContentKind::Pdf => write!(f, "pdf"),
            ContentKind::Notes => write!(f, "notes"),
        }
    }
}

impl std::str::FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(ContentKind::Video),
            "pdf" => Ok(ContentKind::Pdf),
            "notes" => Ok(ContentKind::Notes),
            other => Err(format!("Invalid content type: {}", other)),
        }
    }
}

/// Content document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ContentDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Stable content identifier (UUID)
    pub id: String,

    /// Owning creator's user id
    pub creator_id: String,

    /// Title shown in the catalog
    pub title: String,

    /// Subject (e.g. "Mathematics")
    pub subject: String,

    /// Topic within the subject
    pub topic: String,

    /// Optional description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Kind of material (selects the storage bucket)
    pub content_type: ContentKind,

    /// Path within the storage bucket; never a public URL
    pub storage_path: String,

    /// Price in tokens; always positive
    pub price_tokens: i64,

    /// Average rating (unused by the ledger, kept for the catalog)
    #[serde(default)]
    pub rating: f64,
}

impl ContentDoc {
    /// Create a new content document
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        creator_id: String,
        title: String,
        subject: String,
        topic: String,
        description: Option<String>,
        content_type: ContentKind,
        storage_path: String,
        price_tokens: i64,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            id: uuid::Uuid::new_v4().to_string(),
            creator_id,
            title,
            subject,
            topic,
            description,
            content_type,
            storage_path,
            price_tokens,
            rating: 0.0,
        }
    }
}

impl IntoIndexes for ContentDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on the stable content id
            (
                doc! { "id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("content_id_unique".to_string())
                        .build(),
                ),
            ),
            // Creator's own catalog
            (
                doc! { "creator_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("creator_id_index".to_string())
                        .build(),
                ),
            ),
            // Catalog filters
            (
                doc! { "subject": 1, "topic": 1 },
                Some(
                    IndexOptions::builder()
                        .name("subject_topic_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ContentDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_kind_round_trip() {
        for kind in [ContentKind::Video, ContentKind::Pdf, ContentKind::Notes] {
            let parsed: ContentKind = kind.to_string().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("podcast".parse::<ContentKind>().is_err());
    }
}
