//! Earning document schema
//!
//! Created 1:1 with each purchase; records the creator's share. The sum of a
//! creator's earnings equals their lifetime credited balance from purchases.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for earnings
pub const EARNING_COLLECTION: &str = "earnings";

/// Earning document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct EarningDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Stable earning identifier (UUID)
    pub id: String,

    /// Creator credited by this earning
    pub creator_id: String,

    /// Content the purchase was for
    pub content_id: String,

    /// Creator's share of the purchase
    pub tokens_earned: i64,
}

impl EarningDoc {
    /// Create a new earning document
    pub fn new(creator_id: String, content_id: String, tokens_earned: i64) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            id: uuid::Uuid::new_v4().to_string(),
            creator_id,
            content_id,
            tokens_earned,
        }
    }
}

impl IntoIndexes for EarningDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Earnings history lookups
            (
                doc! { "creator_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("earning_creator_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for EarningDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
