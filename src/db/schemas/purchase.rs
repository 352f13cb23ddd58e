//! Purchase document schema
//!
//! One row per unlocked (user, content) pair. The unique compound index is
//! what closes the duplicate-purchase race at the storage layer; the
//! coordinator's precondition check alone is not enough under concurrency.
//! Rows are immutable once created and are the sole source of truth for
//! "has this user unlocked this content".

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for purchases
pub const PURCHASE_COLLECTION: &str = "purchases";

/// Purchase document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PurchaseDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Stable purchase identifier (UUID)
    pub id: String,

    /// Buying user's id
    pub user_id: String,

    /// Unlocked content's id
    pub content_id: String,

    /// Tokens debited; equals the content price at purchase time
    pub tokens_spent: i64,
}

impl PurchaseDoc {
    /// Create a new purchase document
    pub fn new(user_id: String, content_id: String, tokens_spent: i64) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            content_id,
            tokens_spent,
        }
    }
}

impl IntoIndexes for PurchaseDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // At most one purchase per (user, content) pair
            (
                doc! { "user_id": 1, "content_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("user_content_unique".to_string())
                        .build(),
                ),
            ),
            // Purchase history lookups
            (
                doc! { "user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("purchase_user_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for PurchaseDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
