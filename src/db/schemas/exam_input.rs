//! Exam input document schema
//!
//! Records the storage paths of an uploaded syllabus / past-papers pair for
//! the exam-mode topic predictor.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for exam inputs
pub const EXAM_INPUT_COLLECTION: &str = "exam_inputs";

/// Exam input document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ExamInputDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Stable exam input identifier (UUID)
    pub id: String,

    /// Uploading user's id
    pub user_id: String,

    /// Syllabus path within the exam bucket
    pub syllabus_path: String,

    /// Past papers path within the exam bucket
    pub past_papers_path: String,
}

impl ExamInputDoc {
    /// Create a new exam input document
    pub fn new(user_id: String, syllabus_path: String, past_papers_path: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            syllabus_path,
            past_papers_path,
        }
    }
}

impl IntoIndexes for ExamInputDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "user_id": 1 },
            Some(
                IndexOptions::builder()
                    .name("exam_input_user_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for ExamInputDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
