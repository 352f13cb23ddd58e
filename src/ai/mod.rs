//! Exam topic prediction
//!
//! The `TopicPredictor` trait abstracts the LLM backend used by exam mode.
//! Predictions are advisory study guidance; nothing here touches the ledger.

mod mock;
mod openai;

pub use mock::MockPredictor;
pub use openai::OpenAiPredictor;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::Result;

/// A predicted exam topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicPrediction {
    /// Topic name
    pub topic: String,
    /// Confidence score (0-100)
    pub confidence: f64,
    /// Brief reasoning for the prediction
    pub reasoning: String,
}

/// Interface to the exam topic predictor
#[async_trait]
pub trait TopicPredictor: Send + Sync {
    /// Backend identifier (e.g. model name)
    fn id(&self) -> &str;

    /// Predict likely exam topics from syllabus and past-paper text
    async fn predict(
        &self,
        syllabus_text: &str,
        past_papers_text: &str,
    ) -> Result<Vec<TopicPrediction>>;
}

/// Best-effort text extraction from an uploaded study file.
///
/// PDFs and scans would need a real extraction pipeline; for the formats
/// students actually upload here (text, markdown, exported notes) a lossy
/// UTF-8 read is enough for the predictor prompt.
pub fn extract_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_lossy() {
        assert_eq!(extract_text(b"chapter one"), "chapter one");
        // Invalid UTF-8 degrades instead of failing
        let text = extract_text(&[0x66, 0xff, 0x6f]);
        assert!(text.contains('f') && text.contains('o'));
    }
}
