//! Mock topic predictor for dev mode and tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};

use super::{TopicPrediction, TopicPredictor};
use crate::types::Result;

/// Deterministic predictor; returns canned predictions
pub struct MockPredictor {
    predictions: Vec<TopicPrediction>,
    call_count: AtomicU32,
}

impl MockPredictor {
    pub fn new() -> Self {
        Self {
            predictions: vec![TopicPrediction {
                topic: "Sample Topic".into(),
                confidence: 75.0,
                reasoning: "Mock prediction (no API key configured)".into(),
            }],
            call_count: AtomicU32::new(0),
        }
    }

    /// Replace the canned predictions
    pub fn with_predictions(mut self, predictions: Vec<TopicPrediction>) -> Self {
        self.predictions = predictions;
        self
    }

    /// Number of predict calls made
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl Default for MockPredictor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TopicPredictor for MockPredictor {
    fn id(&self) -> &str {
        "mock-predictor"
    }

    async fn predict(&self, _syllabus: &str, _past_papers: &str) -> Result<Vec<TopicPrediction>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.predictions.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_predictor() {
        let predictor = MockPredictor::new().with_predictions(vec![TopicPrediction {
            topic: "Fourier Series".into(),
            confidence: 90.0,
            reasoning: "Weighted heavily in past papers".into(),
        }]);

        let predictions = predictor.predict("syllabus", "papers").await.unwrap();
        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].topic, "Fourier Series");
        assert_eq!(predictor.call_count(), 1);
    }
}
