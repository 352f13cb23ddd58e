//! OpenAI-compatible topic predictor
//!
//! Works with any OpenAI-compatible chat completions API (OpenAI, OpenRouter,
//! vLLM, Ollama). The model is asked for a JSON array of topic predictions;
//! code fences around the JSON are tolerated.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{TopicPrediction, TopicPredictor};
use crate::types::{BursarError, Result};

/// OpenAI-compatible prediction backend
pub struct OpenAiPredictor {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

impl OpenAiPredictor {
    /// Create a predictor against an OpenAI-compatible API
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_prompt(syllabus_text: &str, past_papers_text: &str) -> String {
        format!(
            "You are an AI assistant helping students prepare for exams.\n\n\
             Analyze the following syllabus and past exam papers to predict the most \
             important topics likely to appear on the upcoming exam.\n\n\
             SYLLABUS:\n{}\n\n\
             PAST PAPERS:\n{}\n\n\
             Please provide:\n\
             1. Top 10 predicted exam topics\n\
             2. Confidence score (0-100%) for each topic\n\
             3. Brief reasoning for each prediction\n\n\
             Format your response as a JSON array with this structure:\n\
             [\n  {{\n    \"topic\": \"Topic Name\",\n    \"confidence\": 85,\n    \"reasoning\": \"Brief explanation\"\n  }}\n]",
            syllabus_text, past_papers_text
        )
    }
}

#[async_trait]
impl TopicPredictor for OpenAiPredictor {
    fn id(&self) -> &str {
        &self.model
    }

    async fn predict(
        &self,
        syllabus_text: &str,
        past_papers_text: &str,
    ) -> Result<Vec<TopicPrediction>> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: Self::build_prompt(syllabus_text, past_papers_text),
            }],
            temperature: 0.7,
            max_tokens: 2000,
        };

        debug!(model = %self.model, "Requesting exam topic prediction");

        let response = self
            .client
            .post(self.chat_completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| BursarError::Predictor(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(BursarError::Predictor(format!(
                "Backend returned {}",
                response.status()
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| BursarError::Predictor(format!("Response parse failed: {}", e)))?;

        let content = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| BursarError::Predictor("Empty completion".into()))?;

        parse_predictions(content)
    }
}

/// Parse the model's reply into predictions, tolerating markdown code fences
pub(super) fn parse_predictions(content: &str) -> Result<Vec<TopicPrediction>> {
    let trimmed = content.trim();
    let json = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(json)
        .map_err(|e| BursarError::Predictor(format!("Prediction parse failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let content = r#"[{"topic": "Eigenvalues", "confidence": 85, "reasoning": "Appears in every past paper"}]"#;
        let predictions = parse_predictions(content).unwrap();
        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].topic, "Eigenvalues");
        assert_eq!(predictions[0].confidence, 85.0);
    }

    #[test]
    fn test_parse_fenced_json() {
        let content = "```json\n[{\"topic\": \"Optics\", \"confidence\": 70, \"reasoning\": \"Core syllabus unit\"}]\n```";
        let predictions = parse_predictions(content).unwrap();
        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].topic, "Optics");
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(parse_predictions("I think eigenvalues will come up.").is_err());
    }

    #[test]
    fn test_prompt_includes_inputs() {
        let prompt = OpenAiPredictor::build_prompt("syllabus text", "papers text");
        assert!(prompt.contains("SYLLABUS:\nsyllabus text"));
        assert!(prompt.contains("PAST PAPERS:\npapers text"));
    }
}
