//! Google Gemini `generateContent` provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use docqa_core::{GenerationOptions, Generator, RagError, Result};

use crate::http::{send_json, trim_base_url};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Generator backed by the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiGenerator {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = trim_base_url(base_url);
        self
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    async fn generate(&self, prompt: &str, options: GenerationOptions) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationSettings {
                temperature: options.temperature,
                max_output_tokens: options.max_tokens,
            },
        };

        debug!("Requesting content from {}", self.model);

        let response: GenerateResponse = send_json(
            "gemini",
            self.client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&request),
        )
        .await?;

        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| RagError::generation("gemini: response contained no candidates"))?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(RagError::generation("gemini: candidate contained no text"));
        }
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider(&self) -> &str {
        "gemini"
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationSettings,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationSettings {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_generate_content() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
            .and(header("x-goog-api-key", "g-key"))
            .and(body_partial_json(serde_json::json!({
                "contents": [{"role": "user", "parts": [{"text": "prompt"}]}],
                "generationConfig": {"maxOutputTokens": 128}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {
                        "role": "model",
                        "parts": [{"text": "Refunds take "}, {"text": "14 days."}]
                    },
                    "finishReason": "STOP"
                }]
            })))
            .mount(&server)
            .await;

        let generator = GeminiGenerator::new("g-key", "gemini-1.5-flash")
            .with_base_url(format!("{}/v1beta", server.uri()));
        let options = GenerationOptions {
            temperature: 0.1,
            max_tokens: 128,
        };

        let answer = generator.generate("prompt", options).await.unwrap();
        assert_eq!(answer, "Refunds take 14 days.");
        assert_eq!(generator.provider(), "gemini");
    }

    #[tokio::test]
    async fn test_blocked_prompt_is_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "promptFeedback": {"blockReason": "SAFETY"}
            })))
            .mount(&server)
            .await;

        let generator = GeminiGenerator::new("k", "gemini-1.5-flash").with_base_url(server.uri());
        let err = generator
            .generate("p", GenerationOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "GENERATION_ERROR");
    }
}
