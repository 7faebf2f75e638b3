//! Local Ollama chat provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use docqa_core::{GenerationOptions, Generator, Result};

use crate::http::{send_json, trim_base_url};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Generator backed by a local Ollama server. Needs no API key.
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OllamaGenerator {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
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
impl Generator for OllamaGenerator {
    async fn generate(&self, prompt: &str, options: GenerationOptions) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            stream: false,
            options: ModelOptions {
                temperature: options.temperature,
                num_predict: options.max_tokens,
            },
        };

        debug!("Requesting chat from {} at {}", self.model, self.base_url);

        let response: ChatResponse =
            send_json("ollama", self.client.post(&url).json(&request)).await?;
        Ok(response.message.content)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider(&self) -> &str {
        "ollama"
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    stream: bool,
    options: ModelOptions,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ModelOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_chat_without_streaming() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({
                "model": "llama3",
                "stream": false,
                "options": {"num_predict": 32}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "llama3",
                "message": {"role": "assistant", "content": "Yes."},
                "done": true
            })))
            .mount(&server)
            .await;

        let generator = OllamaGenerator::new("llama3").with_base_url(server.uri());
        let options = GenerationOptions {
            temperature: 0.0,
            max_tokens: 32,
        };

        assert_eq!(generator.generate("q", options).await.unwrap(), "Yes.");
    }

    #[tokio::test]
    async fn test_unknown_model_is_generation_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({"error": "model 'nope' not found"})),
            )
            .mount(&server)
            .await;

        let generator = OllamaGenerator::new("nope").with_base_url(server.uri());
        let err = generator
            .generate("q", GenerationOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "GENERATION_ERROR");
        assert!(err.to_string().contains("not found"));
    }
}
