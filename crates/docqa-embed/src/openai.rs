//! OpenAI-compatible embeddings provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use docqa_core::{Embedder, RagError, Result};

/// Default model for embeddings.
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Native output size of an embedding model when no dimension is requested.
///
/// Unknown models are assumed to be 1536 wide like ada-002 and 3-small.
fn native_dimension(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        _ => 1536,
    }
}

/// Embeddings from an OpenAI-compatible `/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    api_key: String,
    model: String,
    dimension: Option<usize>,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiEmbedder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            dimension: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Request vectors of a specific size (text-embedding-3 models only).
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn request_embeddings(&self, input: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);
        let expected = input.len();

        let request = EmbeddingRequest {
            model: &self.model,
            input,
            dimensions: self.dimension,
            encoding_format: "float",
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::embedding(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RagError::embedding(format!(
                "API error {}: {}",
                status, error_text
            )));
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| RagError::embedding(format!("invalid response: {}", e)))?;

        if result.data.len() != expected {
            return Err(RagError::embedding(format!(
                "expected {} embeddings, got {}",
                expected,
                result.data.len()
            )));
        }

        // Sort by index to ensure correct order
        let mut embeddings: Vec<(usize, Vec<f32>)> = result
            .data
            .into_iter()
            .map(|e| (e.index, e.embedding))
            .collect();
        embeddings.sort_by_key(|(idx, _)| *idx);

        debug!("Embedded {} texts with {}", expected, self.model);

        Ok(embeddings.into_iter().map(|(_, e)| e).collect())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request_embeddings(texts.iter().map(|t| t.to_string()).collect())
            .await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.request_embeddings(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::embedding("Empty response"))
    }

    fn dimension(&self) -> usize {
        self.dimension
            .unwrap_or_else(|| native_dimension(&self.model))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
    encoding_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_builder() {
        let embedder = OpenAiEmbedder::new("sk-test")
            .with_model("text-embedding-3-large")
            .with_dimension(256)
            .with_base_url("http://localhost:8080/v1/");

        assert_eq!(embedder.model_name(), "text-embedding-3-large");
        assert_eq!(embedder.dimension(), 256);
        assert_eq!(embedder.base_url, "http://localhost:8080/v1");
        assert_eq!(OpenAiEmbedder::new("k").dimension(), 1536);
    }

    #[test]
    fn test_dimension_follows_model() {
        let large = OpenAiEmbedder::new("k").with_model("text-embedding-3-large");
        assert_eq!(large.dimension(), 3072);

        let ada = OpenAiEmbedder::new("k").with_model("text-embedding-ada-002");
        assert_eq!(ada.dimension(), 1536);

        let pinned = large.with_dimension(1024);
        assert_eq!(pinned.dimension(), 1024);
    }

    #[tokio::test]
    async fn test_embeddings_are_returned_in_input_order() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "text-embedding-3-small",
                "input": ["first", "second"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "object": "list",
                "data": [
                    {"object": "embedding", "index": 1, "embedding": [0.0, 1.0]},
                    {"object": "embedding", "index": 0, "embedding": [1.0, 0.0]}
                ],
                "model": "text-embedding-3-small",
                "usage": {"prompt_tokens": 2, "total_tokens": 2}
            })))
            .mount(&server)
            .await;

        let embedder =
            OpenAiEmbedder::new("sk-test").with_base_url(format!("{}/v1", server.uri()));
        let vectors = embedder.embed_documents(&["first", "second"]).await.unwrap();

        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_api_error_is_embedding_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"message": "Incorrect API key provided"}
            })))
            .mount(&server)
            .await;

        let embedder = OpenAiEmbedder::new("bad").with_base_url(format!("{}/v1", server.uri()));
        let err = embedder.embed_query("hello").await.unwrap_err();

        assert_eq!(err.error_code(), "EMBEDDING_ERROR");
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_empty_batch_skips_request() {
        let embedder = OpenAiEmbedder::new("k").with_base_url("http://127.0.0.1:9");
        assert!(embedder.embed_documents(&[]).await.unwrap().is_empty());
    }
}
