//! Request and response types at the service boundary.

use serde::{Deserialize, Serialize};

use docqa_core::{DocqaConfig, GenerationOptions, RagError, Result, SourceSummary};

/// Name reported for the vector index backend.
pub const RETRIEVAL_ENGINE: &str = "sqlite";

/// Question answering request.
///
/// Unset knobs fall back to the service configuration
/// (`retrieval.default_top_k`, `generation.temperature`, `generation.max_tokens`).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AskRequest {
    /// The question, must not be blank.
    pub question: String,

    /// Number of passages handed to the model.
    #[serde(default)]
    pub top_k: Option<usize>,

    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// An [`AskRequest`] with every knob filled in and checked.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedAsk {
    pub question: String,
    pub top_k: usize,
    pub options: GenerationOptions,
}

impl AskRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Fill unset knobs from `config` and validate the result.
    pub(crate) fn resolve(self, config: &DocqaConfig) -> Result<ResolvedAsk> {
        let top_k = self.top_k.unwrap_or(config.retrieval.default_top_k);
        let temperature = self.temperature.unwrap_or(config.generation.temperature);
        let max_tokens = self.max_tokens.unwrap_or(config.generation.max_tokens);

        validate_query(&self.question, top_k)?;
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(RagError::invalid_argument(format!(
                "temperature must be a non-negative number, got {}",
                temperature
            )));
        }
        if max_tokens == 0 {
            return Err(RagError::invalid_argument("max_tokens must be positive"));
        }

        Ok(ResolvedAsk {
            question: self.question,
            top_k,
            options: GenerationOptions {
                temperature,
                max_tokens,
            },
        })
    }
}

pub(crate) fn validate_query(text: &str, top_k: usize) -> Result<()> {
    if text.trim().is_empty() {
        return Err(RagError::invalid_argument("question must not be empty"));
    }
    if top_k == 0 {
        return Err(RagError::invalid_argument("top_k must be at least 1"));
    }
    Ok(())
}

/// Grounded answer with the sources it was built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub question: String,

    /// De-duplicated source labels in relevance order.
    pub context_sources: Vec<String>,

    pub answer: String,

    pub metadata: AskMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskMetadata {
    pub model: String,
    pub retrieval_engine: String,

    /// Unix time in milliseconds when the answer was produced.
    pub timestamp_ms: u64,

    /// Time spent on retrieval and generation.
    pub latency_ms: u64,
    pub top_k: usize,

    /// Mean normalized retrieval score, rounded to 3 decimals.
    pub avg_similarity: f64,
    pub provider: String,
}

/// Retrieval-only request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchRequest {
    pub query: String,

    /// Falls back to `retrieval.default_top_k`.
    #[serde(default)]
    pub top_k: Option<usize>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, top_k: usize) -> Self {
        Self {
            query: query.into(),
            top_k: Some(top_k),
        }
    }

    /// Request that uses the configured default result count.
    pub fn with_default_top_k(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: None,
        }
    }

    pub(crate) fn resolve_top_k(&self, config: &DocqaConfig) -> Result<usize> {
        let top_k = self.top_k.unwrap_or(config.retrieval.default_top_k);
        validate_query(&self.query, top_k)?;
        Ok(top_k)
    }
}

/// One retrieved passage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub rank: usize,
    pub source: String,
    pub score: f32,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub hits: Vec<SearchHit>,
    pub latency_ms: u64,
}

/// An uploaded document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestFile {
    pub filename: String,
    pub text: String,
}

/// Per-request chunking overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IngestOptions {
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestPayload {
    pub files: Vec<IngestFile>,

    #[serde(default)]
    pub options: Option<IngestOptions>,
}

/// Outcome of an ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub status: String,

    /// Chunks produced per file, in input order.
    pub indexed_files: Vec<SourceSummary>,
    pub vector_store: String,

    /// Chunks produced across all files.
    pub total_chunks: u64,

    /// Chunks actually written; re-ingested content is skipped.
    pub new_chunks: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesReport {
    pub documents: Vec<SourceSummary>,
    pub vector_store: String,
    pub total_chunks: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub vector_index_ready: bool,
    pub provider: String,
    pub model: String,
}
