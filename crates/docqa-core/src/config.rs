//! Configuration types for docqa.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{RagError, Result};
use crate::traits::ChunkConfig;
use crate::types::MmrParams;

/// Main configuration for docqa.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocqaConfig {
    /// Vector store configuration.
    #[serde(default)]
    pub store: StoreConfig,

    /// Embedding backend configuration.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Cross-encoder reranker configuration.
    #[serde(default)]
    pub reranker: RerankerBackend,

    /// Retrieval budgets.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Chunking configuration.
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Language model configuration.
    #[serde(default)]
    pub generation: GenerationConfig,
}

/// Vector store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite index file.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Embedding configuration.
///
/// A section without a `provider` key selects the OpenAI backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "toml::Table")]
pub struct EmbeddingConfig {
    /// Which backend produces the vectors.
    #[serde(flatten)]
    pub backend: EmbeddingBackend,

    /// Batch size for document embedding.
    pub batch_size: usize,
}

#[derive(Deserialize)]
struct EmbeddingSection {
    #[serde(flatten)]
    backend: EmbeddingBackend,

    #[serde(default = "default_batch_size")]
    batch_size: usize,
}

impl TryFrom<toml::Table> for EmbeddingConfig {
    type Error = toml::de::Error;

    fn try_from(mut table: toml::Table) -> std::result::Result<Self, Self::Error> {
        table
            .entry("provider")
            .or_insert_with(|| toml::Value::String("openai".to_string()));
        let section: EmbeddingSection = toml::Value::Table(table).try_into()?;
        Ok(Self {
            backend: section.backend,
            batch_size: section.batch_size,
        })
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            batch_size: default_batch_size(),
        }
    }
}

/// Embedding backends, selected by the `provider` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Local ONNX sentence embedding model.
    Onnx {
        model_path: PathBuf,
        tokenizer_path: PathBuf,
        #[serde(default = "default_embedding_dim")]
        dimension: usize,
        #[serde(default = "default_num_threads")]
        num_threads: usize,
    },

    /// OpenAI-compatible `/embeddings` endpoint.
    OpenAi {
        #[serde(default = "default_embedding_model")]
        model: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        api_key_env: Option<String>,
        #[serde(default)]
        dimension: Option<usize>,
    },

    /// Deterministic feature-hashing embedder, needs no model files.
    Hashing {
        #[serde(default = "default_embedding_dim")]
        dimension: usize,
    },
}

impl Default for EmbeddingBackend {
    fn default() -> Self {
        Self::OpenAi {
            model: default_embedding_model(),
            base_url: None,
            api_key_env: None,
            dimension: None,
        }
    }
}

/// Cross-encoder backends, selected by the `backend` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "kebab-case")]
pub enum RerankerBackend {
    /// ONNX export of a cross-encoder such as ms-marco-MiniLM-L-6-v2.
    Onnx {
        #[serde(default = "default_reranker_model_path")]
        model_path: PathBuf,
        #[serde(default = "default_reranker_tokenizer_path")]
        tokenizer_path: PathBuf,
        #[serde(default = "default_reranker_max_length")]
        max_length: usize,
        #[serde(default = "default_num_threads")]
        num_threads: usize,
    },

    /// Query term overlap scorer, for offline setups without a model.
    TermOverlap,
}

impl Default for RerankerBackend {
    fn default() -> Self {
        Self::Onnx {
            model_path: default_reranker_model_path(),
            tokenizer_path: default_reranker_tokenizer_path(),
            max_length: default_reranker_max_length(),
            num_threads: default_num_threads(),
        }
    }
}

/// Candidate budgets for the retrieval pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Default number of results.
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Upper bound on semantic (MMR) candidates.
    #[serde(default = "default_mmr_k_cap")]
    pub mmr_k_cap: usize,

    /// Nearest-neighbour pool considered by MMR.
    #[serde(default = "default_fetch_k")]
    pub fetch_k: usize,

    /// MMR relevance/diversity trade-off.
    #[serde(default = "default_lambda_mult")]
    pub lambda_mult: f32,

    /// Minimum number of keyword candidates.
    #[serde(default = "default_lexical_floor")]
    pub lexical_floor: usize,

    /// Content prefix length (characters) used for candidate identity.
    #[serde(default = "default_identity_prefix_chars")]
    pub identity_prefix_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            mmr_k_cap: 6,
            fetch_k: 25,
            lambda_mult: 0.6,
            lexical_floor: 5,
            identity_prefix_chars: 60,
        }
    }
}

impl RetrievalConfig {
    /// MMR request for a query asking for `top_k` final results.
    pub fn mmr_params(&self, top_k: usize) -> MmrParams {
        MmrParams {
            k: top_k.min(self.mmr_k_cap),
            fetch_k: self.fetch_k,
            lambda_mult: self.lambda_mult,
        }
    }

    /// Number of keyword candidates for `top_k` final results.
    pub fn lexical_candidates(&self, top_k: usize) -> usize {
        top_k.max(self.lexical_floor)
    }
}

/// Chunking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlapping characters between consecutive chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 120,
        }
    }
}

impl ChunkingConfig {
    pub fn to_chunk_config(&self) -> ChunkConfig {
        ChunkConfig {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
        }
    }
}

/// Language model provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    #[default]
    OpenAi,
    Gemini,
    Ollama,
}

impl GenerationProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
        }
    }
}

impl std::fmt::Display for GenerationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationProvider {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            other => Err(RagError::config(format!(
                "Unsupported provider: {}. Use openai, gemini or ollama.",
                other
            ))),
        }
    }
}

/// Language model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub provider: GenerationProvider,

    /// Model name passed to the provider.
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Override the provider's base URL.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Environment variable holding the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: GenerationProvider::OpenAi,
            model: default_llm_model(),
            base_url: None,
            api_key_env: None,
            temperature: 0.2,
            max_tokens: 512,
        }
    }
}

// Default value functions

fn default_batch_size() -> usize {
    32
}

fn default_num_threads() -> usize {
    4
}

fn default_embedding_dim() -> usize {
    384
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_reranker_max_length() -> usize {
    512
}

fn default_top_k() -> usize {
    5
}

fn default_mmr_k_cap() -> usize {
    6
}

fn default_fetch_k() -> usize {
    25
}

fn default_lambda_mult() -> f32 {
    0.6
}

fn default_lexical_floor() -> usize {
    5
}

fn default_identity_prefix_chars() -> usize {
    crate::types::IDENTITY_PREFIX_CHARS
}

fn default_chunk_size() -> usize {
    800
}

fn default_chunk_overlap() -> usize {
    120
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    512
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docqa")
}

fn default_store_path() -> PathBuf {
    data_dir().join("index.db")
}

fn default_reranker_model_path() -> PathBuf {
    data_dir()
        .join("models")
        .join("ms-marco-MiniLM-L-6-v2")
        .join("model.onnx")
}

fn default_reranker_tokenizer_path() -> PathBuf {
    data_dir()
        .join("models")
        .join("ms-marco-MiniLM-L-6-v2")
        .join("tokenizer.json")
}

impl DocqaConfig {
    /// Load configuration from file.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| RagError::config(format!("Failed to parse config: {}", e)))
    }

    /// Load configuration from default paths.
    pub fn load_default() -> Result<Self> {
        // Try user config first
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("docqa").join("config.toml");
            if user_config.exists() {
                return Self::load(&user_config);
            }
        }

        let local_config = PathBuf::from("docqa.toml");
        if local_config.exists() {
            return Self::load(&local_config);
        }

        Ok(Self::default())
    }

    /// Apply `DOCQA_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("DOCQA_PROVIDER") {
            self.generation.provider = provider.parse()?;
        }
        if let Some(model) = lookup("DOCQA_LLM_MODEL") {
            self.generation.model = model;
        }
        if let Some(name) = lookup("DOCQA_EMBEDDING_MODEL") {
            if let EmbeddingBackend::OpenAi { model, .. } = &mut self.embedding.backend {
                *model = name;
            }
        }
        if let Some(path) = lookup("DOCQA_STORE_PATH") {
            self.store.path = PathBuf::from(path);
        }
        if let Some(size) = lookup("DOCQA_CHUNK_SIZE") {
            self.chunking.chunk_size = parse_usize("DOCQA_CHUNK_SIZE", &size)?;
        }
        if let Some(overlap) = lookup("DOCQA_CHUNK_OVERLAP") {
            self.chunking.chunk_overlap = parse_usize("DOCQA_CHUNK_OVERLAP", &overlap)?;
        }
        Ok(())
    }
}

fn parse_usize(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|e| RagError::config(format!("{} must be a non-negative integer: {}", key, e)))
}
