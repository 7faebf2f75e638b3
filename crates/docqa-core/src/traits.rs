//! Core traits defining the interfaces between components.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Chunk, GenerationOptions, MmrParams, SourceSummary};

/// Read side of the vector index collaborator.
///
/// The retrieval pipeline only ever holds this trait, never [`IndexWriter`].
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Maximal-marginal-relevance search for `query`.
    async fn mmr_search(&self, query: &str, params: MmrParams) -> Result<Vec<Chunk>>;

    /// Point-in-time read of every stored chunk.
    async fn snapshot(&self) -> Result<Vec<Chunk>>;

    /// Number of stored chunks.
    async fn count(&self) -> Result<u64>;

    /// Chunk counts grouped by source.
    async fn sources(&self) -> Result<Vec<SourceSummary>>;
}

/// Write side of the vector index, used by ingestion only.
#[async_trait]
pub trait IndexWriter: Send + Sync {
    /// Embed and store chunks. Returns the number of chunks written.
    async fn add_chunks(&self, chunks: &[Chunk]) -> Result<usize>;
}

/// Embedding model trait.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of document texts.
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query text.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;

    /// Model identifier, used to name the index collection.
    fn model_name(&self) -> &str;
}

/// Joint (query, passage) relevance model.
///
/// Implementations must score each pair independently so that the score of a
/// passage does not depend on the other passages in the batch or their order.
#[async_trait]
pub trait CrossEncoder: Send + Sync {
    /// Score every passage against `query`, one score per passage in order.
    async fn score(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>>;

    /// Model identifier.
    fn model_name(&self) -> &str;
}

/// Language model that turns a grounding prompt into an answer.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str, options: GenerationOptions) -> Result<String>;

    /// Model identifier reported in responses.
    fn model_name(&self) -> &str;

    /// Provider identifier reported in responses.
    fn provider(&self) -> &str;
}

/// Chunking configuration, in characters.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Maximum characters per chunk.
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 120,
        }
    }
}

/// Chunking strategy trait.
pub trait Chunker: Send + Sync {
    /// Split text content into pieces.
    fn chunk(&self, content: &str, config: &ChunkConfig) -> Result<Vec<ChunkData>>;
}

/// Raw chunk data before metadata is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkData {
    /// Chunk text content.
    pub content: String,

    /// Start line (1-based).
    pub start_line: u32,

    /// End line (1-based, inclusive).
    pub end_line: u32,
}
