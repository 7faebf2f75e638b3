//! docqa-query - Hybrid retrieval and reranking pipeline
//!
//! This crate selects the small set of passages most likely to support an
//! accurate answer to a question.
//!
//! # Pipeline
//!
//! - MMR vector search through the [`docqa_core::VectorIndex`] collaborator
//! - BM25 keyword search over a fresh snapshot of the whole corpus
//! - Union of both candidate sets, deduplicated by chunk identity
//! - Cross-encoder reranking and truncation to `top_k`
//! - Min-max normalization of the final scores to `[0, 1]`
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_query::{Reranker, Retriever};
//! use std::sync::Arc;
//!
//! let retriever = Retriever::new(Arc::new(store), Reranker::new(Arc::new(scorer)));
//! let result = retriever.retrieve("refund policy", 5).await?;
//! ```

mod engine;
mod fusion;
mod lexical;
mod normalize;
mod rerank;

pub use engine::Retriever;
pub use fusion::{fuse, fuse_with_prefix};
pub use lexical::{Bm25Params, LexicalIndex, WhitespaceTokenizer};
pub use normalize::{normalize_scores, SCORE_RANGE_EPSILON};
pub use rerank::Reranker;

// Re-export for convenience
pub use docqa_core::{RetrievalResult, ScoredChunk};
