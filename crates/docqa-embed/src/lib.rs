//! docqa-embed - embedding models and cross-encoders
//!
//! Document and query embeddings come from one of:
//!
//! - a local ONNX sentence-embedding model (mean pooling, L2 normalization)
//! - an OpenAI-compatible `/embeddings` endpoint
//! - a deterministic feature-hashing embedder that needs no model files
//!
//! Reranking uses an ONNX cross-encoder such as ms-marco-MiniLM-L-6-v2,
//! loaded lazily on first use and shared by every request afterwards, or a
//! term-overlap scorer for offline setups.

mod cross_encoder;
mod factory;
mod hashing;
mod lazy;
mod onnx;
mod openai;

pub use cross_encoder::{OnnxCrossEncoder, TermOverlapScorer};
pub use factory::{build_cross_encoder, build_embedder};
pub use hashing::HashEmbedder;
pub use lazy::LazyCrossEncoder;
pub use onnx::OnnxEmbedder;
pub use openai::OpenAiEmbedder;

// Re-export the model traits for convenience
pub use docqa_core::{CrossEncoder, Embedder};
