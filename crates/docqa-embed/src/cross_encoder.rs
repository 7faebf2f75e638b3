//! Cross-encoder scorers for reranking.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use ort::session::Session;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

use docqa_core::{CrossEncoder, RagError, Result};

use crate::onnx::{batch_inputs, build_session, load_tokenizer, model_name_from_path};

/// ONNX cross-encoder, e.g. ms-marco-MiniLM-L-6-v2.
///
/// Each (query, passage) pair is encoded jointly and the model's relevance
/// logit is the score. Scores are unbounded and only meaningful relative to
/// each other.
pub struct OnnxCrossEncoder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    max_length: usize,
    model_name: String,
}

impl OnnxCrossEncoder {
    /// Load a cross-encoder from model and tokenizer paths.
    pub fn new(
        model_path: impl AsRef<Path>,
        tokenizer_path: impl AsRef<Path>,
        max_length: usize,
        num_threads: usize,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model_name = model_name_from_path(model_path);

        let session = build_session(model_path, num_threads, &model_name)?;
        let mut tokenizer = load_tokenizer(tokenizer_path.as_ref(), &model_name)?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| RagError::model_load(&model_name, format!("truncation: {}", e)))?;

        info!("Cross-encoder {} loaded: max_length={}", model_name, max_length);

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            max_length,
            model_name,
        })
    }

    fn score_pairs(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }

        let pairs: Vec<(&str, &str)> = passages.iter().map(|p| (query, *p)).collect();
        let encodings = self
            .tokenizer
            .encode_batch(pairs, true)
            .map_err(|e| RagError::rerank(format!("Tokenization failed: {}", e)))?;

        let batch_size = encodings.len();
        let inputs = batch_inputs(&encodings, self.max_length, RagError::rerank)?;

        debug!("Scoring {} pairs, max_len={}", batch_size, inputs.max_len);

        let mut session = self
            .session
            .lock()
            .map_err(|e| RagError::rerank(format!("Failed to lock session: {}", e)))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => inputs.input_ids,
                "attention_mask" => inputs.attention_mask,
                "token_type_ids" => inputs.token_type_ids
            ])
            .map_err(|e| RagError::rerank(format!("Inference failed: {}", e)))?;

        let (_, output) = outputs
            .iter()
            .next()
            .ok_or_else(|| RagError::rerank("No output tensor found"))?;

        let view = output
            .try_extract_array::<f32>()
            .map_err(|e| RagError::rerank(format!("Failed to extract logits: {}", e)))?;

        let dims: Vec<usize> = view.shape().to_vec();
        match dims.as_slice() {
            [n] if *n == batch_size => Ok((0..batch_size).map(|i| view[[i]]).collect()),
            // Single relevance logit, or the positive class of a two-way head
            [n, labels] if *n == batch_size && *labels >= 1 => {
                Ok((0..batch_size).map(|i| view[[i, labels - 1]]).collect())
            }
            _ => Err(RagError::rerank(format!(
                "Unexpected logits shape: {:?}",
                dims
            ))),
        }
    }
}

#[async_trait]
impl CrossEncoder for OnnxCrossEncoder {
    async fn score(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>> {
        self.score_pairs(query, passages)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Scores a passage by the share of distinct query terms it contains.
///
/// Terms are lowercased alphanumeric runs. Needs no model files, so it backs
/// offline setups and tests.
#[derive(Debug, Default, Clone)]
pub struct TermOverlapScorer;

impl TermOverlapScorer {
    pub fn new() -> Self {
        Self
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

#[async_trait]
impl CrossEncoder for TermOverlapScorer {
    async fn score(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>> {
        let query_terms = terms(query);
        if query_terms.is_empty() {
            return Ok(vec![0.0; passages.len()]);
        }

        Ok(passages
            .iter()
            .map(|p| {
                let passage_terms = terms(p);
                let shared = query_terms.intersection(&passage_terms).count();
                shared as f32 / query_terms.len() as f32
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        "term-overlap"
    }
}
