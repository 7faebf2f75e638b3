//! Retrieval orchestrator for hybrid search.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use docqa_core::{Chunk, Result, RetrievalConfig, RetrievalResult, VectorIndex};

use crate::fusion::fuse_with_prefix;
use crate::lexical::LexicalIndex;
use crate::normalize::normalize_scores;
use crate::rerank::Reranker;

/// Hybrid retrieval pipeline.
///
/// Runs MMR vector search and BM25 keyword search over the full corpus, fuses
/// the two candidate sets, reranks the pool with a cross-encoder and returns
/// the best `top_k` chunks with scores normalized to `[0, 1]`.
pub struct Retriever {
    /// Vector index (read only).
    index: Arc<dyn VectorIndex>,

    /// Cross-encoder reranker.
    reranker: Reranker,

    /// Candidate budgets.
    config: RetrievalConfig,
}

impl Retriever {
    /// Create a retriever with default candidate budgets.
    pub fn new(index: Arc<dyn VectorIndex>, reranker: Reranker) -> Self {
        Self {
            index,
            reranker,
            config: RetrievalConfig::default(),
        }
    }

    /// Replace the candidate budgets.
    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Retrieve the `top_k` passages most relevant to `query`.
    ///
    /// `top_k == 0` returns an empty result without touching the index. An
    /// empty corpus also yields an empty result. Any collaborator failure is
    /// returned unchanged.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<RetrievalResult> {
        let start = Instant::now();

        if top_k == 0 {
            debug!("top_k is 0, skipping retrieval");
            return Ok(RetrievalResult::empty(query));
        }

        info!("Retrieving top {} for: {:?}", top_k, query);

        let mmr = self.config.mmr_params(top_k);
        let keyword_k = self.config.lexical_candidates(top_k);

        let (vector_results, keyword_results) = tokio::join!(
            self.index.mmr_search(query, mmr),
            self.keyword_candidates(query, keyword_k)
        );
        let vector_results = vector_results?;
        let keyword_results = keyword_results?;

        debug!(
            "Vector search returned {} candidates, keyword search returned {}",
            vector_results.len(),
            keyword_results.len()
        );

        let pool = fuse_with_prefix(
            vector_results,
            keyword_results,
            self.config.identity_prefix_chars,
        );

        debug!("Fused to {} unique candidates", pool.len());

        let ranked = self.reranker.rerank(query, pool, top_k).await?;
        let hits = normalize_scores(ranked);

        let latency_ms = start.elapsed().as_millis() as u64;

        info!(
            "Retrieval completed in {}ms, returned {} results",
            latency_ms,
            hits.len()
        );

        Ok(RetrievalResult {
            query: query.to_string(),
            hits,
            latency_ms,
        })
    }

    /// Top keyword matches over a fresh snapshot of the whole corpus.
    async fn keyword_candidates(&self, query: &str, n: usize) -> Result<Vec<Chunk>> {
        let corpus = self.index.snapshot().await?;
        if corpus.is_empty() {
            return Ok(Vec::new());
        }

        let lexical = LexicalIndex::build(&corpus);
        let top = lexical.top_n(query, n);

        let mut slots: Vec<Option<Chunk>> = corpus.into_iter().map(Some).collect();
        Ok(top
            .into_iter()
            .filter_map(|(i, _)| slots[i].take())
            .collect())
    }
}
