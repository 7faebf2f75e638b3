//! Cross-encoder reranking of the fused candidate pool.

use std::sync::Arc;

use tracing::debug;

use docqa_core::{cmp_score_desc, Chunk, CrossEncoder, RagError, Result, ScoredCandidate, Signal};

/// Scores candidates jointly with the query and keeps the best `top_k`.
///
/// The scorer is shared: one instance is built at startup and handed to every
/// retriever that needs it.
#[derive(Clone)]
pub struct Reranker {
    scorer: Arc<dyn CrossEncoder>,
}

impl Reranker {
    /// Create a reranker around a scoring model.
    pub fn new(scorer: Arc<dyn CrossEncoder>) -> Self {
        Self { scorer }
    }

    /// Name of the underlying model.
    pub fn model_name(&self) -> &str {
        self.scorer.model_name()
    }

    /// Rank `candidates` by raw cross-encoder score, descending, truncated to
    /// `top_k`.
    ///
    /// Equal scores are ordered by chunk identity, so the ranking does not
    /// depend on the order candidates were supplied in. An empty pool returns
    /// immediately without invoking the model.
    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<Chunk>,
        top_k: usize,
    ) -> Result<Vec<ScoredCandidate>> {
        if candidates.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let passages: Vec<&str> = candidates.iter().map(|c| c.content.as_str()).collect();
        let scores = self.scorer.score(query, &passages).await?;

        if scores.len() != candidates.len() {
            return Err(RagError::rerank(format!(
                "{} returned {} scores for {} candidates",
                self.scorer.model_name(),
                scores.len(),
                candidates.len()
            )));
        }
        if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
            return Err(RagError::rerank(format!(
                "{} produced a non-finite score: {}",
                self.scorer.model_name(),
                bad
            )));
        }

        let mut ranked: Vec<ScoredCandidate> = candidates
            .into_iter()
            .zip(scores)
            .map(|(chunk, score)| ScoredCandidate::new(chunk, score, Signal::Rerank))
            .collect();

        ranked.sort_by(|a, b| {
            cmp_score_desc(a.score, b.score)
                .then_with(|| a.chunk.identity().cmp(&b.chunk.identity()))
                .then_with(|| a.chunk.content.cmp(&b.chunk.content))
        });
        ranked.truncate(top_k);

        debug!(
            "Reranked with {}: kept {} candidates",
            self.scorer.model_name(),
            ranked.len()
        );

        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use docqa_core::ChunkMetadata;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts shared query words, scaled by passage length.
    struct OverlapScorer {
        calls: AtomicUsize,
    }

    impl OverlapScorer {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CrossEncoder for OverlapScorer {
        async fn score(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(passages
                .iter()
                .map(|p| {
                    let hits = query.split_whitespace().filter(|w| p.contains(*w)).count();
                    hits as f32 - p.len() as f32 / 1000.0
                })
                .collect())
        }

        fn model_name(&self) -> &str {
            "overlap"
        }
    }

    /// Returns one score too few.
    struct ShortScorer;

    #[async_trait]
    impl CrossEncoder for ShortScorer {
        async fn score(&self, _query: &str, passages: &[&str]) -> Result<Vec<f32>> {
            Ok(vec![0.5; passages.len().saturating_sub(1)])
        }

        fn model_name(&self) -> &str {
            "short"
        }
    }

    /// Gives every passage the same score.
    struct FlatScorer;

    #[async_trait]
    impl CrossEncoder for FlatScorer {
        async fn score(&self, _query: &str, passages: &[&str]) -> Result<Vec<f32>> {
            Ok(vec![1.0; passages.len()])
        }

        fn model_name(&self) -> &str {
            "flat"
        }
    }

    fn candidates() -> Vec<Chunk> {
        vec![
            Chunk::new("shipping takes five days", ChunkMetadata::new("faq.md")),
            Chunk::new("our refund policy is generous", ChunkMetadata::new("manual.txt")),
            Chunk::new("refund requests need a receipt", ChunkMetadata::new("faq.md")),
            Chunk::new("contact support by email", ChunkMetadata::new("faq.md")),
        ]
    }

    #[tokio::test]
    async fn test_rerank_sorts_and_truncates() {
        let reranker = Reranker::new(Arc::new(OverlapScorer::new()));
        let ranked = reranker
            .rerank("refund policy", candidates(), 2)
            .await
            .unwrap();

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].chunk.content, "our refund policy is generous");
        assert_eq!(ranked[1].chunk.content, "refund requests need a receipt");
        assert!(ranked[0].score >= ranked[1].score);
        assert!(ranked.iter().all(|c| c.signal == Signal::Rerank));
    }

    #[tokio::test]
    async fn test_rerank_is_order_independent() {
        let reranker = Reranker::new(Arc::new(OverlapScorer::new()));

        let forward = reranker
            .rerank("refund policy", candidates(), 10)
            .await
            .unwrap();

        let mut reversed_input = candidates();
        reversed_input.reverse();
        let reversed = reranker
            .rerank("refund policy", reversed_input, 10)
            .await
            .unwrap();

        assert_eq!(forward, reversed);
    }

    #[tokio::test]
    async fn test_ties_are_order_independent() {
        let reranker = Reranker::new(Arc::new(FlatScorer));

        let forward = reranker.rerank("q", candidates(), 3).await.unwrap();
        let mut rotated = candidates();
        rotated.rotate_left(2);
        let other = reranker.rerank("q", rotated, 3).await.unwrap();

        assert_eq!(forward, other);
    }

    #[tokio::test]
    async fn test_empty_pool_skips_model() {
        let scorer = Arc::new(OverlapScorer::new());
        let reranker = Reranker::new(scorer.clone());

        let ranked = reranker.rerank("refund", Vec::new(), 5).await.unwrap();

        assert!(ranked.is_empty());
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_score_count_mismatch_is_error() {
        let reranker = Reranker::new(Arc::new(ShortScorer));
        let err = reranker.rerank("q", candidates(), 3).await.unwrap_err();
        assert_eq!(err.error_code(), "RERANK_ERROR");
    }

    #[tokio::test]
    async fn test_nan_score_is_error() {
        struct NanScorer;

        #[async_trait]
        impl CrossEncoder for NanScorer {
            async fn score(&self, _query: &str, passages: &[&str]) -> Result<Vec<f32>> {
                Ok(vec![f32::NAN; passages.len()])
            }

            fn model_name(&self) -> &str {
                "nan"
            }
        }

        let reranker = Reranker::new(Arc::new(NanScorer));
        let err = reranker.rerank("q", candidates(), 3).await.unwrap_err();
        assert!(err.to_string().contains("non-finite"));
    }
}
