//! Min-max normalization of reranked scores.

use docqa_core::{ScoredCandidate, ScoredChunk};

/// Lower bound on the score range used as the normalization divisor.
pub const SCORE_RANGE_EPSILON: f32 = 1e-6;

/// Map raw rerank scores onto `[0, 1]` with `(raw - min) / max(eps, max - min)`.
///
/// When every candidate has the same raw score the range collapses, the
/// numerator is 0 for all of them, and every normalized score is 0. Equal raw
/// scores therefore come out as "no relative evidence" rather than 1.
///
/// Input order is preserved; for input sorted by descending raw score the
/// output scores are non-increasing.
pub fn normalize_scores(ranked: Vec<ScoredCandidate>) -> Vec<ScoredChunk> {
    if ranked.is_empty() {
        return Vec::new();
    }

    let (min, max) = ranked
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), c| {
            (lo.min(c.score), hi.max(c.score))
        });
    let range = (max - min).max(SCORE_RANGE_EPSILON);

    ranked
        .into_iter()
        .map(|c| ScoredChunk {
            score: ((c.score - min) / range).clamp(0.0, 1.0),
            chunk: c.chunk,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::{Chunk, ChunkMetadata, Signal};

    fn ranked(scores: &[f32]) -> Vec<ScoredCandidate> {
        scores
            .iter()
            .enumerate()
            .map(|(i, s)| {
                ScoredCandidate::new(
                    Chunk::new(format!("chunk {}", i), ChunkMetadata::new("a.txt")),
                    *s,
                    Signal::Rerank,
                )
            })
            .collect()
    }

    #[test]
    fn test_min_max_scaling() {
        let hits = normalize_scores(ranked(&[8.5, 2.0, -4.5]));
        let scores: Vec<f32> = hits.iter().map(|h| h.score).collect();
        assert_eq!(scores[0], 1.0);
        assert!((scores[1] - 0.5).abs() < 1e-6);
        assert_eq!(scores[2], 0.0);
    }

    #[test]
    fn test_identical_scores_normalize_to_zero() {
        let hits = normalize_scores(ranked(&[3.25, 3.25, 3.25]));
        assert!(hits.iter().all(|h| h.score == 0.0));
    }

    #[test]
    fn test_single_hit_is_zero() {
        let hits = normalize_scores(ranked(&[-7.0]));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].score, 0.0);
    }

    #[test]
    fn test_tiny_range_stays_in_bounds() {
        let hits = normalize_scores(ranked(&[1.0 + 5e-7, 1.0]));
        assert!(hits.iter().all(|h| (0.0..=1.0).contains(&h.score)));
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn test_empty() {
        assert!(normalize_scores(Vec::new()).is_empty());
    }
}
