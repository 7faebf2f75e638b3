//! Cosine similarity and maximal marginal relevance selection.

/// Cosine similarity of two vectors of equal length.
///
/// Returns 0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Pick `k` candidate indices by maximal marginal relevance.
///
/// The `fetch_k` candidates most similar to `query` form the pool. The first
/// pick is the most similar one; every later pick maximizes
/// `lambda * sim(query, d) - (1 - lambda) * max(sim(d, s) for s in selected)`.
/// Ties go to the lower candidate index.
pub fn mmr_select(
    query: &[f32],
    candidates: &[Vec<f32>],
    k: usize,
    fetch_k: usize,
    lambda_mult: f32,
) -> Vec<usize> {
    if k == 0 || candidates.is_empty() {
        return Vec::new();
    }

    let relevance: Vec<f32> = candidates
        .iter()
        .map(|c| cosine_similarity(query, c))
        .collect();

    let mut pool: Vec<usize> = (0..candidates.len()).collect();
    pool.sort_by(|&a, &b| {
        relevance[b]
            .partial_cmp(&relevance[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    pool.truncate(fetch_k.max(1));

    let target = k.min(pool.len());
    let mut selected = Vec::with_capacity(target);
    selected.push(pool.remove(0));

    while selected.len() < target {
        let mut best: Option<(usize, f32)> = None;
        for (pos, &idx) in pool.iter().enumerate() {
            let redundancy = selected
                .iter()
                .map(|&s| cosine_similarity(&candidates[idx], &candidates[s]))
                .fold(f32::NEG_INFINITY, f32::max);
            let score = lambda_mult * relevance[idx] - (1.0 - lambda_mult) * redundancy;
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((pos, score));
            }
        }
        match best {
            Some((pos, _)) => selected.push(pool.remove(pos)),
            None => break,
        }
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_first_pick_is_most_similar() {
        let candidates = vec![vec![0.0, 1.0], vec![1.0, 0.1], vec![0.5, 0.5]];
        let picked = mmr_select(&[1.0, 0.0], &candidates, 1, 25, 0.6);
        assert_eq!(picked, vec![1]);
    }

    #[test]
    fn test_diversity_beats_near_duplicate() {
        let candidates = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.99, 0.01, 0.0],
            vec![0.6, 0.0, 0.8],
        ];
        let picked = mmr_select(&[1.0, 0.0, 0.3], &candidates, 2, 25, 0.5);
        assert_eq!(picked, vec![0, 2]);
    }

    #[test]
    fn test_lambda_one_is_plain_similarity_order() {
        let candidates = vec![vec![0.2, 1.0], vec![1.0, 0.0], vec![1.0, 0.3]];
        let picked = mmr_select(&[1.0, 0.0], &candidates, 3, 25, 1.0);
        assert_eq!(picked, vec![1, 2, 0]);
    }

    #[test]
    fn test_fetch_k_bounds_the_pool() {
        let candidates = vec![vec![1.0, 0.0], vec![0.9, 0.1], vec![0.0, 1.0]];
        let picked = mmr_select(&[1.0, 0.0], &candidates, 3, 2, 0.6);
        assert_eq!(picked.len(), 2);
        assert!(!picked.contains(&2));
    }

    #[test]
    fn test_empty_and_zero_k() {
        assert!(mmr_select(&[1.0], &[], 3, 25, 0.6).is_empty());
        assert!(mmr_select(&[1.0], &[vec![1.0]], 0, 25, 0.6).is_empty());
    }
}
