//! Candidate fusion: set union of retrieval signals with identity dedup.

use std::collections::HashSet;

use docqa_core::{Chunk, ChunkIdentity, IDENTITY_PREFIX_CHARS};

/// Merge vector and lexical candidates into one deduplicated pool.
///
/// Vector candidates come first, then lexical ones. A chunk is kept only the
/// first time its identity (source, locator, content prefix) is seen, so the
/// output preserves first-seen order. No scores are consulted here.
pub fn fuse(vector: Vec<Chunk>, lexical: Vec<Chunk>) -> Vec<Chunk> {
    fuse_with_prefix(vector, lexical, IDENTITY_PREFIX_CHARS)
}

/// [`fuse`] with a custom identity prefix length.
pub fn fuse_with_prefix(
    vector: Vec<Chunk>,
    lexical: Vec<Chunk>,
    prefix_chars: usize,
) -> Vec<Chunk> {
    let capacity = vector.len() + lexical.len();
    let mut seen: HashSet<ChunkIdentity> = HashSet::with_capacity(capacity);
    let mut pool = Vec::with_capacity(capacity);

    for chunk in vector.into_iter().chain(lexical) {
        if seen.insert(chunk.identity_with_prefix(prefix_chars)) {
            pool.push(chunk);
        }
    }

    pool
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::ChunkMetadata;

    fn chunk(source: &str, lines: (u32, u32), content: &str) -> Chunk {
        Chunk::new(content, ChunkMetadata::new(source).with_lines(lines.0, lines.1))
    }

    #[test]
    fn test_vector_first_then_lexical() {
        let vector = vec![
            chunk("a.txt", (1, 5), "alpha"),
            chunk("a.txt", (6, 9), "beta"),
        ];
        let lexical = vec![
            chunk("b.txt", (1, 2), "gamma"),
            chunk("a.txt", (1, 5), "alpha"),
        ];

        let pool = fuse(vector, lexical);

        let contents: Vec<_> = pool.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_fusing_list_with_itself_is_idempotent() {
        let list = vec![
            chunk("manual.txt", (1, 10), "Refunds are issued within 14 days."),
            chunk("manual.txt", (11, 20), "Shipping takes 3-5 business days."),
            chunk("faq.md", (1, 4), "How do I reset my password?"),
        ];

        let pool = fuse(list.clone(), list.clone());
        assert_eq!(pool, list);
    }

    #[test]
    fn test_union_size_without_shared_identities() {
        let vector = vec![
            chunk("a.txt", (1, 1), "one"),
            chunk("a.txt", (2, 2), "two"),
        ];
        let lexical = vec![
            chunk("b.txt", (1, 1), "one"),
            chunk("a.txt", (3, 3), "three"),
        ];
        assert_eq!(fuse(vector, lexical).len(), 4);
    }

    #[test]
    fn test_shared_prefix_merges_candidates() {
        let header = "ACME Corp confidential. Do not distribute outside the team. ";
        assert_eq!(header.chars().count(), IDENTITY_PREFIX_CHARS);

        let a = Chunk::new(format!("{}Refund rules", header), ChunkMetadata::new("policy.md"));
        let b = Chunk::new(format!("{}Shipping rules", header), ChunkMetadata::new("policy.md"));

        let pool = fuse(vec![a.clone()], vec![b]);
        assert_eq!(pool, vec![a]);
    }

    #[test]
    fn test_custom_prefix_length() {
        let a = chunk("a.txt", (1, 1), "same start, different end");
        let b = chunk("a.txt", (1, 1), "same start, another end");

        assert_eq!(fuse_with_prefix(vec![a.clone()], vec![b.clone()], 10).len(), 1);
        assert_eq!(fuse_with_prefix(vec![a], vec![b], 60).len(), 2);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(fuse(Vec::new(), Vec::new()).is_empty());
    }
}
