//! BM25 keyword index over the chunk corpus.
//!
//! Tokenization is plain whitespace splitting with case preserved, so exact
//! literal terms (error codes, identifiers, product names) survive intact.

use bm25::{Embedder, EmbedderBuilder, Scorer, Tokenizer};
use docqa_core::Chunk;

/// BM25 tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    /// Term frequency saturation.
    pub k1: f32,

    /// Document length normalization.
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

/// Whitespace tokenizer: no stemming, no stopwords, no case folding.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, input_text: &str) -> Vec<String> {
        input_text.split_whitespace().map(str::to_string).collect()
    }
}

/// In-memory BM25 index built over a corpus snapshot.
///
/// Positions returned by [`LexicalIndex::score`] are indexes into the corpus
/// slice the index was built from.
pub struct LexicalIndex {
    /// `None` when the corpus holds no tokens at all.
    embedder: Option<Embedder<u32, WhitespaceTokenizer>>,

    scorer: Scorer<usize, u32>,

    len: usize,
}

impl LexicalIndex {
    /// Build an index over the chunk contents with default parameters.
    pub fn build(corpus: &[Chunk]) -> Self {
        Self::build_with_params(corpus, Bm25Params::default())
    }

    /// Build an index with custom BM25 parameters.
    pub fn build_with_params(corpus: &[Chunk], params: Bm25Params) -> Self {
        let tokenizer = WhitespaceTokenizer;
        let total_tokens: usize = corpus
            .iter()
            .map(|c| tokenizer.tokenize(&c.content).len())
            .sum();

        let mut scorer = Scorer::<usize, u32>::new();
        if total_tokens == 0 {
            return Self {
                embedder: None,
                scorer,
                len: corpus.len(),
            };
        }

        let avgdl = total_tokens as f32 / corpus.len() as f32;
        let embedder = EmbedderBuilder::<u32, WhitespaceTokenizer>::with_avgdl(avgdl)
            .k1(params.k1)
            .b(params.b)
            .build();

        for (i, chunk) in corpus.iter().enumerate() {
            scorer.upsert(&i, embedder.embed(&chunk.content));
        }

        Self {
            embedder: Some(embedder),
            scorer,
            len: corpus.len(),
        }
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// BM25 score of every document for `query`, in corpus order.
    pub fn score(&self, query: &str) -> Vec<(usize, f32)> {
        let Some(embedder) = &self.embedder else {
            return (0..self.len).map(|i| (i, 0.0)).collect();
        };

        let query_embedding = embedder.embed(query);
        (0..self.len)
            .map(|i| {
                let score = self.scorer.score(&i, &query_embedding).unwrap_or(0.0);
                (i, score)
            })
            .collect()
    }

    /// The `n` best documents by score, ties broken by corpus position.
    pub fn top_n(&self, query: &str, n: usize) -> Vec<(usize, f32)> {
        let mut scored = self.score(query);
        scored.sort_by(|a, b| docqa_core::cmp_score_desc(a.1, b.1).then(a.0.cmp(&b.0)));
        scored.truncate(n);
        scored
    }
}
