//! Core domain types for the retrieval pipeline.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Number of leading content characters that take part in chunk identity.
pub const IDENTITY_PREFIX_CHARS: usize = 60;

/// Source label used when a chunk carries no `source` metadata.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Metadata attached to a chunk at ingestion time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Source identifier (usually the file name).
    #[serde(default = "default_source")]
    pub source: String,

    /// Page number for paginated sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// First line covered by the chunk (1-based).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_start: Option<u32>,

    /// Last line covered by the chunk (1-based, inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_end: Option<u32>,

    /// Any other keys supplied by the ingestion side.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_source() -> String {
    UNKNOWN_SOURCE.to_string()
}

impl ChunkMetadata {
    /// Metadata with only a source.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            page: None,
            line_start: None,
            line_end: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Set the page number.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Set the line range.
    pub fn with_lines(mut self, start: u32, end: u32) -> Self {
        self.line_start = Some(start);
        self.line_end = Some(end);
        self
    }

    /// Where inside the source this chunk sits.
    pub fn locator(&self) -> Locator {
        match (self.page, self.line_start, self.line_end) {
            (Some(page), _, _) => Locator::Page(page),
            (None, Some(start), Some(end)) => Locator::Lines(start, end),
            _ => Locator::Unspecified,
        }
    }
}

/// Position of a chunk inside its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Locator {
    Page(u32),
    Lines(u32, u32),
    Unspecified,
}

/// An immutable unit of indexed text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text content.
    pub content: String,

    /// Source metadata.
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Create a new chunk.
    pub fn new(content: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }

    /// Identity used for candidate deduplication.
    pub fn identity(&self) -> ChunkIdentity {
        self.identity_with_prefix(IDENTITY_PREFIX_CHARS)
    }

    /// Identity using a custom content prefix length (in characters).
    pub fn identity_with_prefix(&self, prefix_chars: usize) -> ChunkIdentity {
        ChunkIdentity {
            source: self.metadata.source.clone(),
            locator: self.metadata.locator(),
            prefix: self.content.chars().take(prefix_chars).collect(),
        }
    }

    /// Human readable reference, e.g. `manual.txt: lines 1–10`.
    pub fn source_label(&self) -> String {
        let source = &self.metadata.source;
        match self.metadata.locator() {
            Locator::Page(page) => format!("{}: page {}", source, page),
            Locator::Lines(start, end) => format!("{}: lines {}–{}", source, start, end),
            Locator::Unspecified => source.clone(),
        }
    }
}

/// Tuple identifying a chunk regardless of which retrieval path produced it.
///
/// Two chunks with the same source, locator and content prefix are treated as
/// the same candidate even if their full contents differ past the prefix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkIdentity {
    pub source: String,
    pub locator: Locator,
    pub prefix: String,
}

/// The retrieval signal a score came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Vector,
    Lexical,
    Rerank,
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Vector => "vector",
            Self::Lexical => "lexical",
            Self::Rerank => "rerank",
        };
        write!(f, "{}", s)
    }
}

/// A chunk paired with a raw score from one signal.
///
/// Scores from different signals are not comparable with each other.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub chunk: Chunk,
    pub score: f32,
    pub signal: Signal,
}

impl ScoredCandidate {
    pub fn new(chunk: Chunk, score: f32, signal: Signal) -> Self {
        Self {
            chunk,
            score,
            signal,
        }
    }
}

/// A chunk with its final normalized score in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Final output of the retrieval pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// The original query.
    pub query: String,

    /// Hits sorted by non-increasing score.
    pub hits: Vec<ScoredChunk>,

    /// Retrieval latency in milliseconds.
    pub latency_ms: u64,
}

impl RetrievalResult {
    /// An empty result for `query`.
    pub fn empty(query: &str) -> Self {
        Self {
            query: query.to_string(),
            hits: Vec::new(),
            latency_ms: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoredChunk> {
        self.hits.iter()
    }

    /// Scores in result order.
    pub fn scores(&self) -> Vec<f32> {
        self.hits.iter().map(|h| h.score).collect()
    }

    /// Mean normalized score, 0 for an empty result.
    pub fn average_score(&self) -> f32 {
        if self.hits.is_empty() {
            return 0.0;
        }
        self.hits.iter().map(|h| h.score).sum::<f32>() / self.hits.len() as f32
    }

    /// De-duplicated source labels in hit order.
    pub fn context_sources(&self) -> Vec<String> {
        let mut labels: Vec<String> = Vec::with_capacity(self.hits.len());
        for hit in &self.hits {
            let label = hit.chunk.source_label();
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
        labels
    }
}

/// Parameters for a maximal-marginal-relevance search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MmrParams {
    /// Number of results to select.
    pub k: usize,

    /// Size of the nearest-neighbour pool MMR selects from.
    pub fetch_k: usize,

    /// Relevance/diversity trade-off (0 = max diversity, 1 = max relevance).
    pub lambda_mult: f32,
}

/// Per-source chunk count in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub filename: String,
    pub chunks: u64,
}

/// Sampling options handed to a generation provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_tokens: 512,
        }
    }
}

/// Descending comparison for `f32` scores, NaN sorts last.
pub fn cmp_score_desc(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(content: &str, meta: ChunkMetadata) -> Chunk {
        Chunk::new(content, meta)
    }

    #[test]
    fn test_locator_precedence() {
        let meta = ChunkMetadata::new("a.pdf").with_page(3).with_lines(1, 9);
        assert_eq!(meta.locator(), Locator::Page(3));

        let meta = ChunkMetadata::new("a.txt").with_lines(1, 9);
        assert_eq!(meta.locator(), Locator::Lines(1, 9));

        let mut meta = ChunkMetadata::new("a.txt");
        meta.line_start = Some(4);
        assert_eq!(meta.locator(), Locator::Unspecified);
    }

    #[test]
    fn test_identity_uses_character_prefix() {
        let long = "é".repeat(100);
        let c = chunk(&long, ChunkMetadata::new("x.md"));
        assert_eq!(c.identity().prefix.chars().count(), IDENTITY_PREFIX_CHARS);

        let a = chunk(&format!("{}tail one", "h".repeat(60)), ChunkMetadata::new("x.md"));
        let b = chunk(&format!("{}tail two", "h".repeat(60)), ChunkMetadata::new("x.md"));
        assert_eq!(a.identity(), b.identity());

        let other_source = chunk(&a.content, ChunkMetadata::new("y.md"));
        assert_ne!(a.identity(), other_source.identity());
    }

    #[test]
    fn test_source_labels() {
        let paged = chunk("x", ChunkMetadata::new("guide.pdf").with_page(2));
        assert_eq!(paged.source_label(), "guide.pdf: page 2");

        let lined = chunk("x", ChunkMetadata::new("manual.txt").with_lines(11, 20));
        assert_eq!(lined.source_label(), "manual.txt: lines 11–20");

        let bare = chunk("x", ChunkMetadata::new("faq.md"));
        assert_eq!(bare.source_label(), "faq.md");
    }

    #[test]
    fn test_metadata_extra_keys_round_trip() {
        let json = r#"{"source":"faq.md","line_start":1,"line_end":4,"lang":"en"}"#;
        let meta: ChunkMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.locator(), Locator::Lines(1, 4));
        assert_eq!(meta.extra.get("lang"), Some(&serde_json::json!("en")));

        let missing_source: ChunkMetadata = serde_json::from_str("{}").unwrap();
        assert_eq!(missing_source.source, UNKNOWN_SOURCE);
    }

    #[test]
    fn test_context_sources_dedup_in_order() {
        let hits = vec![
            ScoredChunk {
                chunk: chunk("a", ChunkMetadata::new("faq.md")),
                score: 1.0,
            },
            ScoredChunk {
                chunk: chunk("b", ChunkMetadata::new("manual.txt").with_lines(1, 10)),
                score: 0.5,
            },
            ScoredChunk {
                chunk: chunk("c", ChunkMetadata::new("faq.md")),
                score: 0.0,
            },
        ];
        let result = RetrievalResult {
            query: "q".to_string(),
            hits,
            latency_ms: 0,
        };
        assert_eq!(
            result.context_sources(),
            vec!["faq.md".to_string(), "manual.txt: lines 1–10".to_string()]
        );
        assert!((result.average_score() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_cmp_score_desc() {
        let mut scores = vec![0.1, f32::NAN, 0.9, 0.5];
        scores.sort_by(|a, b| cmp_score_desc(*a, *b));
        assert_eq!(&scores[..3], &[0.9, 0.5, 0.1]);
        assert!(scores[3].is_nan());
    }
}
