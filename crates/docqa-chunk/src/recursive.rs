//! Recursive character text chunker.
//!
//! Splits text by trying progressively smaller separators until every piece
//! fits within the chunk size, then merges neighbouring pieces back into
//! windows that share `chunk_overlap` characters.

use tracing::debug;

use docqa_core::{ChunkConfig, ChunkData, Chunker, RagError, Result};

/// Paragraphs, lines, words, then single characters.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Recursive chunker that splits text by multiple separators.
///
/// Lengths are counted in characters. Each emitted chunk is trimmed and
/// carries the 1-based line range it occupies in the input text.
pub struct RecursiveChunker {
    separators: Vec<String>,
}

impl RecursiveChunker {
    /// Create a chunker with [`DEFAULT_SEPARATORS`].
    pub fn new() -> Self {
        Self::with_separators(DEFAULT_SEPARATORS)
    }

    /// Create a chunker with custom separators, tried in order.
    pub fn with_separators<I, S>(separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            separators: separators.into_iter().map(Into::into).collect(),
        }
    }

    /// Split text into chunk strings.
    fn split_text(&self, text: &str, separators: &[String], config: &ChunkConfig) -> Vec<String> {
        // First separator present in the text; "" always matches
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = "";
                break;
            }
            if text.contains(sep.as_str()) {
                separator = sep.as_str();
                remaining = &separators[i + 1..];
                break;
            }
        }

        let splits = split_by_separator(text, separator);

        let mut chunks = Vec::new();
        let mut good: Vec<&str> = Vec::new();
        for piece in splits {
            if char_len(piece) < config.chunk_size {
                good.push(piece);
                continue;
            }
            if !good.is_empty() {
                chunks.extend(merge_splits(&good, separator, config));
                good.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_text(piece, remaining, config));
            }
        }
        if !good.is_empty() {
            chunks.extend(merge_splits(&good, separator, config));
        }

        chunks
    }
}

impl Default for RecursiveChunker {
    fn default() -> Self {
        Self::new()
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split text by a separator, dropping empty pieces.
fn split_by_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        // Character-level split as last resort
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    text.split(separator).filter(|s| !s.is_empty()).collect()
}

/// Merge small pieces into windows of at most `chunk_size` characters.
///
/// When a window is full it is emitted, then pieces are dropped from its
/// front until at most `chunk_overlap` characters remain to seed the next one.
fn merge_splits(splits: &[&str], separator: &str, config: &ChunkConfig) -> Vec<String> {
    let sep_len = char_len(separator);
    let mut docs = Vec::new();
    let mut current: std::collections::VecDeque<&str> = std::collections::VecDeque::new();
    let mut total = 0usize;

    for piece in splits {
        let len = char_len(piece);
        let joined_len = |total: usize, current_empty: bool| {
            total + len + if current_empty { 0 } else { sep_len }
        };

        if joined_len(total, current.is_empty()) > config.chunk_size && !current.is_empty() {
            let doc = join(&current, separator);
            if !doc.is_empty() {
                docs.push(doc);
            }

            while total > config.chunk_overlap
                || (joined_len(total, current.is_empty()) > config.chunk_size && total > 0)
            {
                let Some(front) = current.pop_front() else {
                    break;
                };
                total -= char_len(front) + if current.is_empty() { 0 } else { sep_len };
            }
        }

        total += len + if current.is_empty() { 0 } else { sep_len };
        current.push_back(piece);
    }

    let doc = join(&current, separator);
    if !doc.is_empty() {
        docs.push(doc);
    }

    docs
}

fn join(pieces: &std::collections::VecDeque<&str>, separator: &str) -> String {
    let mut out = String::new();
    for (i, piece) in pieces.iter().enumerate() {
        if i > 0 {
            out.push_str(separator);
        }
        out.push_str(piece);
    }
    out.trim().to_string()
}

/// Attach 1-based line ranges by locating each chunk in the source text.
///
/// Chunks appear in order, so each search starts just past the previous
/// chunk's start.
fn with_line_ranges(text: &str, chunks: Vec<String>) -> Vec<ChunkData> {
    let mut cursor = 0usize;
    let mut last_start_line = 1u32;

    chunks
        .into_iter()
        .map(|content| {
            let found = text[cursor..]
                .find(content.as_str())
                .map(|offset| cursor + offset)
                .or_else(|| text.find(content.as_str()));

            let start_line = match found {
                Some(pos) => {
                    cursor = pos + content.chars().next().map_or(0, char::len_utf8);
                    1 + text[..pos].matches('\n').count() as u32
                }
                None => last_start_line,
            };
            last_start_line = start_line;

            let end_line = start_line + content.matches('\n').count() as u32;
            ChunkData {
                content,
                start_line,
                end_line,
            }
        })
        .collect()
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, content: &str, config: &ChunkConfig) -> Result<Vec<ChunkData>> {
        if config.chunk_size == 0 {
            return Err(RagError::chunking("chunk_size must be positive"));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(RagError::chunking(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let pieces = self.split_text(content, &self.separators, config);
        let chunks = with_line_ranges(content, pieces);

        debug!(
            "Split {} chars into {} chunks (size={}, overlap={})",
            char_len(content),
            chunks.len(),
            config.chunk_size,
            config.chunk_overlap
        );

        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(chunk_size: usize, chunk_overlap: usize) -> ChunkConfig {
        ChunkConfig {
            chunk_size,
            chunk_overlap,
        }
    }

    #[test]
    fn test_simple_chunk() {
        let chunker = RecursiveChunker::new();
        let text = "Hello world. This is a test.";
        let chunks = chunker.chunk(text, &config(100, 10)).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, text);
        assert_eq!((chunks[0].start_line, chunks[0].end_line), (1, 1));
    }

    #[test]
    fn test_paragraph_split() {
        let chunker = RecursiveChunker::new();
        let text = "First paragraph here.\n\nSecond paragraph here.\n\nThird one.";
        let chunks = chunker.chunk(text, &config(30, 0)).unwrap();

        let contents: Vec<_> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["First paragraph here.", "Second paragraph here.", "Third one."]
        );
        assert_eq!(chunks[1].start_line, 3);
        assert_eq!(chunks[2].start_line, 5);
    }

    #[test]
    fn test_chunks_respect_size() {
        let chunker = RecursiveChunker::new();
        let text = "word ".repeat(300);
        let chunks = chunker.chunk(&text, &config(50, 10)).unwrap();

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.content.chars().count() <= 50));
    }

    #[test]
    fn test_overlap_repeats_tail() {
        let chunker = RecursiveChunker::new();
        let text = "one two three four five six seven eight nine ten";
        let chunks = chunker.chunk(text, &config(20, 10)).unwrap();

        assert!(chunks.len() >= 2);
        for pair in chunks.windows(2) {
            let last_word = pair[0].content.split(' ').last().unwrap();
            assert!(pair[1].content.contains(last_word));
        }
    }

    #[test]
    fn test_character_fallback() {
        let chunker = RecursiveChunker::new();
        let text = "abcdefghijklmnopqrstuvwxyz";
        let chunks = chunker.chunk(text, &config(10, 0)).unwrap();

        let contents: Vec<_> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["abcdefghij", "klmnopqrst", "uvwxyz"]);
    }

    #[test]
    fn test_multibyte_text() {
        let chunker = RecursiveChunker::new();
        let text = "ñandú ".repeat(40);
        let chunks = chunker.chunk(&text, &config(25, 5)).unwrap();
        assert!(chunks.iter().all(|c| c.content.chars().count() <= 25));
    }

    #[test]
    fn test_line_numbers() {
        let chunker = RecursiveChunker::new();
        let text = "Line 1\nLine 2\nLine 3\n\nLine 5\nLine 6";
        let chunks = chunker.chunk(text, &config(20, 0)).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "Line 1\nLine 2\nLine 3");
        assert_eq!((chunks[0].start_line, chunks[0].end_line), (1, 3));
        assert_eq!((chunks[1].start_line, chunks[1].end_line), (5, 6));
    }

    #[test]
    fn test_empty_content() {
        let chunker = RecursiveChunker::new();
        assert!(chunker.chunk("", &ChunkConfig::default()).unwrap().is_empty());
        assert!(chunker.chunk(" \n ", &ChunkConfig::default()).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_config() {
        let chunker = RecursiveChunker::new();
        assert_eq!(
            chunker.chunk("text", &config(10, 10)).unwrap_err().error_code(),
            "CHUNKING_ERROR"
        );
        assert!(chunker.chunk("text", &config(0, 0)).is_err());
    }
}
