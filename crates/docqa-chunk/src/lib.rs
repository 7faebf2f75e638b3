//! docqa-chunk - text cleaning, loading and chunking
//!
//! Documents go through three steps before they are indexed:
//!
//! - [`load_path`] / [`load_dir`]: read `.txt` and `.md` files, rendering
//!   markdown to plain text
//! - [`normalize_text`]: unify line endings and collapse whitespace
//! - [`RecursiveChunker`]: split into overlapping character windows on
//!   paragraph, line, word and finally character boundaries
//!
//! # Example
//!
//! ```rust
//! use docqa_chunk::{normalize_text, Chunker, ChunkConfig, RecursiveChunker};
//!
//! let text = normalize_text("First paragraph.\r\n\r\n\r\nSecond   paragraph.");
//! let chunks = RecursiveChunker::new().chunk(&text, &ChunkConfig::default()).unwrap();
//! assert_eq!(chunks.len(), 1);
//! ```

mod cleaner;
mod loader;
mod recursive;

pub use cleaner::normalize_text;
pub use loader::{is_supported, load_dir, load_path, markdown_to_text, SourceDocument};
pub use recursive::{RecursiveChunker, DEFAULT_SEPARATORS};

// Re-export types for convenience
pub use docqa_core::{ChunkConfig, ChunkData, Chunker};
