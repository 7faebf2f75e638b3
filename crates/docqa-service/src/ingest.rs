//! Turning loaded documents into indexable chunks.

use tracing::{debug, warn};

use docqa_chunk::{normalize_text, ChunkConfig, Chunker, SourceDocument};
use docqa_core::{Chunk, ChunkMetadata, Result, SourceSummary};

/// Clean and split documents into chunks carrying source and line range.
///
/// Documents that produce no chunks are skipped with a warning; an invalid
/// chunk configuration fails the whole batch.
pub fn chunk_documents(
    documents: &[SourceDocument],
    chunker: &dyn Chunker,
    config: &ChunkConfig,
) -> Result<Vec<Chunk>> {
    let mut chunks = Vec::new();

    for doc in documents {
        let text = normalize_text(&doc.text);
        let pieces = chunker.chunk(&text, config)?;
        if pieces.is_empty() {
            warn!("No text extracted from {}, skipping", doc.source);
            continue;
        }

        debug!("{}: {} chunks", doc.source, pieces.len());
        chunks.extend(pieces.into_iter().map(|piece| {
            let metadata =
                ChunkMetadata::new(&doc.source).with_lines(piece.start_line, piece.end_line);
            Chunk::new(piece.content, metadata)
        }));
    }

    Ok(chunks)
}

/// Chunk counts per source, in order of first appearance.
pub fn summarize_sources(chunks: &[Chunk]) -> Vec<SourceSummary> {
    let mut summary: Vec<SourceSummary> = Vec::new();
    for chunk in chunks {
        let source = &chunk.metadata.source;
        match summary.iter_mut().find(|s| &s.filename == source) {
            Some(entry) => entry.chunks += 1,
            None => summary.push(SourceSummary {
                filename: source.clone(),
                chunks: 1,
            }),
        }
    }
    summary
}
