//! Grounding prompt construction.

use docqa_core::Chunk;

/// Characters of each chunk included in the context.
pub const MAX_CONTEXT_CHARS: usize = 1200;

/// Placed between context entries.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Instruction restricting the model to the supplied context.
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant that MUST answer ONLY using the \
provided context. Cite facts from the context; do not fabricate. If the answer is not present, \
say so briefly.";

/// Reference line for a chunk: `(source: S, page: P)` or `(source: S)`.
fn reference(chunk: &Chunk) -> String {
    match chunk.metadata.page {
        Some(page) => format!("(source: {}, page: {})", chunk.metadata.source, page),
        None => format!("(source: {})", chunk.metadata.source),
    }
}

/// Build the prompt for `question` grounded on `context`, in rank order.
///
/// Each chunk contributes its reference line followed by at most
/// [`MAX_CONTEXT_CHARS`] characters of content.
pub fn build_prompt<'a, I>(question: &str, context: I) -> String
where
    I: IntoIterator<Item = &'a Chunk>,
{
    let entries: Vec<String> = context
        .into_iter()
        .map(|chunk| {
            let text: String = chunk.content.chars().take(MAX_CONTEXT_CHARS).collect();
            format!("{}\n{}", reference(chunk), text)
        })
        .collect();

    format!(
        "{}\n\nContext:\n{}\n\nQuestion: {}\n\nAnswer in the same language as the question.",
        SYSTEM_INSTRUCTION,
        entries.join(CONTEXT_SEPARATOR),
        question
    )
}
