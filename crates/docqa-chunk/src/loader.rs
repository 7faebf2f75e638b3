//! Document loading from disk and from in-memory payloads.

use std::path::Path;

use pulldown_cmark::{Event, Parser, TagEnd};
use tracing::{debug, warn};

use docqa_core::{RagError, Result};

/// A loaded document: its source name and extracted plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// File name used as the chunk `source`.
    pub source: String,

    /// Plain text, before normalization.
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    PlainText,
    Markdown,
}

fn format_of(name: &str) -> Option<Format> {
    let ext = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())?;
    match ext.as_str() {
        "txt" => Some(Format::PlainText),
        "md" | "markdown" => Some(Format::Markdown),
        _ => None,
    }
}

/// Whether the file name has a loadable extension.
pub fn is_supported(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .file_name()
        .map(|n| format_of(&n.to_string_lossy()).is_some())
        .unwrap_or(false)
}

impl SourceDocument {
    /// Build a document from an uploaded `{filename, text}` payload.
    ///
    /// Markdown payloads are rendered to plain text like markdown files.
    /// Any other extension is taken as plain text.
    pub fn from_text(filename: impl Into<String>, text: &str) -> Self {
        let source = filename.into();
        let text = match format_of(&source) {
            Some(Format::Markdown) => markdown_to_text(text),
            _ => text.to_string(),
        };
        Self { source, text }
    }
}

/// Load a single `.txt`, `.md` or `.markdown` file.
pub fn load_path(path: impl AsRef<Path>) -> Result<SourceDocument> {
    let path = path.as_ref();
    let uri = path.display().to_string();

    let source = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| RagError::load_failed(&uri, "not a file path"))?;

    let format =
        format_of(&source).ok_or_else(|| RagError::load_failed(&uri, "unsupported file type"))?;

    let bytes = std::fs::read(path).map_err(|e| RagError::load_failed(&uri, e.to_string()))?;
    let raw = String::from_utf8_lossy(&bytes);

    let text = match format {
        Format::PlainText => raw.into_owned(),
        Format::Markdown => markdown_to_text(&raw),
    };

    debug!("Loaded {} ({} chars)", uri, text.len());
    Ok(SourceDocument { source, text })
}

/// Load every supported file directly inside `dir`, sorted by file name.
///
/// Unsupported files and subdirectories are skipped.
pub fn load_dir(dir: impl AsRef<Path>) -> Result<Vec<SourceDocument>> {
    let dir = dir.as_ref();
    let uri = dir.display().to_string();

    let entries = std::fs::read_dir(dir).map_err(|e| RagError::load_failed(&uri, e.to_string()))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if is_supported(&path) {
            paths.push(path);
        } else {
            warn!("Skipping unsupported file: {}", path.display());
        }
    }
    paths.sort();

    paths.iter().map(|p| load_path(p)).collect()
}

/// Render markdown to plain text, dropping markup.
pub fn markdown_to_text(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());

    for event in Parser::new(markdown) {
        match event {
            Event::Text(text) | Event::Code(text) => out.push_str(&text),
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::End(TagEnd::Paragraph)
            | Event::End(TagEnd::Heading(_))
            | Event::End(TagEnd::CodeBlock)
            | Event::End(TagEnd::BlockQuote) => out.push_str("\n\n"),
            Event::End(TagEnd::Item) | Event::End(TagEnd::TableRow) => out.push('\n'),
            Event::End(TagEnd::TableCell) => out.push(' '),
            Event::Rule => out.push('\n'),
            _ => {}
        }
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_markdown_to_text() {
        let md = "# Refunds\n\nOur **refund** policy lasts `30` days.\n\n- one\n- two\n";
        let text = markdown_to_text(md);

        assert!(text.starts_with("Refunds\n\nOur refund policy lasts 30 days."));
        assert!(text.contains("one\n"));
        assert!(!text.contains('#'));
        assert!(!text.contains("**"));
    }

    #[test]
    fn test_is_supported() {
        assert!(is_supported("notes.TXT"));
        assert!(is_supported("guide.md"));
        assert!(is_supported("/a/b/readme.markdown"));
        assert!(!is_supported("scan.png"));
        assert!(!is_supported("Makefile"));
    }

    #[test]
    fn test_load_dir_skips_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.md"), "# Title\n\nBody").unwrap();
        fs::write(dir.path().join("a.txt"), "plain text").unwrap();
        fs::write(dir.path().join("c.bin"), [0u8, 1, 2]).unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        let docs = load_dir(dir.path()).unwrap();

        let sources: Vec<_> = docs.iter().map(|d| d.source.as_str()).collect();
        assert_eq!(sources, vec!["a.txt", "b.md"]);
        assert_eq!(docs[0].text, "plain text");
        assert_eq!(docs[1].text, "Title\n\nBody");
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_path("/nonexistent/file.txt").unwrap_err();
        assert_eq!(err.error_code(), "LOAD_FAILED");
    }

    #[test]
    fn test_load_unsupported_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.png");
        fs::write(&path, [137u8, 80, 78, 71]).unwrap();
        assert_eq!(load_path(&path).unwrap_err().error_code(), "LOAD_FAILED");
    }

    #[test]
    fn test_payload_markdown_is_rendered() {
        let doc = SourceDocument::from_text("faq.md", "## Q\n\n*A*");
        assert_eq!(doc.source, "faq.md");
        assert_eq!(doc.text, "Q\n\nA");

        let raw = SourceDocument::from_text("notes", "## kept");
        assert_eq!(raw.text, "## kept");
    }
}
