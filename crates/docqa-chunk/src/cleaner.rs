//! Text normalization applied before chunking.

/// Normalize whitespace in extracted text.
///
/// - `\r\n` and lone `\r` become `\n`
/// - runs of spaces and tabs collapse to one space
/// - three or more consecutive newlines collapse to two
/// - leading and trailing whitespace is trimmed
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut newlines = 0usize;
    let mut pending_space = false;

    while let Some(c) = chars.next() {
        let c = match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                '\n'
            }
            '\t' => ' ',
            other => other,
        };

        match c {
            ' ' => pending_space = true,
            '\n' => {
                if pending_space {
                    out.push(' ');
                    pending_space = false;
                    newlines = 0;
                }
                newlines += 1;
                if newlines <= 2 {
                    out.push('\n');
                }
            }
            other => {
                if pending_space {
                    out.push(' ');
                    pending_space = false;
                }
                newlines = 0;
                out.push(other);
            }
        }
    }

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_endings() {
        assert_eq!(normalize_text("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_collapse_spaces_and_tabs() {
        assert_eq!(normalize_text("a  \t b\t\tc"), "a b c");
    }

    #[test]
    fn test_non_breaking_spaces_are_kept() {
        assert_eq!(normalize_text("50\u{a0}km  away"), "50\u{a0}km away");
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(normalize_text("a\n\n\n\n\nb\n\nc"), "a\n\nb\n\nc");
        assert_eq!(normalize_text("a\r\n\r\n\r\nb"), "a\n\nb");
        assert_eq!(normalize_text("a\n \n\n\nb"), "a\n \n\nb");
    }

    #[test]
    fn test_trim() {
        assert_eq!(normalize_text("  \n\n hello world \n "), "hello world");
        assert_eq!(normalize_text(" \t\r\n"), "");
    }
}
