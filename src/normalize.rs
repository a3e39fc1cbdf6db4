//! Text canonicalization for snapshot comparison
//!
//! [`canonicalize`] reduces raw article text to a stable form so that
//! re-encoding artifacts and whitespace reflow do not register as edits.
//! It is deterministic and idempotent: `canonicalize(canonicalize(x)) ==
//! canonicalize(x)`. HTML entity decoding deliberately lives elsewhere
//! (`sites::extract`) because double-decoding is not idempotent.

use regex::Regex;
use std::sync::LazyLock;

// Pre-compiled regex patterns for performance
static WHITESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());

static MULTI_NEWLINE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Canonicalize text for comparison.
///
/// Steps:
/// 1. Remove zero-width characters and BOM
/// 2. Remove control characters (except newline/tab)
/// 3. Collapse runs of spaces/tabs to a single space
/// 4. Trim each line
/// 5. Collapse 3+ consecutive newlines to 2
///
/// # Examples
///
/// ```
/// use newswatch::normalize::canonicalize;
///
/// let raw = "Title\u{FEFF}\n\n\n\nBody   text  here";
/// let clean = canonicalize(raw);
/// assert_eq!(clean, "Title\n\nBody text here");
/// assert_eq!(canonicalize(&clean), clean);
/// ```
pub fn canonicalize(text: &str) -> String {
    let mut result = remove_invisible(text);
    result = collapse_spaces(&result);
    result = trim_lines(&result);
    result = collapse_newlines(&result);
    result.trim().to_string()
}

/// Remove zero-width characters, BOM, and control characters other than
/// newline and tab.
pub fn remove_invisible(text: &str) -> String {
    text.chars()
        .filter(|c| {
            let zero_width = matches!(*c,
                '\u{200B}'..='\u{200F}' |
                '\u{2028}'..='\u{202F}' |
                '\u{FEFF}'
            );
            let control = c.is_control() && *c != '\n' && *c != '\t';
            !zero_width && !control
        })
        .collect()
}

/// Collapse runs of spaces and tabs to a single space. Newlines are
/// handled separately.
pub fn collapse_spaces(text: &str) -> String {
    WHITESPACE_REGEX.replace_all(text, " ").to_string()
}

/// Trim whitespace from each line while preserving line structure.
pub fn trim_lines(text: &str) -> String {
    text.lines()
        .map(|line| line.trim())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapse 3+ consecutive newlines to exactly 2.
pub fn collapse_newlines(text: &str) -> String {
    MULTI_NEWLINE_REGEX.replace_all(text, "\n\n").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_idempotent() {
        let inputs = [
            "Hello\u{200B}World  \n\n\n\nTest",
            "2026-08-26\nBody   line one\n\tline two\t\t",
            "",
            "single line",
            "\u{FEFF}  leading junk  ",
        ];
        for input in inputs {
            let once = canonicalize(input);
            assert_eq!(canonicalize(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_canonicalize_collapses_whitespace() {
        assert_eq!(canonicalize("a    b\t\tc"), "a b c");
    }

    #[test]
    fn test_canonicalize_preserves_paragraphs() {
        assert_eq!(canonicalize("Para 1\n\n\n\n\nPara 2"), "Para 1\n\nPara 2");
    }

    #[test]
    fn test_remove_invisible() {
        let text = "a\u{200B}b\u{FEFF}c\x00d\ne";
        assert_eq!(remove_invisible(text), "abcd\ne");
    }

    #[test]
    fn test_trim_lines() {
        assert_eq!(trim_lines("  Line 1  \n  Line 2  "), "Line 1\nLine 2");
    }

    #[test]
    fn test_canonicalize_empty() {
        assert_eq!(canonicalize(""), "");
        assert_eq!(canonicalize("   \n\t  "), "");
    }

    #[test]
    fn test_canonicalize_deterministic() {
        let input = "Date line\nsome  body\ttext";
        assert_eq!(canonicalize(input), canonicalize(input));
    }
}
