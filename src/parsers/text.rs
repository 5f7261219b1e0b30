use regex::Regex;
use std::sync::LazyLock;

/// Any run of lines that holds nothing but whitespace between two newlines
static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("blank-line pattern should be valid"));

/// Configuration options for plain-text normalization
#[derive(Debug, Clone, Copy)]
pub struct TextOptions {
    /// Whether to keep single newlines inside a paragraph
    pub preserve_line_breaks: bool,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            preserve_line_breaks: false,
        }
    }
}

/// Collapse every run of blank lines to exactly one blank line and trim the result
pub fn collapse_blank_lines(text: &str) -> String {
    BLANK_RUN.replace_all(text, "\n\n").trim().to_string()
}

/// Normalize extracted text into paragraphs separated by a single blank line
///
/// - Trims every line and collapses inner whitespace
/// - Drops empty lines, treating them as paragraph boundaries
/// - Joins the lines of one paragraph with a space, or a newline when
///   `preserve_line_breaks` is set
pub fn normalize(text: &str, options: &TextOptions) -> String {
    let separator = if options.preserve_line_breaks { "\n" } else { " " };

    split_into_paragraphs(text)
        .iter()
        .map(|paragraph| {
            paragraph
                .iter()
                .map(|line| normalize_whitespace_in_segment(line))
                .collect::<Vec<_>>()
                .join(separator)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Splits text into paragraphs based on empty lines
pub fn split_into_paragraphs(text: &str) -> Vec<Vec<&str>> {
    let mut paragraphs: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
        } else {
            current.push(trimmed);
        }
    }

    if !current.is_empty() {
        paragraphs.push(current);
    }

    paragraphs
}

/// Normalizes whitespace within a single line or paragraph
pub fn normalize_whitespace_in_segment(segment: &str) -> String {
    segment.split_whitespace().collect::<Vec<_>>().join(" ")
}
