pub mod content;
pub mod html;
pub mod markdown;
pub mod text;


pub use content::extract_main_content;
pub use html::extract_links;
pub use markdown::to_markdown;

use serde::{Deserialize, Serialize};

/// Markdown derived from exactly one page of raw markup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    /// Converted Markdown text
    pub markdown: String,

    /// Characters of raw markup the document came from
    pub original_length: usize,

    /// Characters of the resulting Markdown
    pub cleaned_length: usize,
}

impl ExtractedDocument {
    /// Run content extraction and Markdown conversion over `raw_html`
    pub fn from_html(raw_html: &str, remove_selector: Option<&str>, include_images: bool) -> Self {
        let content = extract_main_content(raw_html, remove_selector);
        ::log::debug!("Cleaned HTML length: {}", content.len());

        let markdown = to_markdown(&content, include_images);
        let cleaned_length = markdown.chars().count();

        Self {
            markdown,
            original_length: raw_html.chars().count(),
            cleaned_length,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.markdown.trim().is_empty()
    }
}
