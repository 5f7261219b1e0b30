use crate::parsers::html::visible_text;
use crate::parsers::text::{self, TextOptions};
use htmd::HtmlToMarkdown;
use htmd::options::{HeadingStyle, Options};

/// Convert content markup to Markdown with ATX headings.
///
/// Images are dropped when `include_images` is false. Blank-line runs are
/// collapsed and the result is trimmed. Never fails: a converter error
/// degrades to plain text.
pub fn to_markdown(content_html: &str, include_images: bool) -> String {
    let mut skipped = vec!["script", "style", "noscript"];
    if !include_images {
        skipped.push("img");
    }

    let converter = HtmlToMarkdown::builder()
        .skip_tags(skipped)
        .options(Options {
            heading_style: HeadingStyle::Atx,
            ..Default::default()
        })
        .build();

    let markdown = match converter.convert(content_html) {
        Ok(markdown) => markdown,
        Err(e) => {
            ::log::warn!("Markdown conversion failed, degrading to plain text: {}", e);
            plain_text(content_html)
        }
    };

    text::collapse_blank_lines(&markdown)
}

/// Paragraph-preserving plain text of some markup
pub fn plain_text(html: &str) -> String {
    text::normalize(&visible_text(html), &TextOptions::default())
}
