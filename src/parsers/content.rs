//! Heuristic reduction of a rendered page to its primary content region.
//!
//! Every step works on the parsed tree and is skipped, not failed, when it
//! finds nothing to do. The chain always yields some markup: a scored
//! candidate, the body, or the whole cleaned document.

use crate::parsers::html::{parse_selector, stripped_text_len};
use scraper::{ElementRef, Html, Selector};

/// Tags that never carry primary content
pub const DENYLISTED_TAGS: &[&str] = &[
    "script", "style", "svg", "noscript", "iframe", "object", "embed", "nav", "footer", "header",
    "aside", "form", "button", "input", "textarea", "select",
];

/// id/class fragments that mark an element as a content region
pub const AFFIRMING_KEYWORDS: &[&str] = &["main", "article", "content", "post", "entry", "body"];

/// id/class tokens that mark an element as page furniture
pub const NOISE_KEYWORDS: &[&str] = &[
    "ad",
    "ads",
    "advertisement",
    "banner",
    "popup",
    "cookie",
    "subscription",
    "sidebar",
    "widget",
    "social",
    "share",
    "promo",
    "newsletter",
    "comment",
    "hidden",
    "modal",
];

/// Semantic elements tried first, in order
pub const SEMANTIC_CANDIDATES: &[&str] = &["article", "main"];

/// Common containers tried after the semantic elements
pub const CANDIDATE_SELECTORS: &[&str] = &[
    "#content",
    "#main",
    "#app",
    "#root",
    ".content",
    ".post-content",
    ".article-body",
    ".entry-content",
    "[role=\"main\"]",
];

/// A candidate must hold more stripped text than this to be chosen
pub const MIN_CANDIDATE_TEXT: usize = 200;

/// What the id/class tokens of an element say about it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeVerdict {
    /// Looks like a content region; never removed
    Affirmed,
    /// Looks like ads, popups or other furniture
    Noise,
    Neutral,
}

/// Noise keywords too short to match inside longer words (`shadow`, `address`)
const SHORT_NOISE_KEYWORDS: &[&str] = &["ad", "ads"];

/// Classify an element from its `id` and `class` tokens.
///
/// Affirmation wins: a token containing any affirming keyword keeps the
/// element. Otherwise the element is noise when a token contains one of the
/// longer noise keywords (`cookieBanner`, `comments`), or when one of its
/// parts (split on `-`, `_` and camelCase humps) is `ad` or starts with `ads`
/// (`header-ads`, `adsbygoogle`).
pub fn classify_attributes<'a>(
    id: Option<&'a str>,
    classes: impl IntoIterator<Item = &'a str>,
) -> AttributeVerdict {
    let tokens: Vec<&str> = id.into_iter().chain(classes).filter(|t| !t.is_empty()).collect();
    let lowered: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();

    if lowered
        .iter()
        .any(|t| AFFIRMING_KEYWORDS.iter().any(|k| t.contains(k)))
    {
        return AttributeVerdict::Affirmed;
    }

    let long_keyword = lowered.iter().any(|token| {
        NOISE_KEYWORDS
            .iter()
            .filter(|k| !SHORT_NOISE_KEYWORDS.contains(k))
            .any(|k| token.contains(k))
    });
    let short_keyword = tokens.iter().any(|token| {
        token_parts(token)
            .iter()
            .any(|part| part == "ad" || part.starts_with("ads"))
    });

    if long_keyword || short_keyword {
        AttributeVerdict::Noise
    } else {
        AttributeVerdict::Neutral
    }
}

/// Lowercased parts of a token, split on `-`, `_` and lower-to-upper case changes
fn token_parts(token: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut previous_lower = false;

    for c in token.chars() {
        if c == '-' || c == '_' {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
            previous_lower = false;
            continue;
        }
        if c.is_uppercase() && previous_lower && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        previous_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Reduce `raw_html` to the markup of its main content region
pub fn extract_main_content(raw_html: &str, remove_selector: Option<&str>) -> String {
    if raw_html.trim().is_empty() {
        return String::new();
    }

    let mut doc = Html::parse_document(raw_html);

    if let Some(selector) = remove_selector.and_then(parse_selector) {
        let removed = remove_elements(&mut doc, |el| selector.matches(el));
        ::log::debug!("Removed {} elements matching '{:?}'", removed, remove_selector);
    }

    remove_comments(&mut doc);
    let removed = remove_elements(&mut doc, |el| DENYLISTED_TAGS.contains(&el.value().name()));
    ::log::trace!("Stripped {} denylisted elements", removed);

    let removed = remove_elements(&mut doc, is_noise_element);
    ::log::trace!("Stripped {} noise elements", removed);

    select_candidate(&doc)
}

fn is_noise_element(element: &ElementRef<'_>) -> bool {
    let value = element.value();
    if matches!(value.name(), "html" | "body") {
        return false;
    }
    classify_attributes(value.attr("id"), value.classes()) == AttributeVerdict::Noise
}

/// Detach every element matching `predicate` together with its subtree
fn remove_elements<F>(doc: &mut Html, predicate: F) -> usize
where
    F: Fn(&ElementRef<'_>) -> bool,
{
    let ids: Vec<_> = doc
        .tree
        .nodes()
        .filter_map(ElementRef::wrap)
        .filter(|el| predicate(el))
        .map(|el| el.id())
        .collect();

    let count = ids.len();
    for id in ids {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }
    count
}

fn remove_comments(doc: &mut Html) {
    let ids: Vec<_> = doc
        .tree
        .nodes()
        .filter(|node| node.value().is_comment())
        .map(|node| node.id())
        .collect();

    for id in ids {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn first_match<'a>(doc: &'a Html, selector: &Selector) -> Option<ElementRef<'a>> {
    doc.select(selector).next()
}

fn select_candidate(doc: &Html) -> String {
    let candidates = SEMANTIC_CANDIDATES
        .iter()
        .chain(CANDIDATE_SELECTORS.iter())
        .filter_map(|css| parse_selector(css));

    for selector in candidates {
        if let Some(element) = first_match(doc, &selector) {
            if stripped_text_len(&element) > MIN_CANDIDATE_TEXT {
                return element.html();
            }
        }
    }

    ::log::debug!("No content candidate cleared the threshold, falling back to body");
    match parse_selector("body").and_then(|body| first_match(doc, &body)) {
        Some(body) => body.html(),
        None => doc.html(),
    }
}
