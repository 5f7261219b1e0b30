use crate::filter::{authority, strip_trailing_slash};
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use url::Url;

/// Elements that start a new block when flattening markup to text
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "dd", "div", "dl", "dt", "figcaption", "figure", "h1",
    "h2", "h3", "h4", "h5", "h6", "hr", "li", "main", "ol", "p", "pre", "section", "table", "td",
    "th", "tr", "ul",
];

/// Parse a CSS selector, logging instead of failing
pub fn parse_selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            ::log::debug!("Ignoring unparsable selector '{}': {:?}", css, e);
            None
        }
    }
}

/// Extract same-host links from `html`, resolved against `base_url`
///
/// Every link is absolute http(s), has no fragment and at most one trailing
/// slash removed. Links that fail to resolve are dropped.
pub fn extract_links(html: &str, base_url: &str) -> HashSet<String> {
    let mut links = HashSet::new();

    let Ok(base) = Url::parse(base_url) else {
        ::log::debug!("Cannot harvest links against malformed base {}", base_url);
        return links;
    };
    let base_domain = authority(&base);
    let Some(anchor) = parse_selector("a[href]") else {
        return links;
    };

    let doc = Html::parse_document(html);
    for href in doc.select(&anchor).filter_map(|e| e.value().attr("href")) {
        let Ok(mut resolved) = base.join(href) else {
            continue;
        };

        if !matches!(resolved.scheme(), "http" | "https") || authority(&resolved) != base_domain {
            continue;
        }

        resolved.set_fragment(None);
        let clean = strip_trailing_slash(resolved.as_str());
        if !clean.is_empty() {
            links.insert(clean.to_string());
        }
    }

    ::log::debug!("HTML parser found {} same-domain links", links.len());
    links
}

/// Flatten markup to text, inserting blank lines at block boundaries
pub fn visible_text(html: &str) -> String {
    let doc = Html::parse_fragment(html);
    let mut out = String::new();
    push_text(doc.root_element(), &mut out);
    out
}

fn push_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if matches!(name, "script" | "style" | "noscript" | "template") {
                    continue;
                }
                if name == "br" {
                    out.push('\n');
                    continue;
                }

                let is_block = BLOCK_TAGS.contains(&name);
                if is_block {
                    out.push_str("\n\n");
                }
                if let Some(child_element) = ElementRef::wrap(child) {
                    push_text(child_element, out);
                }
                if is_block {
                    out.push_str("\n\n");
                }
            }
            _ => {}
        }
    }
}

/// Length in characters of an element's text with every text node trimmed
pub fn stripped_text_len(element: &ElementRef<'_>) -> usize {
    element.text().map(|t| t.trim().chars().count()).sum()
}
