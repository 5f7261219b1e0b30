use crate::error::FetchError;
use serde::{Deserialize, Serialize};
use url::Url;

/// One unit of work for the fetch coordinator.
///
/// Built with [`FetchRequest::new`] and the `with_*` methods, then only ever
/// shared by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Absolute http(s) URL to render
    pub url: Url,

    /// Selector to wait for before capturing content (best effort)
    pub wait_selector: Option<String>,

    /// Selector whose inner markup replaces the full document when found
    pub target_selector: Option<String>,

    /// Selector of elements to delete during content extraction
    pub exclude_selector: Option<String>,

    /// Whether images survive Markdown conversion
    pub include_images: bool,

    /// Capture a PNG screenshot of the rendered page
    pub capture_screenshot: bool,

    /// Capture a PDF print of the rendered page
    pub capture_pdf: bool,
}

impl FetchRequest {
    /// Create a request for `url`, rejecting anything that is not an absolute http(s) URL
    pub fn new(url: &str) -> Result<Self, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        Ok(Self {
            url: parsed,
            wait_selector: None,
            target_selector: None,
            exclude_selector: None,
            include_images: false,
            capture_screenshot: false,
            capture_pdf: false,
        })
    }

    pub fn with_wait_selector(mut self, selector: Option<String>) -> Self {
        self.wait_selector = selector;
        self
    }

    pub fn with_target_selector(mut self, selector: Option<String>) -> Self {
        self.target_selector = selector;
        self
    }

    pub fn with_exclude_selector(mut self, selector: Option<String>) -> Self {
        self.exclude_selector = selector;
        self
    }

    pub fn with_images(mut self, include_images: bool) -> Self {
        self.include_images = include_images;
        self
    }

    pub fn with_screenshot(mut self, capture: bool) -> Self {
        self.capture_screenshot = capture;
        self
    }

    pub fn with_pdf(mut self, capture: bool) -> Self {
        self.capture_pdf = capture;
        self
    }
}

/// What the renderer produced for one [`FetchRequest`]
#[derive(Debug, Clone, Default)]
pub struct FetchResult {
    /// Title of the page (if available)
    pub title: Option<String>,

    /// Raw markup; `None` means nothing could be retrieved
    pub content: Option<String>,

    /// PNG screenshot bytes
    pub screenshot: Option<Vec<u8>>,

    /// PDF bytes
    pub pdf: Option<Vec<u8>>,
}

impl FetchResult {
    /// Raw content, treating an empty string like a missing one
    pub fn non_empty_content(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.is_empty())
    }
}

/// A page fetched during a crawl, in dequeue order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawledPage {
    /// URL of the page as it sat in the frontier
    pub url: String,

    /// Title of the page (if available)
    pub title: Option<String>,

    /// Raw markup returned by the renderer
    pub content: Option<String>,
}

impl CrawledPage {
    pub fn new(url: String, title: Option<String>, content: Option<String>) -> Self {
        Self {
            url,
            title,
            content,
        }
    }
}
