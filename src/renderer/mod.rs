//! Render backends: something that can load a URL in a browser engine and
//! hand back markup and artifacts.
//!
//! A [`Renderer`] is the long-lived, shared backend. Every fetch opens its own
//! [`BrowsingContext`] and closes it again, so no state leaks between fetches.

pub mod webdriver;

#[cfg(test)]
pub(crate) mod mock;

pub use webdriver::WebDriverRenderer;

use crate::error::RenderError;
use async_trait::async_trait;
use url::Url;

/// Shared render backend
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Open a fresh, isolated browsing context
    async fn open(&self) -> Result<Box<dyn BrowsingContext>, RenderError>;
}

/// One isolated browsing context, owned by exactly one fetch
#[async_trait]
pub trait BrowsingContext: Send {
    /// Navigate and return once the DOM is ready
    async fn navigate(&mut self, url: &Url) -> Result<(), RenderError>;

    /// Resolve once network activity has settled; callers bound this with a timeout
    async fn wait_until_idle(&mut self) -> Result<(), RenderError>;

    /// Resolve once an element matching `selector` exists; callers bound this with a timeout
    async fn wait_for_selector(&mut self, selector: &str) -> Result<(), RenderError>;

    async fn title(&mut self) -> Result<String, RenderError>;

    /// Serialized markup of the whole document
    async fn document_html(&mut self) -> Result<String, RenderError>;

    /// Inner markup of the first element matching `selector`, `None` when nothing matches
    async fn element_html(&mut self, selector: &str) -> Result<Option<String>, RenderError>;

    /// Full-page PNG screenshot
    async fn screenshot(&mut self) -> Result<Vec<u8>, RenderError>;

    /// Printed PDF of the page
    async fn pdf(&mut self) -> Result<Vec<u8>, RenderError>;

    /// Tear the context down
    async fn close(self: Box<Self>) -> Result<(), RenderError>;
}
