//! In-memory render backend for tests.

use crate::error::RenderError;
use crate::renderer::{BrowsingContext, Renderer};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Default)]
pub struct MockPage {
    pub title: String,
    pub html: String,
    /// Extra time spent in navigation
    pub delay: Duration,
    /// Navigation fails with this message
    pub fail: Option<String>,
    /// Never reports network idle
    pub never_idle: bool,
    /// Selectors that eventually appear; anything else never does
    pub selectors: Vec<String>,
    /// Inner markup per target selector
    pub elements: HashMap<String, String>,
}

impl MockPage {
    pub fn html(title: &str, html: &str) -> Self {
        Self {
            title: title.to_string(),
            html: html.to_string(),
            ..Default::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, Default)]
pub struct MockStats {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub navigations: Mutex<Vec<String>>,
}

impl MockStats {
    pub fn visited(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockRenderer {
    pages: Arc<HashMap<String, MockPage>>,
    pub stats: Arc<MockStats>,
    /// Opening a context fails outright
    pub refuse_connections: bool,
}

/// Pages are keyed without a trailing slash
fn key(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

impl MockRenderer {
    pub fn new(pages: Vec<(&str, MockPage)>) -> Self {
        Self {
            pages: Arc::new(pages.into_iter().map(|(u, p)| (key(u), p)).collect()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Renderer for MockRenderer {
    async fn open(&self) -> Result<Box<dyn BrowsingContext>, RenderError> {
        if self.refuse_connections {
            return Err(RenderError::Connect {
                endpoint: "mock".to_string(),
                message: "connection refused".to_string(),
            });
        }

        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        let now = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_in_flight.fetch_max(now, Ordering::SeqCst);

        Ok(Box::new(MockContext {
            pages: Arc::clone(&self.pages),
            stats: Arc::clone(&self.stats),
            current: None,
        }))
    }
}

struct MockContext {
    pages: Arc<HashMap<String, MockPage>>,
    stats: Arc<MockStats>,
    current: Option<MockPage>,
}

impl MockContext {
    fn page(&self) -> Result<&MockPage, RenderError> {
        self.current
            .as_ref()
            .ok_or_else(|| RenderError::Command("no page loaded".to_string()))
    }
}

#[async_trait]
impl BrowsingContext for MockContext {
    async fn navigate(&mut self, url: &Url) -> Result<(), RenderError> {
        self.stats.navigations.lock().unwrap().push(key(url.as_str()));

        let page = self.pages.get(&key(url.as_str())).cloned().ok_or_else(|| {
            RenderError::Navigation {
                url: url.to_string(),
                message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            }
        })?;

        if !page.delay.is_zero() {
            tokio::time::sleep(page.delay).await;
        }
        if let Some(message) = &page.fail {
            return Err(RenderError::Navigation {
                url: url.to_string(),
                message: message.clone(),
            });
        }

        self.current = Some(page);
        Ok(())
    }

    async fn wait_until_idle(&mut self) -> Result<(), RenderError> {
        if self.page()?.never_idle {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn wait_for_selector(&mut self, selector: &str) -> Result<(), RenderError> {
        if !self.page()?.selectors.iter().any(|s| s == selector) {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn title(&mut self) -> Result<String, RenderError> {
        Ok(self.page()?.title.clone())
    }

    async fn document_html(&mut self) -> Result<String, RenderError> {
        Ok(self.page()?.html.clone())
    }

    async fn element_html(&mut self, selector: &str) -> Result<Option<String>, RenderError> {
        if selector.starts_with("!!") {
            return Err(RenderError::Command(format!("invalid selector {}", selector)));
        }
        Ok(self.page()?.elements.get(selector).cloned())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, RenderError> {
        self.page()?;
        Ok(b"\x89PNG".to_vec())
    }

    async fn pdf(&mut self) -> Result<Vec<u8>, RenderError> {
        self.page()?;
        Ok(b"%PDF-1.4".to_vec())
    }

    async fn close(self: Box<Self>) -> Result<(), RenderError> {
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
