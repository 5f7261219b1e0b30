use crate::config::{ServiceConfig, TimeoutConfig};
use crate::error::{FetchError, RenderError};
use crate::renderer::{BrowsingContext, Renderer};
use crate::results::{FetchRequest, FetchResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;

/// How a best-effort wait ended. None of these abort a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    Ready,
    TimedOut,
    Failed(String),
}

/// Run `wait` for at most `budget`, turning both timeout and failure into plain outcomes
pub async fn best_effort<F>(budget: Duration, wait: F) -> WaitOutcome
where
    F: Future<Output = Result<(), RenderError>>,
{
    match timeout(budget, wait).await {
        Ok(Ok(())) => WaitOutcome::Ready,
        Ok(Err(e)) => WaitOutcome::Failed(e.to_string()),
        Err(_) => WaitOutcome::TimedOut,
    }
}

/// Stage budgets of one fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTimeouts {
    pub navigation: Duration,
    pub network_idle: Duration,
    pub settle: Duration,
    pub selector: Duration,
}

impl From<&TimeoutConfig> for FetchTimeouts {
    fn from(config: &TimeoutConfig) -> Self {
        Self {
            navigation: config.navigation(),
            network_idle: config.network_idle(),
            settle: config.settle(),
            selector: config.selector(),
        }
    }
}

impl Default for FetchTimeouts {
    fn default() -> Self {
        Self::from(&TimeoutConfig::default())
    }
}

/// Process-wide gate in front of the renderer.
///
/// Cloning is cheap and every clone shares the same slot limiter and renderer,
/// so one instance built at startup bounds all fetches of all operations.
#[derive(Clone)]
pub struct FetchCoordinator {
    renderer: Arc<dyn Renderer>,
    limiter: Arc<Semaphore>,
    capacity: usize,
    timeouts: FetchTimeouts,
}

impl std::fmt::Debug for FetchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchCoordinator")
            .field("capacity", &self.capacity)
            .field("available", &self.limiter.available_permits())
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

impl FetchCoordinator {
    /// Create a coordinator allowing `max_concurrency` renders at once (at least one)
    pub fn new(renderer: Arc<dyn Renderer>, max_concurrency: usize, timeouts: FetchTimeouts) -> Self {
        let capacity = max_concurrency.max(1);
        Self {
            renderer,
            limiter: Arc::new(Semaphore::new(capacity)),
            capacity,
            timeouts,
        }
    }

    /// Create a coordinator from service configuration
    pub fn from_config(renderer: Arc<dyn Renderer>, config: &ServiceConfig) -> Self {
        Self::new(
            renderer,
            config.max_concurrency,
            FetchTimeouts::from(&config.timeouts),
        )
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn timeouts(&self) -> FetchTimeouts {
        self.timeouts
    }

    /// Render one page.
    ///
    /// Holds a limiter slot for the whole call and always closes the browsing
    /// context it opened, whether rendering succeeded or not.
    pub async fn fetch_page(&self, request: &FetchRequest) -> Result<FetchResult, FetchError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| FetchError::ShutDown)?;
        ::log::debug!("Acquired fetch slot for: {}", request.url);

        let mut context = self.renderer.open().await?;
        let outcome = self.render(context.as_mut(), request).await;

        if let Err(e) = context.close().await {
            ::log::warn!("Failed to close browsing context for {}: {}", request.url, e);
        }

        if let Err(e) = &outcome {
            ::log::error!("Error scraping {}: {}", request.url, e);
        }
        outcome.map_err(FetchError::from)
    }

    async fn render(
        &self,
        context: &mut dyn BrowsingContext,
        request: &FetchRequest,
    ) -> Result<FetchResult, RenderError> {
        ::log::info!("Navigating to {}", request.url);
        match timeout(self.timeouts.navigation, context.navigate(&request.url)).await {
            Ok(navigated) => navigated?,
            Err(_) => {
                return Err(RenderError::Timeout {
                    stage: "navigation",
                    after: self.timeouts.navigation,
                });
            }
        }

        match best_effort(self.timeouts.network_idle, context.wait_until_idle()).await {
            WaitOutcome::Ready => {}
            WaitOutcome::TimedOut => ::log::warn!("Network idle timeout, proceeding anyway..."),
            WaitOutcome::Failed(e) => ::log::warn!("Network idle check failed, proceeding: {}", e),
        }

        if !self.timeouts.settle.is_zero() {
            tokio::time::sleep(self.timeouts.settle).await;
        }

        if let Some(selector) = &request.wait_selector {
            ::log::info!("Waiting for selector: {}", selector);
            match best_effort(self.timeouts.selector, context.wait_for_selector(selector)).await {
                WaitOutcome::Ready => {}
                WaitOutcome::TimedOut => {
                    ::log::warn!("Timeout waiting for selector {}", selector)
                }
                WaitOutcome::Failed(e) => {
                    ::log::warn!("Waiting for selector {} failed: {}", selector, e)
                }
            }
        }

        let title = context.title().await?;
        let content = self.capture_content(context, request).await?;

        let screenshot = if request.capture_screenshot {
            ::log::info!("Capturing screenshot...");
            Some(context.screenshot().await?)
        } else {
            None
        };

        let pdf = if request.capture_pdf {
            ::log::info!("Generating PDF...");
            Some(context.pdf().await?)
        } else {
            None
        };

        Ok(FetchResult {
            title: Some(title).filter(|t| !t.trim().is_empty()),
            content: Some(content),
            screenshot,
            pdf,
        })
    }

    /// Scoped markup when a target selector resolves, the whole document otherwise
    async fn capture_content(
        &self,
        context: &mut dyn BrowsingContext,
        request: &FetchRequest,
    ) -> Result<String, RenderError> {
        let Some(selector) = &request.target_selector else {
            return context.document_html().await;
        };

        ::log::info!("Targeting selector: {}", selector);
        match context.element_html(selector).await {
            Ok(Some(html)) => Ok(html),
            Ok(None) => {
                ::log::warn!(
                    "Target selector {} not found. Falling back to full content.",
                    selector
                );
                context.document_html().await
            }
            Err(e) => {
                ::log::error!("Error selecting target {}: {}", selector, e);
                context.document_html().await
            }
        }
    }

    /// Wait for in-flight fetches to finish, then refuse new ones
    pub async fn shutdown(&self) {
        let permits = u32::try_from(self.capacity).unwrap_or(u32::MAX);
        match self.limiter.acquire_many(permits).await {
            Ok(drained) => {
                drained.forget();
                ::log::info!("Fetch coordinator drained");
            }
            Err(_) => ::log::debug!("Fetch coordinator already shut down"),
        }
        self.limiter.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::mock::{MockPage, MockRenderer};
    use std::sync::atomic::Ordering;

    fn quick_timeouts() -> FetchTimeouts {
        FetchTimeouts {
            navigation: Duration::from_millis(500),
            network_idle: Duration::from_millis(50),
            settle: Duration::ZERO,
            selector: Duration::from_millis(50),
        }
    }

    fn coordinator(renderer: &MockRenderer, slots: usize) -> FetchCoordinator {
        FetchCoordinator::new(Arc::new(renderer.clone()), slots, quick_timeouts())
    }

    #[tokio::test]
    async fn test_fetch_returns_title_and_document() {
        let renderer = MockRenderer::new(vec![(
            "https://a.test/page",
            MockPage::html("A page", "<html><body><p>Hi</p></body></html>"),
        )]);
        let coordinator = coordinator(&renderer, 2);

        let request = FetchRequest::new("https://a.test/page").unwrap();
        let result = coordinator.fetch_page(&request).await.unwrap();

        assert_eq!(result.title.as_deref(), Some("A page"));
        assert_eq!(
            result.content.as_deref(),
            Some("<html><body><p>Hi</p></body></html>")
        );
        assert!(result.screenshot.is_none());
        assert!(result.pdf.is_none());
        assert_eq!(renderer.stats.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_title_is_none() {
        let renderer = MockRenderer::new(vec![("https://a.test", MockPage::html("  ", "<p>x</p>"))]);
        let result = coordinator(&renderer, 1)
            .fetch_page(&FetchRequest::new("https://a.test").unwrap())
            .await
            .unwrap();
        assert!(result.title.is_none());
    }

    #[tokio::test]
    async fn test_target_selector_scopes_content() {
        let mut page = MockPage::html("T", "<html><body>full</body></html>");
        page.elements
            .insert("#main".to_string(), "<p>scoped</p>".to_string());
        let renderer = MockRenderer::new(vec![("https://a.test", page)]);
        let coordinator = coordinator(&renderer, 1);

        let found = FetchRequest::new("https://a.test")
            .unwrap()
            .with_target_selector(Some("#main".to_string()));
        let result = coordinator.fetch_page(&found).await.unwrap();
        assert_eq!(result.content.as_deref(), Some("<p>scoped</p>"));

        let missing = FetchRequest::new("https://a.test")
            .unwrap()
            .with_target_selector(Some("#absent".to_string()));
        let result = coordinator.fetch_page(&missing).await.unwrap();
        assert_eq!(result.content.as_deref(), Some("<html><body>full</body></html>"));

        let broken = FetchRequest::new("https://a.test")
            .unwrap()
            .with_target_selector(Some("!!broken".to_string()));
        let result = coordinator.fetch_page(&broken).await.unwrap();
        assert_eq!(result.content.as_deref(), Some("<html><body>full</body></html>"));
    }

    #[tokio::test]
    async fn test_wait_timeouts_are_not_fatal() {
        let mut page = MockPage::html("Slow", "<p>eventually</p>");
        page.never_idle = true;
        let renderer = MockRenderer::new(vec![("https://a.test", page)]);

        let request = FetchRequest::new("https://a.test")
            .unwrap()
            .with_wait_selector(Some(".never-appears".to_string()));
        let result = coordinator(&renderer, 1).fetch_page(&request).await.unwrap();

        assert_eq!(result.content.as_deref(), Some("<p>eventually</p>"));
    }

    #[tokio::test]
    async fn test_navigation_failure_closes_context() {
        let renderer = MockRenderer::new(vec![("https://a.test", MockPage::failing("boom"))]);
        let coordinator = coordinator(&renderer, 1);

        let err = coordinator
            .fetch_page(&FetchRequest::new("https://a.test").unwrap())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FetchError::Render(RenderError::Navigation { .. })
        ));
        assert_eq!(renderer.stats.opened.load(Ordering::SeqCst), 1);
        assert_eq!(renderer.stats.closed.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.limiter.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_navigation_timeout() {
        let renderer = MockRenderer::new(vec![(
            "https://a.test",
            MockPage::html("T", "<p>x</p>").with_delay(Duration::from_secs(5)),
        )]);
        let coordinator = coordinator(&renderer, 1);

        let err = coordinator
            .fetch_page(&FetchRequest::new("https://a.test").unwrap())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FetchError::Render(RenderError::Timeout {
                stage: "navigation",
                ..
            })
        ));
        assert_eq!(renderer.stats.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_releases_slot() {
        let mut renderer = MockRenderer::new(vec![]);
        renderer.refuse_connections = true;
        let coordinator = coordinator(&renderer, 1);

        let err = coordinator
            .fetch_page(&FetchRequest::new("https://a.test").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Render(RenderError::Connect { .. })));
        assert_eq!(coordinator.limiter.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_artifacts_captured_on_request() {
        let renderer = MockRenderer::new(vec![("https://a.test", MockPage::html("T", "<p>x</p>"))]);
        let request = FetchRequest::new("https://a.test")
            .unwrap()
            .with_screenshot(true)
            .with_pdf(true);
        let result = coordinator(&renderer, 1).fetch_page(&request).await.unwrap();

        assert!(result.screenshot.unwrap().starts_with(b"\x89PNG"));
        assert!(result.pdf.unwrap().starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let pages: Vec<_> = (0..8)
            .map(|i| {
                (
                    format!("https://a.test/{}", i),
                    MockPage::html("T", "<p>x</p>").with_delay(Duration::from_millis(30)),
                )
            })
            .collect();
        let renderer = MockRenderer::new(pages.iter().map(|(u, p)| (u.as_str(), p.clone())).collect());
        let coordinator = coordinator(&renderer, 3);

        let requests: Vec<_> = (0..8)
            .map(|i| FetchRequest::new(&format!("https://a.test/{}", i)).unwrap())
            .collect();
        let results =
            futures::future::join_all(requests.iter().map(|r| coordinator.fetch_page(r))).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert!(renderer.stats.max_in_flight.load(Ordering::SeqCst) <= 3);
        assert_eq!(renderer.stats.opened.load(Ordering::SeqCst), 8);
        assert_eq!(renderer.stats.closed.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn test_shutdown_refuses_new_fetches() {
        let renderer = MockRenderer::new(vec![("https://a.test", MockPage::html("T", "<p>x</p>"))]);
        let coordinator = coordinator(&renderer, 2);
        coordinator.shutdown().await;

        let err = coordinator
            .fetch_page(&FetchRequest::new("https://a.test").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::ShutDown));
        assert_eq!(renderer.stats.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_best_effort_outcomes() {
        assert_eq!(
            best_effort(Duration::from_millis(10), async { Ok::<(), RenderError>(()) }).await,
            WaitOutcome::Ready
        );
        assert_eq!(
            best_effort(
                Duration::from_millis(10),
                std::future::pending::<Result<(), RenderError>>()
            )
            .await,
            WaitOutcome::TimedOut
        );
        let failed = best_effort(Duration::from_millis(10), async {
            Err::<(), _>(RenderError::Command("gone".to_string()))
        })
        .await;
        assert!(matches!(failed, WaitOutcome::Failed(msg) if msg.contains("gone")));
    }
}
