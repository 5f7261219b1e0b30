//! Multi-page operations built on top of the fetch coordinator.
//!
//! Every URL gets its own spawned fetch; all of them are joined before
//! assembly, so one failing page never cancels its siblings.

pub mod batch;
pub mod search;

pub use batch::{BatchArtifact, assemble_batch, write_archive};
pub use search::{DuckDuckGoProvider, SearchProvider, StaticSearchProvider, assemble_combined};

use crate::crawlers::FetchCoordinator;
use crate::error::FetchError;
use crate::results::{FetchRequest, FetchResult};
use futures::future::join_all;

/// Fetch every request concurrently; the i-th result belongs to the i-th request
pub async fn fan_out(
    coordinator: &FetchCoordinator,
    requests: Vec<FetchRequest>,
) -> Vec<Result<FetchResult, FetchError>> {
    ::log::info!("Fanning out {} fetches", requests.len());

    let handles = requests.into_iter().map(|request| {
        let coordinator = coordinator.clone();
        let url = request.url.to_string();
        let handle = tokio::spawn(async move { coordinator.fetch_page(&request).await });
        (url, handle)
    });

    let joined = join_all(handles.map(|(url, handle)| async move {
        match handle.await {
            Ok(result) => result,
            Err(e) => {
                ::log::error!("Fetch task for {} did not complete: {}", url, e);
                Err(FetchError::Aborted {
                    url,
                    message: e.to_string(),
                })
            }
        }
    }))
    .await;

    let failed = joined.iter().filter(|r| r.is_err()).count();
    ::log::info!(
        "Fan-out complete - {} succeeded, {} failed",
        joined.len() - failed,
        failed
    );
    joined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawlers::FetchTimeouts;
    use crate::renderer::mock::{MockPage, MockRenderer};
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn coordinator(renderer: &MockRenderer, slots: usize) -> FetchCoordinator {
        let timeouts = FetchTimeouts {
            navigation: Duration::from_millis(500),
            network_idle: Duration::from_millis(20),
            settle: Duration::ZERO,
            selector: Duration::from_millis(20),
        };
        FetchCoordinator::new(Arc::new(renderer.clone()), slots, timeouts)
    }

    #[tokio::test]
    async fn test_results_keep_input_order() {
        // Earlier requests finish later
        let renderer = MockRenderer::new(vec![
            (
                "https://a.test/1",
                MockPage::html("One", "<p>1</p>").with_delay(Duration::from_millis(60)),
            ),
            (
                "https://a.test/2",
                MockPage::html("Two", "<p>2</p>").with_delay(Duration::from_millis(30)),
            ),
            ("https://a.test/3", MockPage::html("Three", "<p>3</p>")),
        ]);

        let requests = (1..=3)
            .map(|i| FetchRequest::new(&format!("https://a.test/{}", i)).unwrap())
            .collect();
        let results = fan_out(&coordinator(&renderer, 3), requests).await;

        let titles: Vec<_> = results
            .iter()
            .map(|r| r.as_ref().unwrap().title.clone().unwrap())
            .collect();
        assert_eq!(titles, vec!["One", "Two", "Three"]);
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let renderer = MockRenderer::new(vec![
            ("https://a.test/ok", MockPage::html("Ok", "<p>fine</p>")),
            ("https://a.test/bad", MockPage::failing("net::ERR_ABORTED")),
        ]);

        let requests = vec![
            FetchRequest::new("https://a.test/bad").unwrap(),
            FetchRequest::new("https://a.test/ok").unwrap(),
        ];
        let results = fan_out(&coordinator(&renderer, 2), requests).await;

        assert!(results[0].is_err());
        assert_eq!(results[1].as_ref().unwrap().title.as_deref(), Some("Ok"));
        assert_eq!(renderer.stats.closed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fan_out_respects_limiter() {
        let pages: Vec<(String, MockPage)> = (0..6)
            .map(|i| {
                (
                    format!("https://a.test/{}", i),
                    MockPage::html("T", "<p>x</p>").with_delay(Duration::from_millis(20)),
                )
            })
            .collect();
        let renderer =
            MockRenderer::new(pages.iter().map(|(u, p)| (u.as_str(), p.clone())).collect());

        let requests = pages
            .iter()
            .map(|(u, _)| FetchRequest::new(u).unwrap())
            .collect();
        let results = fan_out(&coordinator(&renderer, 2), requests).await;

        assert_eq!(results.len(), 6);
        assert!(renderer.stats.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_empty_fan_out() {
        let renderer = MockRenderer::new(vec![]);
        assert!(fan_out(&coordinator(&renderer, 1), Vec::new()).await.is_empty());
    }
}
