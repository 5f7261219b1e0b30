use crate::crawlers::fetch::FetchCoordinator;
use crate::filter::{UrlFilter, authority, normalize, strip_trailing_slash};
use crate::parsers::html::extract_links;
use crate::results::{CrawledPage, FetchRequest};
use std::collections::{HashSet, VecDeque};
use url::Url;

/// Parameters of one breadth-first crawl.
///
/// Bounds are trusted here; the service layer validates them.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// URL to start crawling from
    pub start_url: String,

    /// Links found on pages shallower than this are followed
    pub max_depth: usize,

    /// Crawl stops once this many pages were fetched
    pub max_pages: usize,

    /// Selector to wait for on every page
    pub wait_selector: Option<String>,
}

impl CrawlOptions {
    pub fn new(start_url: &str, max_depth: usize, max_pages: usize) -> Self {
        Self {
            start_url: start_url.to_string(),
            max_depth,
            max_pages,
            wait_selector: None,
        }
    }

    pub fn with_wait_selector(mut self, selector: Option<String>) -> Self {
        self.wait_selector = selector;
        self
    }
}

/// Traversal state owned by exactly one crawl
#[derive(Debug, Default)]
pub struct CrawlState {
    visited: HashSet<String>,
    queued: HashSet<String>,
    frontier: VecDeque<(String, usize)>,
}

impl CrawlState {
    /// State with `start_url` waiting at depth 0
    pub fn new(start_url: &str) -> Self {
        let mut state = Self::default();
        state.enqueue(start_url.to_string(), 0);
        state
    }

    /// Queue `url` unless it was already visited or is already waiting
    pub fn enqueue(&mut self, url: String, depth: usize) -> bool {
        if self.visited.contains(&url) || self.queued.contains(&url) {
            return false;
        }
        self.queued.insert(url.clone());
        self.frontier.push_back((url, depth));
        true
    }

    /// Oldest frontier entry
    pub fn dequeue(&mut self) -> Option<(String, usize)> {
        let (url, depth) = self.frontier.pop_front()?;
        self.queued.remove(&url);
        Some((url, depth))
    }

    /// Record `url` as visited; false if it already was
    pub fn mark_visited(&mut self, url: &str) -> bool {
        self.visited.insert(url.to_string())
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }
}

/// Frontier key for the start URL: fragment and one trailing slash removed, query kept
fn start_key(start_url: &str) -> String {
    match Url::parse(start_url) {
        Ok(mut url) => {
            url.set_fragment(None);
            strip_trailing_slash(url.as_str()).to_string()
        }
        Err(_) => start_url.to_string(),
    }
}

/// Breadth-first crawl from `options.start_url`.
///
/// Pages come back in the order they were dequeued and fetched. Failed fetches
/// are logged and left out; they never stop the crawl.
pub async fn crawl(coordinator: &FetchCoordinator, options: &CrawlOptions) -> Vec<CrawledPage> {
    ::log::info!("Starting web crawler for: {}", options.start_url);

    let start = start_key(&options.start_url);
    let Some(domain) = Url::parse(&start).ok().as_ref().and_then(authority) else {
        ::log::error!("Cannot crawl {}: no host", options.start_url);
        return Vec::new();
    };

    let url_filter = match UrlFilter::for_domain(&domain) {
        Ok(filter) => filter,
        Err(e) => {
            ::log::error!("Invalid URL filter for {}: {}", domain, e);
            return Vec::new();
        }
    };

    let mut state = CrawlState::new(&start);
    let mut results: Vec<CrawledPage> = Vec::new();

    while results.len() < options.max_pages {
        let Some((current_url, depth)) = state.dequeue() else {
            break;
        };

        if !state.mark_visited(&current_url) {
            ::log::trace!("Skipping already visited: {}", current_url);
            continue;
        }

        let request = match FetchRequest::new(&current_url) {
            Ok(request) => request.with_wait_selector(options.wait_selector.clone()),
            Err(e) => {
                ::log::error!("Failed to crawl {}: {}", current_url, e);
                continue;
            }
        };

        let page = match coordinator.fetch_page(&request).await {
            Ok(page) => page,
            Err(e) => {
                ::log::error!("Failed to crawl {}: {}", current_url, e);
                continue;
            }
        };

        if depth < options.max_depth {
            if let Some(html) = page.non_empty_content() {
                let queued = enqueue_links(&mut state, &url_filter, html, &current_url, depth + 1);
                ::log::info!("Found {} new links in {}", queued, current_url);
            }
        }

        results.push(CrawledPage::new(current_url, page.title, page.content));
    }

    ::log::info!(
        "Crawl of {} complete - {} pages, {} left in frontier",
        options.start_url,
        results.len(),
        state.frontier_len()
    );
    results
}

/// Harvest, normalize and admit the links of one page; returns how many were queued
fn enqueue_links(
    state: &mut CrawlState,
    url_filter: &UrlFilter,
    html: &str,
    current_url: &str,
    depth: usize,
) -> usize {
    let mut links: Vec<String> = extract_links(html, current_url)
        .into_iter()
        .filter_map(|link| normalize(&link, current_url))
        .filter(|link| url_filter.should_crawl(link))
        .collect();
    // Harvested links are a set; sort for a reproducible frontier order
    links.sort();

    links
        .into_iter()
        .filter(|link| state.enqueue(link.clone(), depth))
        .count()
}
