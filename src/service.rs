//! The public operations: scrape, map, crawl, batch scrape and search.
//!
//! Request and response models serialize to the JSON shapes the CLI prints.

use crate::aggregate::{
    DuckDuckGoProvider, SearchProvider, assemble_batch, assemble_combined, fan_out, write_archive,
};
use crate::crawlers::{CrawlOptions, FetchCoordinator, crawl};
use crate::error::{FetchError, ServiceError};
use crate::filter::{UrlFilter, authority};
use crate::parsers::{ExtractedDocument, extract_links};
use crate::results::FetchRequest;
use crate::summarize::{FrequencySummarizer, Summarizer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const MAX_CRAWL_DEPTH: usize = 3;
pub const MAX_CRAWL_PAGES: usize = 20;
pub const MAX_SEARCH_RESULTS: usize = 5;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapeRequest {
    pub url: String,

    /// Selector to wait for before capturing (useful for lazily loading pages)
    #[serde(default)]
    pub wait_for_selector: Option<String>,

    /// Selector whose content replaces the whole page
    #[serde(default)]
    pub target_selector: Option<String>,

    /// Selector of elements to drop before conversion
    #[serde(default)]
    pub remove_selector: Option<String>,

    #[serde(default)]
    pub include_images: bool,

    #[serde(default)]
    pub summarize: bool,

    #[serde(default)]
    pub screenshot: bool,

    #[serde(default)]
    pub pdf: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub original_length: usize,
    pub cleaned_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeResponse {
    pub url: String,
    pub title: Option<String>,

    #[serde(rename = "markdown_content")]
    pub markdown: String,

    pub summary: Option<String>,
    pub metadata: PageMetadata,

    /// PNG bytes, handed to the caller out of band
    #[serde(skip)]
    pub screenshot: Option<Vec<u8>>,

    /// PDF bytes, handed to the caller out of band
    #[serde(skip)]
    pub pdf: Option<Vec<u8>>,
}

impl ScrapeResponse {
    fn from_document(url: String, title: Option<String>, document: ExtractedDocument) -> Self {
        Self {
            url,
            title,
            markdown: document.markdown,
            summary: None,
            metadata: PageMetadata {
                original_length: document.original_length,
                cleaned_length: document.cleaned_length,
            },
            screenshot: None,
            pdf: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapRequest {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapResponse {
    pub url: String,
    pub links: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlRequest {
    pub url: String,

    /// Links are followed from pages shallower than this (1 to 3)
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    #[serde(default)]
    pub wait_for_selector: Option<String>,

    #[serde(default)]
    pub include_images: bool,
}

fn default_max_depth() -> usize {
    1
}

fn default_max_pages() -> usize {
    5
}

impl CrawlRequest {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            max_depth: default_max_depth(),
            max_pages: default_max_pages(),
            wait_for_selector: None,
            include_images: false,
        }
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        if !(1..=MAX_CRAWL_DEPTH).contains(&self.max_depth) {
            return Err(ServiceError::InvalidRequest(format!(
                "max_depth must be between 1 and {}, got {}",
                MAX_CRAWL_DEPTH, self.max_depth
            )));
        }
        if !(1..=MAX_CRAWL_PAGES).contains(&self.max_pages) {
            return Err(ServiceError::InvalidRequest(format!(
                "max_pages must be between 1 and {}, got {}",
                MAX_CRAWL_PAGES, self.max_pages
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlResponse {
    pub base_url: String,
    pub pages_crawled: usize,
    pub results: Vec<ScrapeResponse>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchScrapeRequest {
    pub urls: Vec<String>,

    #[serde(default)]
    pub wait_for_selector: Option<String>,

    #[serde(default)]
    pub include_images: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,

    #[serde(default = "default_search_limit")]
    pub limit: usize,

    #[serde(default)]
    pub include_images: bool,
}

fn default_search_limit() -> usize {
    3
}

impl SearchRequest {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            limit: default_search_limit(),
            include_images: false,
        }
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        if !(1..=MAX_SEARCH_RESULTS).contains(&self.limit) {
            return Err(ServiceError::InvalidRequest(format!(
                "limit must be between 1 and {}, got {}",
                MAX_SEARCH_RESULTS, self.limit
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<ScrapeResponse>,
    pub combined_markdown: String,
}

/// Parse a caller-supplied URL, rejecting anything but absolute http(s)
fn parse_request(url: &str) -> Result<FetchRequest, ServiceError> {
    FetchRequest::new(url).map_err(|e| ServiceError::InvalidRequest(e.to_string()))
}

/// How a failed single-page fetch is reported to the caller
fn fetch_failure(error: FetchError) -> ServiceError {
    match error {
        FetchError::InvalidUrl { .. } => ServiceError::InvalidRequest(error.to_string()),
        FetchError::Render(e) => {
            ServiceError::NotFound(format!("No content retrieved from browser: {}", e))
        }
        FetchError::ShutDown | FetchError::Aborted { .. } => {
            ServiceError::Internal(error.to_string())
        }
    }
}

/// Entry point for all operations; every operation goes through the one shared coordinator
#[derive(Clone)]
pub struct MarkdownService {
    coordinator: FetchCoordinator,
    summarizer: Arc<dyn Summarizer>,
    search: Arc<dyn SearchProvider>,
}

impl MarkdownService {
    /// Service with the frequency summarizer and DuckDuckGo as search provider
    pub fn new(coordinator: FetchCoordinator) -> Self {
        let search = Arc::new(DuckDuckGoProvider::new(coordinator.clone()));
        Self {
            coordinator,
            summarizer: Arc::new(FrequencySummarizer::default()),
            search,
        }
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn with_search_provider(mut self, search: Arc<dyn SearchProvider>) -> Self {
        self.search = search;
        self
    }

    pub fn coordinator(&self) -> &FetchCoordinator {
        &self.coordinator
    }

    /// Convert a single page to Markdown
    pub async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeResponse, ServiceError> {
        ::log::info!("Received scrape request for: {}", request.url);

        let fetch = parse_request(&request.url)?
            .with_wait_selector(request.wait_for_selector.clone())
            .with_target_selector(request.target_selector.clone())
            .with_exclude_selector(request.remove_selector.clone())
            .with_images(request.include_images)
            .with_screenshot(request.screenshot)
            .with_pdf(request.pdf);

        let page = self
            .coordinator
            .fetch_page(&fetch)
            .await
            .map_err(fetch_failure)?;

        let Some(raw_html) = page.non_empty_content() else {
            ::log::error!("Scraper returned empty content for {}", request.url);
            return Err(ServiceError::NotFound(
                "No content retrieved from browser".to_string(),
            ));
        };
        ::log::info!("Scraped raw HTML length: {}", raw_html.len());

        let document = ExtractedDocument::from_html(
            raw_html,
            fetch.exclude_selector.as_deref(),
            fetch.include_images,
        );
        ::log::info!("Final Markdown length: {}", document.cleaned_length);
        if document.is_empty() {
            ::log::warn!("Markdown conversion produced empty output for {}", request.url);
        }

        let mut response = ScrapeResponse::from_document(request.url.clone(), page.title, document);
        if request.summarize {
            ::log::info!("Generating summary...");
            response.summary = Some(self.summarizer.summarize(&response.markdown));
        }
        response.screenshot = page.screenshot;
        response.pdf = page.pdf;
        Ok(response)
    }

    /// Crawlable same-host links of one page, sorted; empty when the page cannot be rendered
    pub async fn map(&self, request: &MapRequest) -> Result<MapResponse, ServiceError> {
        ::log::info!("Received map request for: {}", request.url);
        let fetch = parse_request(&request.url)?;
        let domain = authority(&fetch.url).ok_or_else(|| {
            ServiceError::InvalidRequest(format!("URL has no host: {}", request.url))
        })?;
        let url_filter = UrlFilter::for_domain(&domain)
            .map_err(|e| ServiceError::Internal(format!("Invalid URL filter: {}", e)))?;

        let links = match self.coordinator.fetch_page(&fetch).await {
            Ok(page) => {
                let mut links: Vec<String> = page
                    .non_empty_content()
                    .map(|html| extract_links(html, fetch.url.as_str()))
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|link| url_filter.should_crawl(link))
                    .collect();
                links.sort();
                links
            }
            Err(FetchError::Render(e)) => {
                ::log::error!("Error mapping {}: {}", request.url, e);
                Vec::new()
            }
            Err(e) => return Err(fetch_failure(e)),
        };

        if links.is_empty() {
            ::log::warn!("No links found for {}", request.url);
        }
        Ok(MapResponse {
            url: request.url.clone(),
            links,
        })
    }

    /// Breadth-first crawl, converting every fetched page
    pub async fn crawl(&self, request: &CrawlRequest) -> Result<CrawlResponse, ServiceError> {
        ::log::info!("Starting crawl request for: {}", request.url);
        request.validate()?;
        parse_request(&request.url)?;

        let options = CrawlOptions::new(&request.url, request.max_depth, request.max_pages)
            .with_wait_selector(request.wait_for_selector.clone());
        let pages = crawl(&self.coordinator, &options).await;

        let mut results = Vec::with_capacity(pages.len());
        for page in pages {
            let Some(raw_html) = page.content.as_deref().filter(|c| !c.is_empty()) else {
                ::log::warn!("No content for {}, skipping.", page.url);
                continue;
            };
            let document = ExtractedDocument::from_html(raw_html, None, request.include_images);
            results.push(ScrapeResponse::from_document(page.url, page.title, document));
        }

        Ok(CrawlResponse {
            base_url: request.url.clone(),
            pages_crawled: results.len(),
            results,
        })
    }

    /// Scrape every URL concurrently and pack the results into a zip archive
    pub async fn batch_scrape(&self, request: &BatchScrapeRequest) -> Result<Vec<u8>, ServiceError> {
        ::log::info!("Received batch scrape request for {} URLs", request.urls.len());

        let fetches = request
            .urls
            .iter()
            .map(|url| {
                parse_request(url)
                    .map(|fetch| fetch.with_wait_selector(request.wait_for_selector.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let results = fan_out(&self.coordinator, fetches).await;
        let artifacts = assemble_batch(&request.urls, results, request.include_images);

        write_archive(&artifacts)
            .map_err(|e| ServiceError::Internal(format!("Batch scrape failed: {}", e)))
    }

    /// Resolve the query to URLs and scrape them into one combined document
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, ServiceError> {
        ::log::info!("Received search request for: {}", request.query);
        request.validate()?;

        let urls = match self.search.search(&request.query, request.limit).await {
            Ok(urls) => urls,
            Err(e) => {
                ::log::error!("Search failed: {}", e);
                Vec::new()
            }
        };

        let mut fetched_urls = Vec::new();
        let mut fetches = Vec::new();
        for url in urls.into_iter().take(request.limit) {
            match FetchRequest::new(&url) {
                Ok(fetch) => {
                    fetched_urls.push(url);
                    fetches.push(fetch);
                }
                Err(e) => ::log::warn!("Skipping search result {}: {}", url, e),
            }
        }

        let mut results = Vec::new();
        for (url, outcome) in fetched_urls.into_iter().zip(fan_out(&self.coordinator, fetches).await) {
            let page = match outcome {
                Ok(page) => page,
                Err(e) => {
                    ::log::error!("Failed to scrape {}: {}", url, e);
                    continue;
                }
            };
            let Some(raw_html) = page.non_empty_content() else {
                continue;
            };
            let document = ExtractedDocument::from_html(raw_html, None, request.include_images);
            results.push(ScrapeResponse::from_document(url, page.title.clone(), document));
        }

        let combined_markdown = assemble_combined(
            &request.query,
            results.iter().map(|r| {
                let title = r.title.as_deref().unwrap_or(r.url.as_str());
                (r.url.as_str(), title, r.markdown.as_str())
            }),
        );

        Ok(SearchResponse {
            query: request.query.clone(),
            results,
            combined_markdown,
        })
    }
}
