use crate::crawlers::FetchCoordinator;
use crate::error::FetchError;
use crate::parsers::html::parse_selector;
use crate::results::FetchRequest;
use async_trait::async_trait;
use scraper::Html;
use url::Url;

/// Resolves a query to the URLs whose pages make up a search result
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, FetchError>;
}

/// Provider answering every query with the same URL list
#[derive(Debug, Clone, Default)]
pub struct StaticSearchProvider {
    urls: Vec<String>,
}

impl StaticSearchProvider {
    pub fn new(urls: Vec<String>) -> Self {
        Self { urls }
    }
}

#[async_trait]
impl SearchProvider for StaticSearchProvider {
    async fn search(&self, _query: &str, limit: usize) -> Result<Vec<String>, FetchError> {
        Ok(self.urls.iter().take(limit).cloned().collect())
    }
}

const DUCKDUCKGO_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Provider scraping DuckDuckGo's HTML results page through the fetch coordinator
#[derive(Debug, Clone)]
pub struct DuckDuckGoProvider {
    coordinator: FetchCoordinator,
}

impl DuckDuckGoProvider {
    pub fn new(coordinator: FetchCoordinator) -> Self {
        Self { coordinator }
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoProvider {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, FetchError> {
        ::log::info!("Searching for: {}", query);

        let endpoint = Url::parse_with_params(DUCKDUCKGO_ENDPOINT, &[("q", query)]).map_err(
            |e| FetchError::InvalidUrl {
                url: DUCKDUCKGO_ENDPOINT.to_string(),
                reason: e.to_string(),
            },
        )?;
        let request = FetchRequest::new(endpoint.as_str())?;
        let page = self.coordinator.fetch_page(&request).await?;

        let urls = page
            .non_empty_content()
            .map(|html| parse_result_links(html, limit))
            .unwrap_or_default();
        ::log::info!("Found URLs: {:?}", urls);
        Ok(urls)
    }
}

/// Target URLs of the organic results on a DuckDuckGo HTML results page
pub fn parse_result_links(html: &str, limit: usize) -> Vec<String> {
    let Some(selector) = parse_selector("a.result__a") else {
        return Vec::new();
    };
    let Ok(base) = Url::parse(DUCKDUCKGO_ENDPOINT) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut urls: Vec<String> = Vec::new();
    for href in document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
    {
        let Some(target) = result_target(&base, href) else {
            continue;
        };
        if !urls.contains(&target) {
            urls.push(target);
        }
        if urls.len() >= limit {
            break;
        }
    }
    urls
}

/// Follow DuckDuckGo's `/l/?uddg=` redirect wrapper when present
fn result_target(base: &Url, href: &str) -> Option<String> {
    let resolved = base.join(href).ok()?;
    let target = resolved
        .query_pairs()
        .find(|(key, _)| key == "uddg")
        .and_then(|(_, value)| Url::parse(&value).ok())
        .unwrap_or(resolved);

    matches!(target.scheme(), "http" | "https").then(|| target.to_string())
}

/// Concatenate successful results into one sectioned Markdown document, in the order given
pub fn assemble_combined<'a, I>(query: &str, sections: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str, &'a str)>,
{
    let mut combined = format!("# Search Results for: {}\n\n", query);
    for (url, title, markdown) in sections {
        combined.push_str(&format!(
            "## Source: [{}]({})\n\n{}\n\n---\n\n",
            title, url, markdown
        ));
    }
    combined
}
