use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Path suffixes that never lead to a document worth rendering
pub const NON_DOCUMENT_PATTERN: &str =
    r"\.(pdf|jpg|jpeg|png|gif|svg|css|js|zip|tar|gz|mp3|mp4|wav|avi|xml|json|ico)$";

/// Configuration for the crawl admission filter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlFilterConfig {
    /// Host (with `:port` when explicit) every admitted URL must have
    pub required_domain: String,

    /// Regex patterns the lowercased path must match (if empty, all paths are included)
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Regex patterns on the lowercased path that reject a URL (take precedence over includes)
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

fn default_exclude_patterns() -> Vec<String> {
    vec![NON_DOCUMENT_PATTERN.to_string()]
}

impl UrlFilterConfig {
    /// Filter confined to `domain` with the default non-document exclusions
    pub fn for_domain(domain: &str) -> Self {
        Self {
            required_domain: domain.to_string(),
            include_patterns: Vec::new(),
            exclude_patterns: default_exclude_patterns(),
        }
    }
}

/// Admission filter applied to normalized links before they enter the crawl frontier
#[derive(Debug)]
pub struct UrlFilter {
    config: UrlFilterConfig,
    include_regexes: Vec<Regex>,
    exclude_regexes: Vec<Regex>,
}

impl UrlFilter {
    /// Create a new URL filter from configuration
    pub fn new(config: UrlFilterConfig) -> Result<Self, regex::Error> {
        let include_regexes = config
            .include_patterns
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;

        let exclude_regexes = config
            .exclude_patterns
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            config,
            include_regexes,
            exclude_regexes,
        })
    }

    /// Filter confined to `domain` with the default exclusions
    pub fn for_domain(domain: &str) -> Result<Self, regex::Error> {
        Self::new(UrlFilterConfig::for_domain(domain))
    }

    pub fn required_domain(&self) -> &str {
        &self.config.required_domain
    }

    /// Determine if a URL string may be enqueued
    pub fn should_crawl(&self, url: &str) -> bool {
        match Url::parse(url) {
            Ok(parsed) => self.should_crawl_url(&parsed),
            Err(_) => false,
        }
    }

    /// Determine if a parsed URL may be enqueued
    pub fn should_crawl_url(&self, url: &Url) -> bool {
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }

        if authority(url).as_deref() != Some(self.config.required_domain.as_str()) {
            return false;
        }

        let path = url.path().to_lowercase();
        if self.exclude_regexes.iter().any(|regex| regex.is_match(&path)) {
            return false;
        }

        self.include_regexes.is_empty() || self.include_regexes.iter().any(|r| r.is_match(&path))
    }
}

/// `host[:port]` of a URL, the unit of "same domain" comparisons.
///
/// Both [`extract_links`](crate::parsers::html::extract_links) and
/// [`UrlFilter`] compare this value, so a different port (or a subdomain)
/// counts as another site. Default ports are dropped by the URL parser, so
/// `https://a.test:443/` and `https://a.test/` share one authority.
pub fn authority(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Strip at most one trailing slash
pub fn strip_trailing_slash(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}

/// Resolve `link` against `current_url`, dropping query, fragment and one trailing slash.
///
/// Returns `None` when either side cannot be resolved; callers must not enqueue it.
pub fn normalize(link: &str, current_url: &str) -> Option<String> {
    let base = Url::parse(current_url).ok()?;
    let mut resolved = base.join(link).ok()?;
    resolved.set_query(None);
    resolved.set_fragment(None);

    let normalized = strip_trailing_slash(resolved.as_str());
    if normalized.is_empty() {
        None
    } else {
        Some(normalized.to_string())
    }
}

/// True iff `url` is http(s), sits on `domain`, and does not point at a non-document asset
pub fn is_crawlable(url: &str, domain: &str) -> bool {
    match UrlFilter::for_domain(domain) {
        Ok(filter) => filter.should_crawl(url),
        Err(e) => {
            ::log::error!("Invalid URL filter pattern: {}", e);
            false
        }
    }
}
