use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// Configuration for the render backend and the fetch coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Maximum number of concurrently rendered pages
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// User agent announced by every browsing context
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Whether to ask the browser to run headless
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Stage budgets applied to every fetch
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// Per-stage time budgets of a fetch
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Budget for navigation until the DOM is ready
    #[serde(default = "default_navigation_secs")]
    pub navigation_secs: u64,

    /// Budget for the network to go idle (non-fatal)
    #[serde(default = "default_network_idle_secs")]
    pub network_idle_secs: u64,

    /// Fixed delay for client-side rendering to settle
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Budget for an optional wait-selector (non-fatal)
    #[serde(default = "default_selector_secs")]
    pub selector_secs: u64,
}

impl TimeoutConfig {
    pub fn navigation(&self) -> Duration {
        Duration::from_secs(self.navigation_secs)
    }

    pub fn network_idle(&self) -> Duration {
        Duration::from_secs(self.network_idle_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn selector(&self) -> Duration {
        Duration::from_secs(self.selector_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            navigation_secs: default_navigation_secs(),
            network_idle_secs: default_network_idle_secs(),
            settle_ms: default_settle_ms(),
            selector_secs: default_selector_secs(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            max_concurrency: default_max_concurrency(),
            user_agent: default_user_agent(),
            headless: default_headless(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Override the WebDriver URL with the `WEBDRIVER_URL` environment variable if set
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                self.webdriver_url = webdriver_url;
            }
        }
        self
    }
}

fn default_max_concurrency() -> usize {
    5
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        .to_string()
}

fn default_headless() -> bool {
    true
}

fn default_navigation_secs() -> u64 {
    30
}

fn default_network_idle_secs() -> u64 {
    10
}

fn default_settle_ms() -> u64 {
    2000
}

fn default_selector_secs() -> u64 {
    5
}
